pub mod answer;
pub mod health;
pub mod personas;
