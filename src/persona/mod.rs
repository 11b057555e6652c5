//! Persona registry: named system prompts with optional keyword filters,
//! loaded once at startup from `personas.yaml`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::errors::PipelineError;

/// A named answering configuration. Static after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    /// Identifier used by callers (`general_news`, `bangalore_weather`, ...).
    pub id: String,
    /// Human-readable display name.
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// System prompt establishing the model's behavior.
    pub system_prompt: String,
    /// Substring filter over chunk text; empty means no filtering.
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersonaFile {
    personas: Vec<Persona>,
}

/// Closed set of personas. Resolution by unknown id is a typed error, never
/// a missing-key fault; the registry itself never changes after startup.
#[derive(Debug, Clone)]
pub struct PersonaRegistry {
    personas: Vec<Persona>,
}

impl PersonaRegistry {
    /// The designated fallback used by the HTTP edge when a request omits
    /// the persona field. A present-but-unknown id still fails resolution.
    pub const DEFAULT_PERSONA: &'static str = "general_news";

    /// Load `personas.yaml`, materializing the built-in set first when the
    /// file does not exist yet.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        if !path.exists() {
            let file = PersonaFile {
                personas: builtin_personas(),
            };
            let raw = serde_yaml::to_string(&file)
                .map_err(|e| PipelineError::InvalidConfig(e.to_string()))?;
            fs::write(path, raw)?;
            tracing::info!("Wrote default personas to {}", path.display());
        }

        let raw = fs::read_to_string(path)?;
        let file: PersonaFile = serde_yaml::from_str(&raw)
            .map_err(|e| PipelineError::InvalidConfig(format!("{}: {e}", path.display())))?;

        Self::from_personas(file.personas)
    }

    pub fn from_personas(personas: Vec<Persona>) -> Result<Self, PipelineError> {
        if personas.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "persona list is empty".to_string(),
            ));
        }
        for (i, persona) in personas.iter().enumerate() {
            if persona.id.trim().is_empty() {
                return Err(PipelineError::InvalidConfig(format!(
                    "persona at position {i} has an empty id"
                )));
            }
            if personas[..i].iter().any(|other| other.id == persona.id) {
                return Err(PipelineError::InvalidConfig(format!(
                    "duplicate persona id '{}'",
                    persona.id
                )));
            }
        }
        if !personas.iter().any(|p| p.id == Self::DEFAULT_PERSONA) {
            return Err(PipelineError::InvalidConfig(format!(
                "default persona '{}' is missing",
                Self::DEFAULT_PERSONA
            )));
        }

        Ok(Self { personas })
    }

    pub fn resolve(&self, id: &str) -> Result<&Persona, PipelineError> {
        self.personas
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| PipelineError::UnknownPersona(id.to_string()))
    }

    pub fn default_persona(&self) -> &Persona {
        self.resolve(Self::DEFAULT_PERSONA)
            .expect("default persona presence is validated at load")
    }

    pub fn all(&self) -> &[Persona] {
        &self.personas
    }
}

fn builtin_personas() -> Vec<Persona> {
    let p = |id: &str, name: &str, description: &str, system_prompt: &str, keywords: &[&str]| {
        Persona {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            system_prompt: system_prompt.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    };

    vec![
        p(
            "general_news",
            "General News Reporter",
            "Concise factual summaries across the whole corpus.",
            "You are a helpful AI assistant providing concise and factual summaries based on \
             Bangalore news. Answer the question based ONLY on the provided context. If the \
             context doesn't contain the answer, state that the information is not available in \
             the provided documents. Do not make up information.",
            &[],
        ),
        p(
            "education_news",
            "Education & Campus News",
            "Schools, colleges, exams, and campus events.",
            "You are an 'Education & Campus News' assistant for Bangalore. Based ONLY on the \
             provided news context, answer questions about schools, colleges, university \
             announcements, educational policy changes, exams, or significant campus events. If \
             the news context doesn't have this information, state so.",
            &[
                "school", "college", "university", "student", "exam", "admission", "syllabus",
                "education policy", "campus", "sslc", "puc", "results", "academic", "board",
                "institution", "degree", "semester", "curriculum", "faculty", "research",
            ],
        ),
        p(
            "bangalore_weather",
            "Bangalore Weather Watch",
            "Significant weather events and official advisories.",
            "You are 'Bangalore Weather Watch.' Report ONLY on significant weather events or \
             official advisories for Bangalore found in the provided news context. Do not \
             provide live forecasts or general weather knowledge. If no relevant news is in the \
             context, state that.",
            &[
                "weather", "rain", "rainfall", "temperature", "heatwave", "monsoon", "imd",
                "forecast", "climate", "humidity", "cyclone", "storm", "flood", "dry spell",
            ],
        ),
        p(
            "local_safety",
            "Local Safety Reporter",
            "Crime incidents, accidents, and public safety announcements.",
            "You are a 'Local Safety Reporter' for Bangalore. Your role is to provide factual \
             information based ONLY on the provided news context about reported crime \
             incidents, accidents, and public safety announcements. Be objective and stick \
             strictly to the details in the reports. If the context does not contain relevant \
             safety information for the query, state that.",
            &[
                "police", "arrest", "crime", "theft", "accident", "safety", "alert", "fir",
                "assault", "scam", "fraud", "emergency", "complaint", "victim", "investigation",
                "security", "patrol", "incident",
            ],
        ),
        p(
            "community_corner",
            "Community Corner",
            "Local events, festivals, and community initiatives.",
            "You are 'Community Corner,' an AI assistant highlighting local community news and \
             events in Bangalore based ONLY on the provided news context. Report on events, \
             festivals, initiatives, and community activities. If the context lacks this \
             information, state that.",
            &[
                "community", "event", "festival", "celebration", "initiative", "local", "group",
                "organization", "volunteer", "fair", "gathering", "activity", "workshop",
                "public",
            ],
        ),
        p(
            "public_transport",
            "Public Transport Pulse",
            "Namma Metro, BMTC, routes, fares, and disruptions.",
            "You are 'Public Transport Pulse,' an AI specializing in Bangalore's public \
             transportation news. Using ONLY the provided news context, answer questions about \
             Namma Metro or BMTC buses, including reported service updates, new routes, planned \
             expansions, significant disruptions, or fare changes. If the context has no \
             relevant public transport news for the query, clearly state that.",
            &[
                "metro", "namma metro", "bmrcl", "bmtc", "bus", "public transport", "commute",
                "commuters", "fare", "route", "station", "transportation", "service",
                "feeder service", "last mile", "depot", "corridor", "line",
            ],
        ),
    ]
}
