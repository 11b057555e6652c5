//! newsdesk — question answering over a local news corpus.
//!
//! A query and a persona id arrive; the persona registry resolves a system
//! prompt and optional keyword filter, the retriever searches a vector index
//! built once over the chunked corpus, and the answer generator asks a
//! hosted chat model to synthesize an answer grounded in the retrieved
//! excerpts.

pub mod core;
pub mod corpus;
pub mod embed;
pub mod generate;
pub mod index;
pub mod persona;
pub mod pipeline;
pub mod retrieve;
pub mod server;
pub mod state;
