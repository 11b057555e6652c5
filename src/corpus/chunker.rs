use serde::{Deserialize, Serialize};

use super::loader::Document;

/// A bounded span of a document's text, the unit of embedding and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub document_id: String,
    pub chunk_index: usize,
    /// Character offset of the chunk within the source document.
    pub start_offset: usize,
    pub text: String,
}

impl Chunk {
    /// Stable identifier used in answer source attributions and logs.
    pub fn ref_id(&self) -> String {
        format!("{}#{}", self.document_id, self.chunk_index)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub chunk_chars: usize,
    pub overlap_chars: usize,
}

impl ChunkingConfig {
    fn step(&self) -> usize {
        // Validated at settings load; the max(1) guards direct construction.
        self.chunk_chars.saturating_sub(self.overlap_chars).max(1)
    }
}

/// Split one document into fixed-size overlapping windows of characters.
///
/// Deterministic for a fixed text and configuration, and lossless: the
/// windows cover every character, so concatenating them minus the overlaps
/// reconstructs the document exactly. No boundary snapping.
pub fn chunk_document(doc: &Document, config: ChunkingConfig) -> Vec<Chunk> {
    let chars: Vec<char> = doc.text.chars().collect();
    let total = chars.len();
    let mut chunks = Vec::new();

    let mut start = 0;
    let mut chunk_index = 0;
    while start < total {
        let end = (start + config.chunk_chars).min(total);
        chunks.push(Chunk {
            document_id: doc.id.clone(),
            chunk_index,
            start_offset: start,
            text: chars[start..end].iter().collect(),
        });
        if end == total {
            break;
        }
        start += config.step();
        chunk_index += 1;
    }

    chunks
}

/// Chunk every document in corpus order. Chunk order is the index insertion
/// order, which `SearchIndex` uses to break score ties.
pub fn chunk_corpus(docs: &[Document], config: ChunkingConfig) -> Vec<Chunk> {
    docs.iter()
        .flat_map(|doc| chunk_document(doc, config))
        .collect()
}
