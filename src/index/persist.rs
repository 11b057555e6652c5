//! Binary persistence for [`SearchIndex`] with staleness validation.
//!
//! File layout, all integers little-endian:
//!
//! ```text
//! magic "NDIX" | u16 version | u32 model-id len | model-id utf8
//! | u32 dimension | u32 chunk count
//! | chunk-count × dimension × f32 vectors
//! | per chunk: u32 record len | JSON chunk record
//! ```
//!
//! A persisted index is never trusted blindly: `load` compares the stored
//! model id, dimensionality, and chunk count against the live embedder and
//! corpus, and reports [`PipelineError::IndexStale`] on any divergence so the
//! caller re-embeds and rebuilds.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::core::errors::PipelineError;
use crate::corpus::Chunk;
use crate::index::SearchIndex;

const MAGIC: &[u8; 4] = b"NDIX";
const FORMAT_VERSION: u16 = 1;

pub fn save(index: &SearchIndex, path: &Path) -> Result<(), PipelineError> {
    let mut writer = BufWriter::new(File::create(path)?);

    writer.write_all(MAGIC)?;
    writer.write_all(&FORMAT_VERSION.to_le_bytes())?;

    let model_id = index.model_id().as_bytes();
    writer.write_all(&(model_id.len() as u32).to_le_bytes())?;
    writer.write_all(model_id)?;

    writer.write_all(&(index.dimension() as u32).to_le_bytes())?;
    writer.write_all(&(index.len() as u32).to_le_bytes())?;

    for embedding in index.embeddings() {
        for value in embedding {
            writer.write_all(&value.to_le_bytes())?;
        }
    }

    for chunk in index.chunks() {
        let record = serde_json::to_vec(chunk).map_err(|e| {
            PipelineError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        writer.write_all(&(record.len() as u32).to_le_bytes())?;
        writer.write_all(&record)?;
    }

    writer.flush()?;
    tracing::info!(
        "Saved index ({} chunks, dimension {}) to {}",
        index.len(),
        index.dimension(),
        path.display()
    );
    Ok(())
}

/// Load a persisted index, validating it against the live pipeline.
///
/// `expected_model`, `expected_dimension`, and `expected_chunks` describe the
/// current embedder and the chunking of the current corpus. Any disagreement,
/// and any corruption of the file itself, is `IndexStale` — recoverable by
/// rebuilding, never by serving stale vectors.
pub fn load(
    path: &Path,
    expected_model: &str,
    expected_dimension: usize,
    expected_chunks: usize,
) -> Result<SearchIndex, PipelineError> {
    let mut reader = BufReader::new(File::open(path)?);
    read_index(&mut reader, expected_model, expected_dimension, expected_chunks)
        .map_err(|e| match e {
            stale @ PipelineError::IndexStale(_) => stale,
            other => PipelineError::IndexStale(format!("unreadable index file: {other}")),
        })
}

fn read_index(
    reader: &mut impl Read,
    expected_model: &str,
    expected_dimension: usize,
    expected_chunks: usize,
) -> Result<SearchIndex, PipelineError> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(PipelineError::IndexStale("bad magic".to_string()));
    }

    let version = read_u16(reader)?;
    if version != FORMAT_VERSION {
        return Err(PipelineError::IndexStale(format!(
            "format version {version}, expected {FORMAT_VERSION}"
        )));
    }

    let model_len = read_u32(reader)? as usize;
    let mut model_bytes = vec![0u8; model_len];
    reader.read_exact(&mut model_bytes)?;
    let model_id = String::from_utf8(model_bytes)
        .map_err(|_| PipelineError::IndexStale("model id is not utf-8".to_string()))?;
    if model_id != expected_model {
        return Err(PipelineError::IndexStale(format!(
            "built with model '{model_id}', current model is '{expected_model}'"
        )));
    }

    let dimension = read_u32(reader)? as usize;
    if dimension != expected_dimension {
        return Err(PipelineError::IndexStale(format!(
            "stored dimension {dimension}, embedder produces {expected_dimension}"
        )));
    }

    let count = read_u32(reader)? as usize;
    if count != expected_chunks {
        return Err(PipelineError::IndexStale(format!(
            "stored chunk count {count}, live corpus chunks to {expected_chunks}"
        )));
    }

    let mut embeddings = Vec::with_capacity(count);
    let mut buf = vec![0u8; dimension * 4];
    for _ in 0..count {
        reader.read_exact(&mut buf)?;
        let vector: Vec<f32> = buf
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        embeddings.push(vector);
    }

    let mut chunks: Vec<Chunk> = Vec::with_capacity(count);
    for _ in 0..count {
        let record_len = read_u32(reader)? as usize;
        let mut record = vec![0u8; record_len];
        reader.read_exact(&mut record)?;
        let chunk = serde_json::from_slice(&record)
            .map_err(|e| PipelineError::IndexStale(format!("corrupt chunk record: {e}")))?;
        chunks.push(chunk);
    }

    SearchIndex::build(&model_id, dimension, chunks, embeddings)
}

fn read_u16(reader: &mut impl Read) -> Result<u16, PipelineError> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32(reader: &mut impl Read) -> Result<u32, PipelineError> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}
