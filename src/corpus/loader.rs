use std::collections::BTreeMap;
use std::path::Path;

use crate::core::errors::PipelineError;

/// One source record from the corpus file. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub metadata: BTreeMap<String, String>,
}

/// Load the corpus CSV into normalized documents.
///
/// `text_column` names the column holding the article body; every other
/// column lands in `metadata`. Rows with an empty text cell are skipped.
/// Document identity comes from `id_column` when given, otherwise the
/// 0-based row ordinal.
pub fn load_documents(
    path: &Path,
    text_column: &str,
    id_column: Option<&str>,
) -> Result<Vec<Document>, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::SourceNotFound(path.to_path_buf()));
    }

    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| PipelineError::SourceMalformed(e.to_string()))?;

    let headers = reader
        .headers()
        .map_err(|e| PipelineError::SourceMalformed(e.to_string()))?
        .clone();

    let text_idx = headers
        .iter()
        .position(|h| h == text_column)
        .ok_or_else(|| {
            PipelineError::SourceMalformed(format!(
                "text column '{}' not found, available columns: {:?}",
                text_column,
                headers.iter().collect::<Vec<_>>()
            ))
        })?;

    let id_idx = match id_column {
        Some(name) => Some(headers.iter().position(|h| h == name).ok_or_else(|| {
            PipelineError::SourceMalformed(format!("id column '{name}' not found"))
        })?),
        None => None,
    };

    let mut documents = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| {
            PipelineError::SourceMalformed(format!("row {}: {e}", row + 1))
        })?;

        let text = record.get(text_idx).unwrap_or("").trim();
        if text.is_empty() {
            continue;
        }

        let id = match id_idx {
            Some(idx) => record.get(idx).unwrap_or("").trim().to_string(),
            None => row.to_string(),
        };

        let metadata: BTreeMap<String, String> = headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != text_idx && Some(*idx) != id_idx)
            .filter_map(|(idx, header)| {
                record
                    .get(idx)
                    .map(|value| (header.to_string(), value.to_string()))
            })
            .collect();

        documents.push(Document {
            id,
            text: text.to_string(),
            metadata,
        });
    }

    tracing::info!(
        "Loaded {} documents from {}",
        documents.len(),
        path.display()
    );
    Ok(documents)
}
