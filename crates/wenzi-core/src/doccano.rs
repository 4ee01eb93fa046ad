//! Conversion of labeled token sequences to doccano's JSON-lines import format.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, WenziError};
use crate::labels::SemanticRecord;

/// One doccano sequence labeling document.
///
/// Serializes as `{"text": "...", "labels": [[start, end, "LABEL"], ...]}`
/// with character offsets and an exclusive end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoccanoRecord {
    pub text: String,
    pub labels: Vec<(usize, usize, String)>,
}

fn joined_len(tokens: &[String], join_chunk: &str) -> usize {
    if tokens.is_empty() {
        return 0;
    }
    let chars: usize = tokens.iter().map(|t| t.chars().count()).sum();
    chars + join_chunk.chars().count() * (tokens.len() - 1)
}

/// Convert semantic records to doccano documents.
///
/// Tokens are joined with `join_chunk` (use `""` for character-level
/// Chinese). For each entity the start offset is the length of the joined
/// text before it, separator included, so `text[start..end]` (in chars) is
/// the joined entity. With `to_file` the documents are also written as
/// JSON lines.
///
/// Files produced by older tools that omitted the separator from the start
/// offset differ by one for every entity not at position 0 when
/// `join_chunk` is non-empty; with `""` the offsets are identical.
pub fn convert_labeling_to_doccano(
    semantic_data: &[SemanticRecord],
    to_file: Option<&Path>,
    join_chunk: &str,
) -> Result<Vec<DoccanoRecord>> {
    let sep_len = join_chunk.chars().count();
    let mut data_list = Vec::with_capacity(semantic_data.len());

    for record in semantic_data {
        let tokens = &record.text_raw;
        let mut labels = Vec::with_capacity(record.labels.len());

        for entity in &record.labels {
            if entity.start > entity.end || entity.end >= tokens.len() {
                return Err(WenziError::InvalidSpan {
                    start: entity.start,
                    end: entity.end,
                    len: tokens.len(),
                });
            }

            let prefix = &tokens[..entity.start];
            let start_index = joined_len(prefix, join_chunk) + if prefix.is_empty() { 0 } else { sep_len };
            let entity_len = joined_len(&tokens[entity.start..=entity.end], join_chunk);
            labels.push((start_index, start_index + entity_len, entity.entity.clone()));
        }

        data_list.push(DoccanoRecord {
            text: tokens.join(join_chunk),
            labels,
        });
    }

    if let Some(path) = to_file {
        let mut writer = BufWriter::new(File::create(path)?);
        for item in &data_list {
            serde_json::to_writer(&mut writer, item)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        info!(records = data_list.len(), path = %path.display(), "wrote doccano dataset");
    }

    Ok(data_list)
}
