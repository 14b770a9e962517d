// ============================================================
// Layer 4 — Annotation Loader
// ============================================================
// Reads the record table from a JSON annotation file:
//
//   [
//     { "id": "v1", "title": "...", "asr": "...",
//       "ocr": [{"time": 0, "text": "..."}], "category_id": "0103" },
//     ...
//   ]
//
// raw_index defaults to the record's position in the file.
// In training mode every record must carry a category_id; the
// check happens here so a bad file fails before any worker
// starts instead of part-way through an epoch.

use anyhow::{Context, Result};
use std::{fs, path::Path};

use crate::domain::record::{Mode, Record};
use crate::domain::traits::RecordSource;
use crate::error::PipelineError;

pub struct AnnotationLoader {
    path: String,
    mode: Mode,
}

impl AnnotationLoader {
    pub fn new(path: impl Into<String>, mode: Mode) -> Self {
        Self { path: path.into(), mode }
    }
}

impl RecordSource for AnnotationLoader {
    fn load_all(&self) -> Result<Vec<Record>> {
        let path = Path::new(&self.path);
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read annotations '{}'", self.path))?;

        let mut records: Vec<Record> = serde_json::from_str(&json).map_err(|source| {
            PipelineError::Annotation { path: path.to_path_buf(), source }
        })?;

        for (pos, record) in records.iter_mut().enumerate() {
            record.raw_index.get_or_insert(pos as u64);
        }

        if self.mode == Mode::Train {
            if let Some(unlabeled) = records.iter().find(|r| r.category_id.is_none()) {
                return Err(PipelineError::MissingLabel { id: unlabeled.id.clone() })
                    .with_context(|| format!("'{}' is not a labeled annotation file", self.path));
            }
        }

        tracing::info!("Loaded {} records from '{}'", records.len(), self.path);
        Ok(records)
    }
}
