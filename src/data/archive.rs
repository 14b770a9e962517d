// ============================================================
// Layer 4 — Feature Archives
// ============================================================
// Pre-extracted frame features live in two zip shards:
//
//   feature_dir/
//     labeled_0.zip   { "v1.npy", "v7.npy", ... }
//     labeled_1.zip   { "v2.npy", "v3.npy", ... }
//
// Every id is in exactly one shard. Each entry is a NumPy array
// of shape (num_frames, feature_dim), normally float16, widened
// to f32 on read.
//
// Lookup is two-tier: shard 0 answers Found or NotFound, and
// only NotFound moves on to shard 1. A corrupt entry in shard 0
// is reported, not retried, unless FallbackPolicy::AnyError is
// configured (which logs what it masks).
//
// Reference: NumPy .npy format (NEP 1), zip crate ZipArchive

use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use ndarray::{Array2, ShapeBuilder};
use npyz::{DType, NpyFile, Order};
use serde::{Deserialize, Serialize};
use zip::{result::ZipError, ZipArchive};

use crate::error::{PipelineError, Result};

/// Shard file names, in lookup order
pub const SHARD_FILES: [&str; 2] = ["labeled_0.zip", "labeled_1.zip"];

/// What a shard-0 failure other than "not found" should do
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Only a missing entry falls through to shard 1
    #[default]
    MissingOnly,
    /// Any shard-0 failure falls through to shard 1 (logged)
    AnyError,
}

/// Result of looking an entry up in a single shard
#[derive(Debug)]
pub enum Lookup {
    Found(Vec<u8>),
    NotFound,
}

/// One open zip shard
pub struct FeatureShard {
    index:   usize,
    path:    PathBuf,
    archive: ZipArchive<File>,
}

impl FeatureShard {
    pub fn open(index: usize, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::open(&path).map_err(|e| PipelineError::ArchiveOpen {
            path:   path.clone(),
            source: ZipError::Io(e),
        })?;
        let archive = ZipArchive::new(file).map_err(|source| PipelineError::ArchiveOpen {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(
            "Opened shard {} '{}' ({} entries)",
            index,
            path.display(),
            archive.len()
        );
        Ok(Self { index, path, archive })
    }

    /// Raw bytes of `entry`, or NotFound
    pub fn lookup(&mut self, entry: &str) -> Result<Lookup> {
        let (shard, archive) = (self.index, &self.path);
        let read_err = |reason: String| PipelineError::EntryRead {
            shard,
            archive: archive.clone(),
            entry: entry.to_string(),
            reason,
        };

        match self.archive.by_name(entry) {
            Ok(mut file) => {
                let mut buf = Vec::with_capacity(file.size() as usize);
                file.read_to_end(&mut buf).map_err(|e| read_err(e.to_string()))?;
                Ok(Lookup::Found(buf))
            }
            Err(ZipError::FileNotFound) => Ok(Lookup::NotFound),
            Err(e) => Err(read_err(e.to_string())),
        }
    }
}

/// Both shards, opened together and owned by one worker
pub struct ShardPair {
    shards: [FeatureShard; 2],
    policy: FallbackPolicy,
}

impl ShardPair {
    pub fn open(dir: impl AsRef<Path>, policy: FallbackPolicy) -> Result<Self> {
        let dir = dir.as_ref();
        let primary   = FeatureShard::open(0, dir.join(SHARD_FILES[0]))?;
        let secondary = FeatureShard::open(1, dir.join(SHARD_FILES[1]))?;
        Ok(Self { shards: [primary, secondary], policy })
    }

    /// Decoded (num_frames, feature_dim) features for `id`
    pub fn read_features(&mut self, id: &str) -> Result<Array2<f32>> {
        let entry = format!("{id}.npy");

        let masked = match self.read_from(0, id, &entry) {
            Ok(Some(feats)) => return Ok(feats),
            Ok(None) => None,
            Err(e) if self.policy == FallbackPolicy::AnyError => {
                tracing::warn!("Shard 0 failed for '{}', trying shard 1: {}", id, e);
                Some(e)
            }
            Err(e) => return Err(e),
        };

        match self.read_from(1, id, &entry)? {
            Some(feats) => Ok(feats),
            // Under AnyError the shard-0 failure is the better explanation
            None => Err(masked.unwrap_or_else(|| PipelineError::FeatureMissing {
                id: id.to_string(),
            })),
        }
    }

    fn read_from(&mut self, shard: usize, id: &str, entry: &str) -> Result<Option<Array2<f32>>> {
        match self.shards[shard].lookup(entry)? {
            Lookup::Found(bytes) => decode_npy(id, shard, &bytes).map(Some),
            Lookup::NotFound => Ok(None),
        }
    }
}

/// Decode a 2-D .npy payload (f2/f4/f8, C or Fortran order) into f32
pub fn decode_npy(id: &str, shard: usize, bytes: &[u8]) -> Result<Array2<f32>> {
    let decode_err = |reason: String| PipelineError::Decode {
        id: id.to_string(),
        shard,
        reason,
    };

    let npy = NpyFile::new(bytes).map_err(|e| decode_err(e.to_string()))?;

    let shape = npy.shape().to_vec();
    if shape.len() != 2 {
        return Err(PipelineError::BadShape { id: id.to_string(), shape });
    }
    let (rows, cols) = (shape[0] as usize, shape[1] as usize);
    let fortran = npy.order() == Order::Fortran;

    let type_str = match npy.dtype() {
        DType::Plain(ts) => ts.to_string(),
        other => return Err(decode_err(format!("unsupported dtype {other:?}"))),
    };

    // First char is the byte order; npyz handles it when reading
    let values: Vec<f32> = match type_str.get(1..) {
        Some("f2") => npy
            .into_vec::<half::f16>()
            .map_err(|e| decode_err(e.to_string()))?
            .into_iter()
            .map(half::f16::to_f32)
            .collect(),
        Some("f4") => npy.into_vec::<f32>().map_err(|e| decode_err(e.to_string()))?,
        Some("f8") => npy
            .into_vec::<f64>()
            .map_err(|e| decode_err(e.to_string()))?
            .into_iter()
            .map(|v| v as f32)
            .collect(),
        _ => return Err(decode_err(format!("unsupported dtype '{type_str}'"))),
    };

    let array = if fortran {
        Array2::from_shape_vec((rows, cols).f(), values)
    } else {
        Array2::from_shape_vec((rows, cols), values)
    };
    array.map_err(|e| decode_err(e.to_string()))
}
