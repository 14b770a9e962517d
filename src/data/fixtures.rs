// Test fixtures: .npy payloads, zip shards and a small
// annotation set written into temporary directories.

use std::{fs::File, io::Write, path::Path};

use ndarray::Array2;
use npyz::WriterBuilder;

use crate::data::archive::SHARD_FILES;

/// Deterministic (frames x dim) matrix; every value is exact in f16
pub fn frame_matrix(frames: usize, dim: usize) -> Array2<f32> {
    Array2::from_shape_fn((frames, dim), |(r, c)| (r * 16 + c) as f32)
}

pub fn npy_f16(rows: usize, cols: usize, values: &[f32]) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut writer = npyz::WriteOptions::<half::f16>::new()
        .default_dtype()
        .shape(&[rows as u64, cols as u64])
        .writer(&mut buf)
        .begin_nd()
        .unwrap();
    writer.extend(values.iter().map(|&v| half::f16::from_f32(v))).unwrap();
    writer.finish().unwrap();
    buf
}

pub fn npy_f32(rows: usize, cols: usize, values: &[f32]) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut writer = npyz::WriteOptions::<f32>::new()
        .default_dtype()
        .shape(&[rows as u64, cols as u64])
        .writer(&mut buf)
        .begin_nd()
        .unwrap();
    writer.extend(values.iter().copied()).unwrap();
    writer.finish().unwrap();
    buf
}

pub fn npy_f32_1d(values: &[f32]) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut writer = npyz::WriteOptions::<f32>::new()
        .default_dtype()
        .shape(&[values.len() as u64])
        .writer(&mut buf)
        .begin_nd()
        .unwrap();
    writer.extend(values.iter().copied()).unwrap();
    writer.finish().unwrap();
    buf
}

/// One archive entry
#[derive(Clone)]
pub struct Entry {
    pub id:    String,
    pub bytes: Vec<u8>,
}

impl Entry {
    /// `frames` x `dim` float16 features following frame_matrix
    pub fn frames(id: &str, frames: usize, dim: usize) -> Self {
        let m = frame_matrix(frames, dim);
        let values: Vec<f32> = m.iter().copied().collect();
        Self { id: id.to_string(), bytes: npy_f16(frames, dim, &values) }
    }

    pub fn raw(id: &str, bytes: &[u8]) -> Self {
        Self { id: id.to_string(), bytes: bytes.to_vec() }
    }
}

fn write_zip(path: &Path, entries: &[Entry]) {
    let file = File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    for entry in entries {
        zip.start_file(format!("{}.npy", entry.id), options).unwrap();
        zip.write_all(&entry.bytes).unwrap();
    }
    zip.finish().unwrap();
}

/// Write labeled_0.zip and labeled_1.zip into `dir`
pub fn write_shards(dir: &Path, shard0: &[Entry], shard1: &[Entry]) {
    write_zip(&dir.join(SHARD_FILES[0]), shard0);
    write_zip(&dir.join(SHARD_FILES[1]), shard1);
}
