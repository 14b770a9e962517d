// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from annotation records and zip shards to
// tensor batches.
//
// The pipeline flows in this order:
//
//   annotation .json          labeled_{0,1}.zip
//       │                          │
//       ▼                          ▼
//   AnnotationLoader          ShardPair (per worker)
//       │                          │
//       │                          ▼
//       │                     frame normaliser  → pad / subsample
//       ▼                          │
//   TextEncoder  ◄── markers       │
//       │                          │
//       └──────────┬───────────────┘
//                  ▼
//          MultiModalDataset   → implements Burn's Dataset trait
//                  │
//                  ▼
//          MultiModalBatcher   → stacks samples into tensors
//                  │
//                  ▼
//             DataLoader       → feeds batches to the model
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads the JSON record table
pub mod loader;

/// Zip shards, tagged lookup and .npy decoding
pub mod archive;

/// One shard pair per loader worker
pub mod handles;

/// Pad / subsample frames to a fixed count
pub mod frames;

/// Marker concatenation and fixed-length tokenization
pub mod text;

/// Implements Burn's Dataset trait for multimodal samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Seeded train/validation split
pub mod splitter;

#[cfg(test)]
pub(crate) mod fixtures;
