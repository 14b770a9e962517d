// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting pieces used by the data and application layers:
//
//   config.rs          — PipelineConfig / PretrainConfig, read
//                        from JSON and validated before use.
//
//   tokenizer_store.rs — Loads the BERT tokenizer from a model
//                        directory (tokenizer.json or vocab.txt)
//                        and registers the never-split markers.

/// Pipeline and pretraining configuration
pub mod config;

/// Tokenizer loading and marker registration
pub mod tokenizer_store;
