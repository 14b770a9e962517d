// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types describing what the pipeline works on:
// annotation records, the category hierarchy, and the trait
// that record sources implement.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO archive or tokenizer access
//   - Only plain Rust structs, enums, and traits

// One annotated video: id, title, ASR, OCR fragments, label
pub mod record;

// Fine-grained category id → class index lookup
pub mod category;

// Core abstractions (traits) that other layers implement
pub mod traits;
