// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers for one goal at a time. No
// frame maths or tokenization here, only wiring: load the
// resources, build datasets, hand them to Burn.

// Records, tokenizer and category map loaded once per run
pub mod resources;

// Train/validation datasets and their Burn data loaders
pub mod loader_use_case;

// Assemble a single example for inspection
pub mod inspect_use_case;
