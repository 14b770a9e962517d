// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Loads the pretrained BERT tokenizer used for title/ASR/OCR text.
//
// Two layouts are supported for the model directory:
//   1. tokenizer.json  — a full HuggingFace tokenizer definition
//   2. vocab.txt only  — the classic BERT checkpoint layout
//
// For (2) we build the tokenizer JSON in memory (BERT normaliser,
// BERT pre-tokenizer, WordPiece model with "##" continuations)
// and parse it, the same way a tokenizer.json would be read.
// No post-processor is attached: [CLS]/[SEP] framing, truncation
// and padding are done by TextEncoder so the fixed length is
// under our control.
//
// A tokenizer.json may carry its own padding/truncation; both
// are cleared on load.
//
// Marker tokens ([unused1] etc.) are registered as special added
// tokens afterwards, which makes the tokenizer match them before
// normalisation and never split them.

use std::{collections::HashMap, fs, path::PathBuf};

use tokenizers::{AddedToken, Tokenizer};

use crate::error::{PipelineError, Result};

pub const PAD_TOKEN:  &str = "[PAD]";
pub const UNK_TOKEN:  &str = "[UNK]";
pub const CLS_TOKEN:  &str = "[CLS]";
pub const SEP_TOKEN:  &str = "[SEP]";
pub const MASK_TOKEN: &str = "[MASK]";

pub struct TokenizerStore {
    dir:       PathBuf,
    lowercase: bool,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<String>) -> Self {
        Self { dir: PathBuf::from(dir.into()), lowercase: true }
    }

    /// Keep case when building from vocab.txt (cased checkpoints)
    pub fn cased(mut self) -> Self {
        self.lowercase = false;
        self
    }

    /// Load the tokenizer and register `markers` as never-split tokens
    pub fn load(&self, markers: &[String]) -> Result<Tokenizer> {
        let json_path = self.dir.join("tokenizer.json");
        let mut tokenizer = if json_path.exists() {
            tracing::info!("Loading tokenizer from '{}'", json_path.display());
            Tokenizer::from_file(&json_path).map_err(|e| {
                PipelineError::tokenizer(format!(
                    "cannot load '{}': {e}", json_path.display()
                ))
            })?
        } else {
            self.build_from_vocab()?
        };

        // TextEncoder does its own fixed-length framing
        tokenizer
            .with_truncation(None)
            .map_err(PipelineError::tokenizer)?
            .with_padding(None);

        let added: Vec<AddedToken> = markers
            .iter()
            .map(|m| AddedToken::from(m.clone(), true))
            .collect();
        tokenizer.add_special_tokens(&added);

        for required in [CLS_TOKEN, SEP_TOKEN, PAD_TOKEN] {
            if tokenizer.token_to_id(required).is_none() {
                return Err(PipelineError::tokenizer(format!(
                    "vocabulary has no {required} token"
                )));
            }
        }
        Ok(tokenizer)
    }

    /// Build a WordPiece tokenizer from vocab.txt (one token per line,
    /// id = line number)
    fn build_from_vocab(&self) -> Result<Tokenizer> {
        let vocab_path = self.dir.join("vocab.txt");
        let text = fs::read_to_string(&vocab_path).map_err(|e| {
            PipelineError::tokenizer(format!(
                "no tokenizer.json and cannot read '{}': {e}",
                vocab_path.display()
            ))
        })?;

        // ── Step 1: vocabulary ────────────────────────────────────────────────
        let mut vocab: HashMap<String, usize> = HashMap::new();
        for (id, line) in text.lines().enumerate() {
            let token = line.trim_end_matches('\r');
            if !token.is_empty() {
                vocab.entry(token.to_string()).or_insert(id);
            }
        }
        if !vocab.contains_key(UNK_TOKEN) {
            return Err(PipelineError::tokenizer(format!(
                "'{}' has no {UNK_TOKEN} token", vocab_path.display()
            )));
        }

        // ── Step 2: special tokens present in the vocabulary ──────────────────
        let added_tokens: Vec<serde_json::Value> =
            [PAD_TOKEN, UNK_TOKEN, CLS_TOKEN, SEP_TOKEN, MASK_TOKEN]
                .iter()
                .filter_map(|tok| vocab.get(*tok).map(|&id| (tok, id)))
                .map(|(tok, id)| serde_json::json!({
                    "id": id, "content": tok, "single_word": false,
                    "lstrip": false, "rstrip": false,
                    "normalized": false, "special": true
                }))
                .collect();

        // ── Step 3: tokenizer definition in HuggingFace format ────────────────
        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": added_tokens,
            "normalizer": {
                "type": "BertNormalizer",
                "clean_text": true,
                "handle_chinese_chars": true,
                "strip_accents": null,
                "lowercase": self.lowercase
            },
            "pre_tokenizer": { "type": "BertPreTokenizer" },
            "post_processor": null,
            "decoder": { "type": "WordPiece", "prefix": "##", "cleanup": true },
            "model": {
                "type": "WordPiece",
                "unk_token": UNK_TOKEN,
                "continuing_subword_prefix": "##",
                "max_input_chars_per_word": 100,
                "vocab": vocab
            }
        });

        let tokenizer: Tokenizer = tokenizer_json
            .to_string()
            .parse()
            .map_err(|e| PipelineError::tokenizer(format!("invalid WordPiece definition: {e}")))?;

        tracing::info!(
            "Built WordPiece tokenizer from '{}' ({} tokens)",
            vocab_path.display(),
            tokenizer.get_vocab_size(false)
        );
        Ok(tokenizer)
    }
}
