// ============================================================
// Layer 4 — Text Encoder
// ============================================================
// Turns the three text fields of a record into one fixed-length
// token sequence:
//
//   [unused4] title [unused1] asr [unused3] ocr_1 ocr_2 ...
//       │
//       ▼  tokenizer (markers are never split)
//   [CLS] t t t ... t [SEP] [PAD] [PAD] ...
//   <──────────── seq_length ────────────>
//
// Word pieces are truncated to seq_length - 2 so [CLS] and [SEP]
// always fit. The attention mask is 1 over [CLS]..[SEP] and 0
// over padding.

use tokenizers::Tokenizer;

use crate::domain::record::Record;
use crate::error::{PipelineError, Result};
use crate::infra::tokenizer_store::{CLS_TOKEN, PAD_TOKEN, SEP_TOKEN};

/// Separators inserted before each text field
#[derive(Debug, Clone)]
pub struct TextMarkers {
    pub title: String,
    pub asr:   String,
    pub ocr:   String,
}

impl TextMarkers {
    /// Take the first three configured markers as title, ASR, OCR
    pub fn from_list(markers: &[String]) -> Result<Self> {
        match markers {
            [title, asr, ocr, ..] => Ok(Self {
                title: title.clone(),
                asr:   asr.clone(),
                ocr:   ocr.clone(),
            }),
            _ => Err(PipelineError::Config {
                reason: format!("need 3 text markers, got {}", markers.len()),
            }),
        }
    }

    /// Concatenate the record's text fields with the markers
    pub fn compose(&self, record: &Record) -> String {
        let ocr = record.ocr_text();
        let mut out = String::with_capacity(
            self.title.len() + self.asr.len() + self.ocr.len()
                + record.title.len() + record.asr.len() + ocr.len(),
        );
        out.push_str(&self.title);
        out.push_str(&record.title);
        out.push_str(&self.asr);
        out.push_str(&record.asr);
        out.push_str(&self.ocr);
        out.push_str(&ocr);
        out
    }
}

/// Token ids and attention mask, both exactly seq_length long
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedText {
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
}

pub struct TextEncoder {
    tokenizer:  Tokenizer,
    seq_length: usize,
    cls_id:     u32,
    sep_id:     u32,
    pad_id:     u32,
}

impl TextEncoder {
    pub fn new(tokenizer: Tokenizer, seq_length: usize) -> Result<Self> {
        if seq_length < 2 {
            return Err(PipelineError::Config {
                reason: format!("sequence length {seq_length} leaves no room for [CLS]/[SEP]"),
            });
        }
        let id_of = |tok: &str| {
            tokenizer
                .token_to_id(tok)
                .ok_or_else(|| PipelineError::tokenizer(format!("vocabulary has no {tok} token")))
        };
        let cls_id = id_of(CLS_TOKEN)?;
        let sep_id = id_of(SEP_TOKEN)?;
        let pad_id = id_of(PAD_TOKEN)?;

        Ok(Self { tokenizer, seq_length, cls_id, sep_id, pad_id })
    }

    /// Tokenize, truncate, frame with [CLS]/[SEP] and pad to seq_length
    pub fn encode(&self, text: &str) -> Result<EncodedText> {
        let enc = self
            .tokenizer
            .encode(text, false)
            .map_err(PipelineError::tokenizer)?;

        let body = enc.get_ids();
        let keep = body.len().min(self.seq_length - 2);

        let mut input_ids = Vec::with_capacity(self.seq_length);
        input_ids.push(self.cls_id);
        input_ids.extend_from_slice(&body[..keep]);
        input_ids.push(self.sep_id);

        let real = input_ids.len();
        let mut attention_mask = vec![1u32; real];

        input_ids.resize(self.seq_length, self.pad_id);
        attention_mask.resize(self.seq_length, 0);

        Ok(EncodedText { input_ids, attention_mask })
    }
}
