// ============================================================
// Layer 3 — Record Domain Type
// ============================================================
// One logical example as it appears in the annotation file.
// The id is the key into the feature archives; the three text
// fields are concatenated with marker tokens later on.
//
// category_id shows up both as a JSON string ("0103") and as a
// plain integer depending on which export produced the file,
// so it is normalised to a String on the way in.

use serde::{Deserialize, Deserializer, Serialize};

/// Whether samples are built for training or for inference.
/// Inference disables random frame sampling and label lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Train,
    Inference,
}

impl Mode {
    pub fn is_inference(self) -> bool {
        self == Mode::Inference
    }
}

/// A single OCR detection; only its text is used
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrFragment {
    #[serde(default)]
    pub text: String,
}

/// An annotated video record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Key into the feature archives ("{id}.npy")
    pub id: String,

    #[serde(default)]
    pub title: String,

    /// Speech transcript
    #[serde(default)]
    pub asr: String,

    /// OCR fragments in on-screen order
    #[serde(default)]
    pub ocr: Vec<OcrFragment>,

    /// Fine-grained category; absent for unlabeled data
    #[serde(default, deserialize_with = "string_or_int")]
    pub category_id: Option<String>,

    /// Position in the source export. Carried through, never used
    /// for feature lookup.
    #[serde(default)]
    pub raw_index: Option<u64>,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id:          id.into(),
            title:       String::new(),
            asr:         String::new(),
            ocr:         Vec::new(),
            category_id: None,
            raw_index:   None,
        }
    }

    /// All OCR texts joined with no separator
    pub fn ocr_text(&self) -> String {
        self.ocr.iter().map(|o| o.text.as_str()).collect()
    }
}

fn string_or_int<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Int(n)  => n.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_accepts_string_and_int() {
        let a: Record = serde_json::from_str(r#"{"id":"a","category_id":"0103"}"#).unwrap();
        let b: Record = serde_json::from_str(r#"{"id":"b","category_id":2301}"#).unwrap();
        let c: Record = serde_json::from_str(r#"{"id":"c"}"#).unwrap();
        assert_eq!(a.category_id.as_deref(), Some("0103"));
        assert_eq!(b.category_id.as_deref(), Some("2301"));
        assert!(c.category_id.is_none());
    }

    #[test]
    fn test_ocr_text_concatenates_without_separator() {
        let rec: Record = serde_json::from_str(
            r#"{"id":"v","ocr":[{"text":"ab","time":1},{"text":"cd"}]}"#,
        ).unwrap();
        assert_eq!(rec.ocr_text(), "abcd");
        assert_eq!(Record::new("x").ocr_text(), "");
    }
}
