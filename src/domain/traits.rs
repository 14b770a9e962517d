// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer asks for records through this trait so
// the annotation format can change (JSON today, a columnar
// export tomorrow) without touching the dataset code.

use anyhow::Result;
use crate::domain::record::Record;

// ─── RecordSource ─────────────────────────────────────────────────────────────
/// Any component that can produce the record table.
///
/// Implementations:
///   - AnnotationLoader → reads a JSON array of records
pub trait RecordSource {
    /// Load every record, in file order.
    fn load_all(&self) -> Result<Vec<Record>>;
}
