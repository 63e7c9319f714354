// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The metadata index and the raw record store are external
// collaborators: this crate consumes them but does not own their
// formats. The application layer only sees these traits, so a
// JSON directory, an archive, or an in-memory fixture are
// interchangeable.

use anyhow::Result;

use crate::domain::battery::BatteryMetadata;
use crate::domain::record::RawRecord;

// ─── MetadataSource ───────────────────────────────────────────────────────────
/// Anything that can enumerate the batteries of a corpus.
///
/// Implementations:
///   - JsonMetadataIndex → a single JSON object keyed by battery id
pub trait MetadataSource {
    /// All batteries, sorted by identifier.
    fn load_all(&self) -> Result<Vec<BatteryMetadata>>;
}

// ─── RecordSource ─────────────────────────────────────────────────────────────
/// Anything that can hand back one battery's raw record.
///
/// Implementations:
///   - JsonRecordStore → `<root>/<sub_path>/<id>.json`
pub trait RecordSource {
    /// Load the raw record for `battery`. A failure here is not fatal
    /// to a run; callers skip the battery and continue.
    fn load(&self, battery: &BatteryMetadata) -> Result<RawRecord>;
}
