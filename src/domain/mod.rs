// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types describing what the system works on:
// experimental records, battery metadata, and discharge cycles.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain structs, enums, traits, and the pure record
//     normalisation they need
//
// Reference: Saha & Goebel (2007) NASA Battery Data Set

/// Raw/canonical record shapes and the recursive normaliser
pub mod record;

/// Per-battery static metadata
pub mod battery;

/// Raw and fixed-length discharge cycles
pub mod cycle;

// Source traits implemented by the data layer
pub mod traits;
