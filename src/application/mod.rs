// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Workflow coordination only. No tensor math, no argument
// parsing, no file formats; those belong to Layers 5, 1 and
// 4/6 respectively.
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Raw records → row store
pub mod prepare_use_case;

// Row store → trained models + summary
pub mod train_use_case;
