//! Persistent stores: relational index metadata and raw article bytes.

pub mod document;
pub mod memory;
pub mod relational;

pub use document::DocumentStore;
pub use memory::MemoryRelationalStore;
pub use relational::{DocumentMeta, Field, RelationalStore, TermIngest, TfRow};
