//! Document store boundary.
//!
//! Every script talks to the marketplace database through [`DocumentStore`],
//! a collection-scoped get/add/set/batch interface. [`InMemoryStore`] backs
//! tests and dry runs; [`JsonFileStore`] persists a snapshot on disk.

mod in_memory;
mod json_file;
mod traits;

pub use in_memory::{Collections, InMemoryStore};
pub use json_file::JsonFileStore;
pub use traits::{DocumentStore, WriteBatch, WriteOp};
