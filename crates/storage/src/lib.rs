//! spillway-storage: persistence gateway for analysis results.
//!
//! Defines the [`SearchStore`] trait every backend implements, the record
//! types it traffics in, and [`MemoryStore`], the built-in backend. The
//! [`conformance`] module carries a backend-agnostic test suite so an
//! alternative backend can prove it behaves like the reference one.

pub mod conformance;
mod error;
mod memory;
mod record;
mod traits;

pub use error::StorageError;
pub use memory::MemoryStore;
pub use record::{NewSearch, SearchId, SearchRecord, StoredReading};
pub use traits::SearchStore;
