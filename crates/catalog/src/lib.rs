//! Contracts for the metadata and storage collaborators.
//!
//! The playback core only consumes these; real implementations live with
//! the browsing layer. `MemoryStore` and `StaticMetadata` back tests and the
//! simulator.

pub mod approved;
pub mod error;
pub mod metadata;
pub mod store;

pub use approved::{ApprovedVideos, APPROVED_KEY};
pub use error::{MetadataError, StorageError};
pub use metadata::{MetadataSource, StaticMetadata, VideoMetadata};
pub use store::{KeyValueStore, MemoryStore};
