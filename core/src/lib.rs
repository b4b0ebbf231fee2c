//! Journey persistence and the stateful journey service.
//!
//! `checkin-types` holds the pure rules; this crate adds the durable store and
//! the service that keeps the in-memory habit and the stored habit in step.

mod error;
mod journey;
mod store;

pub use error::{JourneyError, PersistenceError};
pub use journey::Journey;
pub use store::{
    FileKeyValueStore, HABIT_KEY, JourneyStore, KeyValueStore, MemoryKeyValueStore, delete_key,
    read_json, write_json,
};
