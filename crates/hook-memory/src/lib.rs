//! Memory side of the hooks.
//!
//! - [`client`]: the memory API surface and its HTTP implementation
//! - [`session`]: session resolution, handoff files and the Stop sequence
//! - [`topic`]: recall query derivation
//! - [`observation`]: tool-use observation extraction
//! - [`schema`]: the observation record

pub mod client;
pub mod observation;
pub mod schema;
pub mod session;
pub mod topic;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use client::{HttpMemoryClient, MemoryApi, MemoryApiError, best_effort};
pub use observation::{ToolUseEvent, build_observation};
pub use schema::{Intent, ObservationRecord, ObservationType};
pub use session::{HandoffStore, SessionCoordinator, SessionHandoff};
