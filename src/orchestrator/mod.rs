//! Session orchestration.
//!
//! Owns at most one active session, wires a program to the shared
//! collaborators, enforces the lifecycle state machine, and guarantees
//! cleanup on every exit path.

pub mod engine;
pub mod events;

pub use engine::SessionOrchestrator;
pub use events::{SessionEvent, StateSnapshot};
