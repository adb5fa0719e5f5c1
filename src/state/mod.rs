//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `WalkState`: where the page walker is inside one page cycle
//! - `TerminationReason`: why a walk stopped
//! - `Checkpoint` / `CheckpointStore`: the durable resume position

mod checkpoint;
mod walk_state;

pub use checkpoint::{
    Checkpoint, CheckpointError, CheckpointResult, CheckpointStore, FileCheckpointStore,
    PageCursor, ResumePoint,
};
pub use walk_state::{TerminationReason, WalkState};
