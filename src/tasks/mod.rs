//! Background Tasks Module
//!
//! Optional maintenance tasks for a cache manager.
//!
//! # Tasks
//! - Sweep: removes expired memory entries at a configured interval

mod cleanup;

pub use cleanup::{spawn_cleanup_task, spawn_configured_cleanup};
