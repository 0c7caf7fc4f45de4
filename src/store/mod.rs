//! Task persistence.
//!
//! `TaskStore` is the async interface the lifecycle manager writes through;
//! `MongoStore` is the production implementation, `MemoryStore` backs tests.

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use async_trait::async_trait;
use bson::oid::ObjectId;
use thiserror::Error;

use crate::task::Task;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Backend(String),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(e: mongodb::error::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// Async interface for task persistence.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert a new task document.
    async fn insert(&self, task: &Task) -> Result<(), StoreError>;

    /// Load a task by id.
    async fn find(&self, id: ObjectId) -> Result<Option<Task>, StoreError>;

    /// All tasks, newest first (by creation time).
    async fn list_recent(&self) -> Result<Vec<Task>, StoreError>;

    /// Replace a task document with its current state.
    async fn update(&self, task: &Task) -> Result<(), StoreError>;

    /// Tasks whose status says they were mid-flight (planning/executing),
    /// used by startup recovery.
    async fn list_in_flight(&self) -> Result<Vec<Task>, StoreError>;

    /// Whether the backing database currently answers.
    async fn ping(&self) -> bool;
}
