//! In-memory task store for tests and local development.

use std::collections::HashMap;

use async_trait::async_trait;
use bson::oid::ObjectId;
use tokio::sync::RwLock;

use super::{StoreError, TaskStore};
use crate::task::Task;

/// Lock-guarded map of task documents.
#[derive(Default)]
pub struct MemoryStore {
    tasks: RwLock<HashMap<ObjectId, Task>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert(&self, task: &Task) -> Result<(), StoreError> {
        self.tasks.write().await.insert(task.id(), task.clone());
        Ok(())
    }

    async fn find(&self, id: ObjectId) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn list_recent(&self) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self.tasks.read().await.values().cloned().collect();
        tasks.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(tasks)
    }

    async fn update(&self, task: &Task) -> Result<(), StoreError> {
        self.tasks.write().await.insert(task.id(), task.clone());
        Ok(())
    }

    async fn list_in_flight(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self
            .tasks
            .read()
            .await
            .values()
            .filter(|t| t.status().is_in_flight())
            .cloned()
            .collect())
    }

    async fn ping(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = MemoryStore::new();
        let task = Task::new("find me", 0.0).unwrap();
        store.insert(&task).await.unwrap();

        let found = store.find(task.id()).await.unwrap().unwrap();
        assert_eq!(found.description(), "find me");
        assert!(store.find(ObjectId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_recent_is_newest_first() {
        let store = MemoryStore::new();
        let older = Task::new("older", 0.0).unwrap();
        store.insert(&older).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let newer = Task::new("newer", 0.0).unwrap();
        store.insert(&newer).await.unwrap();

        let tasks = store.list_recent().await.unwrap();
        assert_eq!(tasks[0].description(), "newer");
        assert_eq!(tasks[1].description(), "older");
    }
}
