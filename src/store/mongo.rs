//! MongoDB-backed task store.
//!
//! One `tasks` collection, each task a single document with embedded step
//! subdocuments.

use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use futures::stream::TryStreamExt;
use mongodb::options::FindOptions;
use mongodb::{Client, Collection, Database};

use super::{StoreError, TaskStore};
use crate::task::Task;

const TASKS_COLLECTION: &str = "tasks";

pub struct MongoStore {
    db: Database,
    tasks: Collection<Task>,
}

impl MongoStore {
    /// Connect using the configured URI. The database name comes from the
    /// URI when present, otherwise `default_db`.
    pub async fn connect(uri: &str, default_db: &str) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(uri).await?;
        let db = client
            .default_database()
            .unwrap_or_else(|| client.database(default_db));
        let tasks = db.collection::<Task>(TASKS_COLLECTION);
        Ok(Self { db, tasks })
    }
}

#[async_trait]
impl TaskStore for MongoStore {
    async fn insert(&self, task: &Task) -> Result<(), StoreError> {
        self.tasks.insert_one(task, None).await?;
        Ok(())
    }

    async fn find(&self, id: ObjectId) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.find_one(doc! { "_id": id }, None).await?)
    }

    async fn list_recent(&self) -> Result<Vec<Task>, StoreError> {
        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .build();
        let cursor = self.tasks.find(None, options).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn update(&self, task: &Task) -> Result<(), StoreError> {
        self.tasks
            .replace_one(doc! { "_id": task.id() }, task, None)
            .await?;
        Ok(())
    }

    async fn list_in_flight(&self) -> Result<Vec<Task>, StoreError> {
        let filter = doc! { "status": { "$in": ["planning", "executing"] } };
        let cursor = self.tasks.find(filter, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn ping(&self) -> bool {
        self.db.run_command(doc! { "ping": 1 }, None).await.is_ok()
    }
}
