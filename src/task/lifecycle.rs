//! Task lifecycle manager.
//!
//! Owns the status transitions around planning and execution. `execute`
//! responds as soon as the task is marked executing; the steps themselves
//! run in a background continuation that is tracked in an in-process run
//! registry (one live run per task) and persisted when it finishes.
//! `recover` re-queues tasks a previous process left mid-flight.

use std::collections::HashSet;
use std::sync::Arc;

use bson::oid::ObjectId;
use thiserror::Error;
use tokio::sync::Mutex;

use super::executor::StepExecutor;
use super::planner::plan_steps;
use super::task::{Task, TaskError};
use crate::store::{StoreError, TaskStore};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Task not found")]
    NotFound,

    #[error("Task is already executing")]
    AlreadyRunning,

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct Lifecycle {
    store: Arc<dyn TaskStore>,
    executor: StepExecutor,
    running: Mutex<HashSet<ObjectId>>,
}

impl Lifecycle {
    pub fn new(store: Arc<dyn TaskStore>, executor: StepExecutor) -> Arc<Self> {
        Arc::new(Self {
            store,
            executor,
            running: Mutex::new(HashSet::new()),
        })
    }

    /// Create and persist a new pending task with no steps.
    pub async fn create(&self, description: &str, cost: f64) -> Result<Task, LifecycleError> {
        let task = Task::new(description, cost)?;
        self.store.insert(&task).await?;
        tracing::info!("Created task {}", task.id());
        Ok(task)
    }

    /// Start executing a task.
    ///
    /// Plans the checklist if the task has none, marks the task executing,
    /// spawns the background continuation, and returns the task as of that
    /// moment. A task with a run already in flight is rejected.
    pub async fn execute(self: &Arc<Self>, id: ObjectId) -> Result<Task, LifecycleError> {
        let mut task = self
            .store
            .find(id)
            .await?
            .ok_or(LifecycleError::NotFound)?;

        // Claim the run slot before touching the document so a concurrent
        // execute for the same task cannot interleave.
        if !self.running.lock().await.insert(id) {
            return Err(LifecycleError::AlreadyRunning);
        }

        match self.begin(&mut task).await {
            Ok(()) => {
                let manager = Arc::clone(self);
                let snapshot = task.clone();
                tokio::spawn(async move {
                    manager.run_to_completion(snapshot).await;
                });
                Ok(task)
            }
            Err(e) => {
                self.running.lock().await.remove(&id);
                Err(e)
            }
        }
    }

    /// Plan (first run only) and mark the task executing, persisting each
    /// transition.
    async fn begin(&self, task: &mut Task) -> Result<(), LifecycleError> {
        if task.steps().is_empty() {
            task.plan(plan_steps(task.description()))?;
            self.store.update(task).await?;
            tracing::debug!(
                "Planned {} steps for task {}",
                task.steps().len(),
                task.id()
            );
        }

        task.start_executing()?;
        self.store.update(task).await?;
        Ok(())
    }

    /// Background continuation: drive the steps, persist the final status,
    /// release the run slot. Failures are recorded on the task and logged;
    /// nothing is surfaced to a client at this point.
    async fn run_to_completion(self: Arc<Self>, mut task: Task) {
        let id = task.id();

        let outcome = self.executor.execute_steps(task.steps_mut()).await;
        let transition = match outcome {
            Ok(()) => task.complete(),
            Err(e) => {
                tracing::error!("Task {} execution failed: {}", id, e);
                task.fail()
            }
        };
        if let Err(e) = transition {
            tracing::error!("Task {} final transition rejected: {}", id, e);
        }

        if let Err(e) = self.store.update(&task).await {
            tracing::error!("Failed to persist final status for task {}: {}", id, e);
        } else {
            tracing::info!("Task {} finished with status {}", id, task.status().as_str());
        }

        self.running.lock().await.remove(&id);
    }

    /// Re-queue tasks a previous process left in planning/executing.
    ///
    /// Steps re-run from the top; the simulated work is repeatable, so
    /// at-least-once is safe. Returns how many tasks were re-queued.
    pub async fn recover(self: &Arc<Self>) -> Result<usize, LifecycleError> {
        let stranded = self.store.list_in_flight().await?;
        let count = stranded.len();

        for task in stranded {
            let id = task.id();
            tracing::warn!(
                "Recovering task {} stranded in {}",
                id,
                task.status().as_str()
            );
            if let Err(e) = self.execute(id).await {
                tracing::error!("Failed to recover task {}: {}", id, e);
            }
        }

        Ok(count)
    }

    /// Whether a run for this task is currently in flight.
    pub async fn is_running(&self, id: ObjectId) -> bool {
        self.running.lock().await.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::task::executor::{SimulatedRunner, StepRunner};
    use crate::task::task::{Step, StepStatus, TaskStatus};
    use async_trait::async_trait;
    use std::time::Duration;

    fn manager(store: Arc<dyn TaskStore>) -> Arc<Lifecycle> {
        let runner = SimulatedRunner::with_delay(Duration::ZERO);
        Lifecycle::new(store, StepExecutor::new(Arc::new(runner)))
    }

    /// Poll the store until the task reaches a terminal status.
    async fn wait_for_finish(store: &Arc<dyn TaskStore>, id: ObjectId) -> Task {
        for _ in 0..200 {
            let task = store.find(id).await.unwrap().unwrap();
            if task.status().is_terminal() {
                return task;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task never reached a terminal status");
    }

    #[tokio::test]
    async fn test_create_persists_pending_task() {
        let store: Arc<dyn TaskStore> = Arc::new(MemoryStore::new());
        let lifecycle = manager(Arc::clone(&store));

        let task = lifecycle.create("Build an NFT marketplace", 2.0).await.unwrap();
        let stored = store.find(task.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), TaskStatus::Pending);
        assert!(stored.steps().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_empty_description() {
        let store: Arc<dyn TaskStore> = Arc::new(MemoryStore::new());
        let lifecycle = manager(store);
        assert!(matches!(
            lifecycle.create("", 0.0).await,
            Err(LifecycleError::Task(TaskError::EmptyDescription))
        ));
    }

    #[tokio::test]
    async fn test_execute_plans_then_runs_to_completion() {
        let store: Arc<dyn TaskStore> = Arc::new(MemoryStore::new());
        let lifecycle = manager(Arc::clone(&store));

        let created = lifecycle.create("Build an NFT marketplace", 2.0).await.unwrap();
        let executing = lifecycle.execute(created.id()).await.unwrap();

        // The synchronous return happens before the background run finishes.
        assert_eq!(executing.status(), TaskStatus::Executing);
        assert_eq!(executing.steps().len(), 8);

        let finished = wait_for_finish(&store, created.id()).await;
        assert_eq!(finished.status(), TaskStatus::Completed);
        for step in finished.steps() {
            assert_eq!(step.status, StepStatus::Completed);
            assert_eq!(
                step.result.as_deref(),
                Some(format!("Completed: {}", step.description).as_str())
            );
        }
    }

    #[tokio::test]
    async fn test_execute_unknown_task_is_not_found() {
        let store: Arc<dyn TaskStore> = Arc::new(MemoryStore::new());
        let lifecycle = manager(store);
        assert!(matches!(
            lifecycle.execute(ObjectId::new()).await,
            Err(LifecycleError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_reexecution_skips_planning() {
        let store: Arc<dyn TaskStore> = Arc::new(MemoryStore::new());
        let lifecycle = manager(Arc::clone(&store));

        let created = lifecycle.create("swap tokens", 1.0).await.unwrap();
        lifecycle.execute(created.id()).await.unwrap();
        let first = wait_for_finish(&store, created.id()).await;
        assert_eq!(first.steps().len(), 7);

        // Second run keeps the same checklist instead of planning again.
        let second = lifecycle.execute(created.id()).await.unwrap();
        assert_eq!(second.status(), TaskStatus::Executing);
        assert_eq!(second.steps().len(), 7);
        wait_for_finish(&store, created.id()).await;
    }

    #[tokio::test]
    async fn test_concurrent_execute_is_rejected() {
        let store: Arc<dyn TaskStore> = Arc::new(MemoryStore::new());

        /// Runner slow enough to keep the first run in flight.
        struct SlowRunner;

        #[async_trait]
        impl StepRunner for SlowRunner {
            async fn run(&self, step: &Step) -> anyhow::Result<String> {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(format!("Completed: {}", step.description))
            }
        }

        let lifecycle = Lifecycle::new(
            Arc::clone(&store),
            StepExecutor::new(Arc::new(SlowRunner)),
        );

        let created = lifecycle.create("generic", 0.0).await.unwrap();
        lifecycle.execute(created.id()).await.unwrap();
        assert!(lifecycle.is_running(created.id()).await);

        assert!(matches!(
            lifecycle.execute(created.id()).await,
            Err(LifecycleError::AlreadyRunning)
        ));

        wait_for_finish(&store, created.id()).await;
        assert!(!lifecycle.is_running(created.id()).await);
    }

    #[tokio::test]
    async fn test_failed_step_fails_task_and_leaves_rest_pending() {
        let store: Arc<dyn TaskStore> = Arc::new(MemoryStore::new());

        struct BrokenRunner;

        #[async_trait]
        impl StepRunner for BrokenRunner {
            async fn run(&self, _step: &Step) -> anyhow::Result<String> {
                anyhow::bail!("no workers available")
            }
        }

        let lifecycle = Lifecycle::new(
            Arc::clone(&store),
            StepExecutor::new(Arc::new(BrokenRunner)),
        );

        let created = lifecycle.create("generic", 0.0).await.unwrap();
        lifecycle.execute(created.id()).await.unwrap();

        let finished = wait_for_finish(&store, created.id()).await;
        assert_eq!(finished.status(), TaskStatus::Failed);
        assert_eq!(finished.steps()[0].status, StepStatus::Failed);
        for step in &finished.steps()[1..] {
            assert_eq!(step.status, StepStatus::Pending);
        }
    }

    #[tokio::test]
    async fn test_recover_requeues_stranded_tasks() {
        let store: Arc<dyn TaskStore> = Arc::new(MemoryStore::new());

        // Simulate a task a dead process left mid-execution.
        let mut stranded = Task::new("Build an NFT marketplace", 0.0).unwrap();
        stranded.plan(plan_steps(stranded.description())).unwrap();
        stranded.start_executing().unwrap();
        store.insert(&stranded).await.unwrap();

        let lifecycle = manager(Arc::clone(&store));
        let recovered = lifecycle.recover().await.unwrap();
        assert_eq!(recovered, 1);

        let finished = wait_for_finish(&store, stranded.id()).await;
        assert_eq!(finished.status(), TaskStatus::Completed);
    }
}
