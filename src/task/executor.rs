//! Step executor.
//!
//! Drives a task's steps strictly in order. The per-step operation sits
//! behind [`StepRunner`] so the simulated runner can be swapped for a real
//! one (and so the failure path is testable even though the simulation
//! never fails).

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::task::{Step, StepStatus};

/// Result text recorded on a step whose runner errored.
const FAILED_RESULT: &str = "Step execution failed";

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Step {index} failed: {message}")]
    StepFailed { index: usize, message: String },
}

/// Performs the underlying work of one step.
#[async_trait]
pub trait StepRunner: Send + Sync {
    /// Run a step, returning its result text.
    async fn run(&self, step: &Step) -> anyhow::Result<String>;
}

/// Simulated runner: waits a fixed delay, then reports the step done.
pub struct SimulatedRunner {
    step_delay: Duration,
}

impl SimulatedRunner {
    /// Standard 2-second simulation delay.
    pub fn new() -> Self {
        Self {
            step_delay: Duration::from_secs(2),
        }
    }

    /// Runner with a custom delay (tests use zero).
    pub fn with_delay(step_delay: Duration) -> Self {
        Self { step_delay }
    }
}

impl Default for SimulatedRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StepRunner for SimulatedRunner {
    async fn run(&self, step: &Step) -> anyhow::Result<String> {
        tokio::time::sleep(self.step_delay).await;
        Ok(format!("Completed: {}", step.description))
    }
}

/// Executes steps sequentially, stopping at the first failure.
pub struct StepExecutor {
    runner: std::sync::Arc<dyn StepRunner>,
}

impl StepExecutor {
    pub fn new(runner: std::sync::Arc<dyn StepRunner>) -> Self {
        Self { runner }
    }

    /// Executor over the standard simulated runner.
    pub fn simulated() -> Self {
        Self::new(std::sync::Arc::new(SimulatedRunner::new()))
    }

    /// Run every step in order.
    ///
    /// Successful steps are marked completed with the runner's result text.
    /// A failing step is marked failed with a generic result, the remaining
    /// steps are left untouched, and the failure surfaces to the caller.
    pub async fn execute_steps(&self, steps: &mut [Step]) -> Result<(), ExecutorError> {
        for (index, step) in steps.iter_mut().enumerate() {
            match self.runner.run(step).await {
                Ok(result) => {
                    step.status = StepStatus::Completed;
                    step.result = Some(result);
                }
                Err(e) => {
                    step.status = StepStatus::Failed;
                    step.result = Some(FAILED_RESULT.to_string());
                    return Err(ExecutorError::StepFailed {
                        index,
                        message: e.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::planner::plan_steps;

    /// Runner that errors on one step index.
    struct FailingRunner {
        fail_at: usize,
        calls: std::sync::atomic::AtomicUsize,
    }

    impl FailingRunner {
        fn new(fail_at: usize) -> Self {
            Self {
                fail_at,
                calls: std::sync::atomic::AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl StepRunner for FailingRunner {
        async fn run(&self, step: &Step) -> anyhow::Result<String> {
            let index = self
                .calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if index == self.fail_at {
                anyhow::bail!("simulated breakage");
            }
            Ok(format!("Completed: {}", step.description))
        }
    }

    #[tokio::test]
    async fn test_all_steps_complete_with_results() {
        let mut steps = plan_steps("Build an NFT marketplace");
        let executor = StepExecutor::new(std::sync::Arc::new(SimulatedRunner::with_delay(
            Duration::ZERO,
        )));

        executor.execute_steps(&mut steps).await.unwrap();

        assert_eq!(steps.len(), 8);
        for step in &steps {
            assert_eq!(step.status, StepStatus::Completed);
            assert_eq!(
                step.result.as_deref(),
                Some(format!("Completed: {}", step.description).as_str())
            );
        }
    }

    #[tokio::test]
    async fn test_failure_stops_at_failed_step() {
        let mut steps = plan_steps("generic work");
        let executor = StepExecutor::new(std::sync::Arc::new(FailingRunner::new(2)));

        let err = executor.execute_steps(&mut steps).await.unwrap_err();
        assert!(matches!(err, ExecutorError::StepFailed { index: 2, .. }));

        assert_eq!(steps[0].status, StepStatus::Completed);
        assert_eq!(steps[1].status, StepStatus::Completed);
        assert_eq!(steps[2].status, StepStatus::Failed);
        assert_eq!(steps[2].result.as_deref(), Some("Step execution failed"));
        for step in &steps[3..] {
            assert_eq!(step.status, StepStatus::Pending);
            assert!(step.result.is_none());
        }
    }
}
