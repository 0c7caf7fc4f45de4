//! Core Task type and its status machine.
//!
//! # Invariants
//! - `steps` is empty only while the task is `Pending`
//! - `Completed` implies every step completed
//! - `Failed` implies execution stopped at the first failed step; steps
//!   after it remain pending

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a task in its lifecycle.
///
/// # State Machine
/// ```text
/// Pending -> Planning -> Executing -> Completed
///                                 \-> Failed
/// Completed/Failed -> Executing   (re-execution)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Task is created, steps not yet planned
    Pending,
    /// Steps have just been planned
    Planning,
    /// Steps are being executed in the background
    Executing,
    /// Every step completed
    Completed,
    /// A step failed and execution stopped
    Failed,
}

impl TaskStatus {
    /// Check if the task is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Check if the task was left mid-flight (relevant for crash recovery).
    pub fn is_in_flight(&self) -> bool {
        matches!(self, TaskStatus::Planning | TaskStatus::Executing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Planning => "planning",
            TaskStatus::Executing => "executing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

/// Payment status of a task.
///
/// Tracked on the document but never advanced by the execution flow; no
/// payment integration is wired into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Status of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Completed,
    Failed,
}

/// One planned sub-unit of a task's checklist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// What this step accomplishes
    pub description: String,

    /// Current status
    pub status: StepStatus,

    /// Result text, set once the step finishes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl Step {
    /// Create a pending step with no result.
    pub fn pending(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            status: StepStatus::Pending,
            result: None,
        }
    }
}

/// A unit of user-submitted work tracked through the status lifecycle.
///
/// Persisted as one document with embedded step subdocuments. Mutation goes
/// through the explicit transition methods; the struct never leaves an
/// invalid state combination behind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier
    #[serde(rename = "_id")]
    id: ObjectId,

    /// Human-readable description of what to accomplish
    description: String,

    /// Cost in APT, as supplied by the caller
    cost: f64,

    /// Current lifecycle status
    status: TaskStatus,

    /// Payment status (left untouched by execution)
    payment_status: PaymentStatus,

    /// Ordered checklist produced by the planner
    steps: Vec<Step>,

    /// Creation timestamp
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    created_at: DateTime<Utc>,

    /// Last update timestamp
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a new pending task with no steps.
    ///
    /// # Errors
    /// Returns `Err` if the description is empty or the cost is negative.
    pub fn new(description: impl Into<String>, cost: f64) -> Result<Self, TaskError> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(TaskError::EmptyDescription);
        }
        if cost < 0.0 {
            return Err(TaskError::NegativeCost(cost));
        }

        let now = Utc::now();
        Ok(Self {
            id: ObjectId::new(),
            description,
            cost,
            status: TaskStatus::Pending,
            payment_status: PaymentStatus::Pending,
            steps: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Mutable access to the steps, for the executor.
    pub fn steps_mut(&mut self) -> &mut [Step] {
        &mut self.steps
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Attach the planned checklist.
    ///
    /// # Precondition
    /// The task has never been planned (`steps` is empty).
    pub fn plan(&mut self, steps: Vec<Step>) -> Result<(), TaskError> {
        if !self.steps.is_empty() {
            return Err(TaskError::AlreadyPlanned);
        }
        if steps.is_empty() {
            return Err(TaskError::EmptyPlan);
        }
        self.steps = steps;
        self.status = TaskStatus::Planning;
        self.touch();
        Ok(())
    }

    /// Transition to `Executing`.
    ///
    /// Legal from `Planning` and, for re-execution, from any state with a
    /// non-empty checklist.
    pub fn start_executing(&mut self) -> Result<(), TaskError> {
        if self.steps.is_empty() {
            return Err(TaskError::InvalidTransition {
                from: self.status,
                to: TaskStatus::Executing,
            });
        }
        self.status = TaskStatus::Executing;
        self.touch();
        Ok(())
    }

    /// Transition to `Completed`.
    ///
    /// # Precondition
    /// `self.status == Executing`
    pub fn complete(&mut self) -> Result<(), TaskError> {
        match self.status {
            TaskStatus::Executing => {
                self.status = TaskStatus::Completed;
                self.touch();
                Ok(())
            }
            from => Err(TaskError::InvalidTransition {
                from,
                to: TaskStatus::Completed,
            }),
        }
    }

    /// Transition to `Failed`.
    ///
    /// # Precondition
    /// `self.status == Executing`
    pub fn fail(&mut self) -> Result<(), TaskError> {
        match self.status {
            TaskStatus::Executing => {
                self.status = TaskStatus::Failed;
                self.touch();
                Ok(())
            }
            from => Err(TaskError::InvalidTransition {
                from,
                to: TaskStatus::Failed,
            }),
        }
    }

    /// Refresh the update timestamp. Transitions call this themselves.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Errors from task construction and transitions.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TaskError {
    #[error("Task description cannot be empty")]
    EmptyDescription,

    #[error("Task cost cannot be negative (got {0})")]
    NegativeCost(f64),

    #[error("Task steps are already planned")]
    AlreadyPlanned,

    #[error("Planner produced no steps")]
    EmptyPlan,

    #[error("Invalid state transition from {} to {}", from.as_str(), to.as_str())]
    InvalidTransition { from: TaskStatus, to: TaskStatus },
}
