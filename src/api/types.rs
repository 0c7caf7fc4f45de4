//! API request and response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::{PaymentStatus, Step, Task, TaskStatus};

/// Request to create a new task.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskRequest {
    /// The task description
    #[serde(default)]
    pub description: Option<String>,

    /// Cost in APT (defaults to 0)
    #[serde(default)]
    pub cost: Option<f64>,
}

/// A task as rendered over HTTP.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    /// Task identifier (hex)
    pub id: String,

    pub description: String,

    pub cost: f64,

    pub status: TaskStatus,

    pub payment_status: PaymentStatus,

    pub steps: Vec<Step>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl From<&Task> for TaskResponse {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id().to_hex(),
            description: task.description().to_string(),
            cost: task.cost(),
            status: task.status(),
            payment_status: task.payment_status(),
            steps: task.steps().to_vec(),
            created_at: task.created_at(),
            updated_at: task.updated_at(),
        }
    }
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self::from(&task)
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Document-store connectivity: "connected" or "disconnected"
    pub mongodb: String,
}

/// Error body returned for every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_response_field_names() {
        let task = Task::new("Build an NFT marketplace", 2.5).unwrap();
        let value = serde_json::to_value(TaskResponse::from(&task)).unwrap();

        assert_eq!(value["description"], "Build an NFT marketplace");
        assert_eq!(value["cost"], 2.5);
        assert_eq!(value["status"], "pending");
        assert_eq!(value["paymentStatus"], "pending");
        assert!(value["createdAt"].is_string());
        assert!(value["updatedAt"].is_string());
        assert_eq!(value["id"].as_str().unwrap().len(), 24);
    }

    #[test]
    fn test_create_request_fields_are_optional() {
        let req: CreateTaskRequest = serde_json::from_value(json!({})).unwrap();
        assert!(req.description.is_none());
        assert!(req.cost.is_none());

        let req: CreateTaskRequest =
            serde_json::from_value(json!({"description": "x", "cost": 3})).unwrap();
        assert_eq!(req.description.as_deref(), Some("x"));
        assert_eq!(req.cost, Some(3.0));
    }
}
