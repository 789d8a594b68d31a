use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlanKind {
    Meal,
    Workout,
}

impl PlanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanKind::Meal => "meal",
            PlanKind::Workout => "workout",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Plan {
    pub id: Uuid,
    pub kind: String,
    pub days: i32,
    pub content: Json<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// List item without the (large) plan body.
#[derive(Debug, Serialize, FromRow)]
pub struct PlanSummary {
    pub id: Uuid,
    pub kind: String,
    pub days: i32,
    pub created_at: DateTime<Utc>,
}
