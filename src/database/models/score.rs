use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// A single achieved score against one named scheme component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentScore {
    pub name: String,
    pub score: f64,
}

/// One student's recorded scores against a grading scheme plus the computed
/// total. At most one row exists per (scheme, student, class).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScoreRecord {
    pub id: Uuid,
    pub grading_scheme_id: Uuid,
    pub student_id: Uuid,
    pub class_id: Uuid,
    pub teacher_id: Uuid,
    pub school_id: Uuid,
    pub component_scores: Json<Vec<ComponentScore>>,
    pub total_score: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScoreRecord {
    pub fn component_scores(&self) -> &[ComponentScore] {
        &self.component_scores.0
    }
}
