use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// One weighted sub-criterion of a grading scheme, e.g. "CA" or "Exam".
/// Weights are whole shares of 100 so the sum invariant is exact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub weight: i32,
}

/// The weighted-component grading definition for one (class, subject, teacher)
/// within a school. At most one scheme exists per tuple.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GradingScheme {
    pub id: Uuid,
    pub school_id: Uuid,
    pub class_id: Uuid,
    pub subject_id: Uuid,
    pub teacher_id: Uuid,
    pub components: Json<Vec<Component>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GradingScheme {
    pub fn components(&self) -> &[Component] {
        &self.components.0
    }

    /// Component names in declaration order.
    pub fn component_names(&self) -> Vec<&str> {
        self.components.0.iter().map(|c| c.name.as_str()).collect()
    }
}
