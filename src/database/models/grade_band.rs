use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// School-defined numeric range mapped to a letter grade. Bands are only
/// consulted at read time; a resolved letter is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GradeBand {
    pub id: Uuid,
    pub school_id: Uuid,
    pub letter_grade: String,
    pub min_score: f64,
    pub max_score: f64,
    pub created_at: DateTime<Utc>,
}

impl GradeBand {
    pub fn contains(&self, score: f64) -> bool {
        score >= self.min_score && score <= self.max_score
    }
}
