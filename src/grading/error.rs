use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::database::DatabaseError;

/// One specific rule violation found while validating a component list or a
/// score submission. A single validation pass reports every violation it
/// finds, not just the first.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Violation {
    #[error("component list must not be empty")]
    EmptyComponents,

    #[error("component name must not be empty")]
    EmptyComponentName,

    #[error("duplicate component name: {0}")]
    DuplicateComponent(String),

    #[error("weight {weight} for component '{name}' is outside 0..=100")]
    WeightOutOfRange { name: String, weight: i32 },

    #[error("component weights sum to {0}, must sum to exactly 100")]
    WeightSumMismatch(i32),

    #[error("{count} components exceeds the limit of {limit}")]
    TooManyComponents { count: usize, limit: usize },

    #[error("submission is missing component '{0}'")]
    MissingComponent(String),

    #[error("submission contains unknown component '{0}'")]
    UnknownComponent(String),

    #[error("submission scores component '{0}' more than once")]
    DuplicateScoreEntry(String),

    #[error("score {score} for component '{name}' is outside 0..=100")]
    ScoreOutOfRange { name: String, score: f64 },

    #[error("score for component '{0}' is not a finite number")]
    NonFiniteScore(String),

    #[error("batch must contain at least one entry")]
    EmptyBatch,

    #[error("batch of {count} entries exceeds the limit of {limit}")]
    BatchTooLarge { count: usize, limit: usize },
}

impl Violation {
    /// Field key for the client-facing field_errors map.
    pub fn field(&self) -> String {
        match self {
            Violation::EmptyComponents
            | Violation::EmptyComponentName
            | Violation::WeightSumMismatch(_)
            | Violation::TooManyComponents { .. } => "components".to_string(),
            Violation::EmptyBatch | Violation::BatchTooLarge { .. } => "entries".to_string(),
            Violation::DuplicateComponent(name)
            | Violation::MissingComponent(name)
            | Violation::UnknownComponent(name)
            | Violation::DuplicateScoreEntry(name)
            | Violation::NonFiniteScore(name) => name.clone(),
            Violation::WeightOutOfRange { name, .. } | Violation::ScoreOutOfRange { name, .. } => {
                name.clone()
            }
        }
    }
}

/// Every violation found by one validation pass.
#[derive(Debug, Clone, Error)]
#[error("validation failed with {} violation(s)", .violations.len())]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl ValidationError {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    pub fn field_errors(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        for v in &self.violations {
            map.entry(v.field())
                .and_modify(|existing: &mut String| {
                    existing.push_str("; ");
                    existing.push_str(&v.to_string());
                })
                .or_insert_with(|| v.to_string());
        }
        map
    }

    /// Flat, human-readable summary used as a batch failure reason.
    pub fn summary(&self) -> String {
        self.violations
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// One failing entry of a rejected score batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub student_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum GradingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("grading scheme not found")]
    SchemeNotFound,

    #[error("class not found in this school")]
    ClassNotFound,

    #[error("subject is not assigned to this class and teacher")]
    SubjectNotFound,

    #[error("score record not found for student {student_id}")]
    ScoreNotFound { student_id: Uuid },

    #[error("student {student_id} is not enrolled in this class")]
    NotEnrolled { student_id: Uuid },

    #[error("class does not match the grading scheme")]
    ClassMismatch,

    #[error("a grading scheme already exists for this class, subject and teacher")]
    DuplicateScheme,

    #[error("a score record already exists for student {student_id}; use the edit path")]
    DuplicateScore { student_id: Uuid },

    #[error("grading scheme still has dependent score records")]
    SchemeInUse,

    #[error("teacher is not approved for this school")]
    TeacherNotApproved,

    #[error("only the owning teacher may modify this grading scheme")]
    NotSchemeOwner,

    #[error("subject is not approved")]
    SubjectNotApproved,

    /// Pre-validation found bad entries; nothing was written.
    #[error("score batch rejected: {} invalid entries", .failures.len())]
    BatchRejected { failures: Vec<BatchFailure> },

    /// Existence check under lock found entries on the wrong path (create vs
    /// edit); the transaction was rolled back.
    #[error("score batch conflict: {} entries on the wrong path", .failures.len())]
    BatchConflict { failures: Vec<BatchFailure> },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for GradingError {
    fn from(err: sqlx::Error) -> Self {
        GradingError::Database(DatabaseError::Sqlx(err))
    }
}
