use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::error::GradingError;
use super::schemes::fetch_scheme_by_id;
use super::validator::{self, ScoreSubmission};
use crate::database::models::{ComponentScore, ScoreRecord};
use crate::database::DatabaseManager;
use crate::directory::{Directory, PgDirectory};

/// One row of a class score sheet: an enrolled student with their record, or
/// with null score fields when nothing has been recorded yet.
#[derive(Debug, Serialize)]
pub struct ClassScoreEntry {
    pub student_id: Uuid,
    pub record_id: Option<Uuid>,
    pub component_scores: Option<Vec<ComponentScore>>,
    pub total_score: Option<f64>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// The score ledger: exactly one record per (scheme, student, class).
/// Creates and updates are distinct paths; a duplicate create is a conflict,
/// never an upsert.
pub struct ScoreService<D = PgDirectory> {
    pool: PgPool,
    directory: D,
}

impl ScoreService<PgDirectory> {
    pub async fn new() -> Result<Self, GradingError> {
        let pool = DatabaseManager::pool().await?;
        let directory = PgDirectory::new(pool.clone());
        Ok(Self { pool, directory })
    }
}

impl<D: Directory> ScoreService<D> {
    pub fn with_parts(pool: PgPool, directory: D) -> Self {
        Self { pool, directory }
    }

    pub async fn create_score(
        &self,
        school_id: Uuid,
        scheme_id: Uuid,
        student_id: Uuid,
        class_id: Uuid,
        submission: &ScoreSubmission,
    ) -> Result<ScoreRecord, GradingError> {
        let scheme = fetch_scheme_by_id(&self.pool, scheme_id).await?;
        if scheme.school_id != school_id {
            return Err(GradingError::SchemeNotFound);
        }
        if scheme.class_id != class_id {
            return Err(GradingError::ClassMismatch);
        }

        let validated = validator::validate_submission(&scheme, submission)?;

        if !self.directory.is_enrolled(student_id, class_id).await? {
            return Err(GradingError::NotEnrolled { student_id });
        }

        let existing: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM score_records
             WHERE grading_scheme_id = $1 AND student_id = $2 AND class_id = $3",
        )
        .bind(scheme_id)
        .bind(student_id)
        .bind(class_id)
        .fetch_optional(&self.pool)
        .await?;
        if existing.is_some() {
            return Err(GradingError::DuplicateScore { student_id });
        }

        let record = sqlx::query_as::<_, ScoreRecord>(
            "INSERT INTO score_records
                 (id, grading_scheme_id, student_id, class_id, teacher_id, school_id,
                  component_scores, total_score, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(scheme_id)
        .bind(student_id)
        .bind(class_id)
        .bind(scheme.teacher_id)
        .bind(scheme.school_id)
        .bind(Json(validated.component_scores))
        .bind(validated.total_score)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.constraint() == Some("score_records_scope_key") => {
                GradingError::DuplicateScore { student_id }
            }
            _ => GradingError::from(e),
        })?;

        tracing::info!(
            record_id = %record.id,
            %student_id,
            total = record.total_score,
            "created score record"
        );
        Ok(record)
    }

    /// Re-validates against the CURRENT scheme: if the scheme's components
    /// changed since the record was written, the update fails closed rather
    /// than persisting scores against names the scheme no longer declares.
    pub async fn update_score(
        &self,
        school_id: Uuid,
        scheme_id: Uuid,
        student_id: Uuid,
        class_id: Uuid,
        submission: &ScoreSubmission,
    ) -> Result<ScoreRecord, GradingError> {
        let scheme = fetch_scheme_by_id(&self.pool, scheme_id).await?;
        if scheme.school_id != school_id {
            return Err(GradingError::SchemeNotFound);
        }
        let validated = validator::validate_submission(&scheme, submission)?;

        let updated = sqlx::query_as::<_, ScoreRecord>(
            "UPDATE score_records
             SET component_scores = $1, total_score = $2, updated_at = $3
             WHERE grading_scheme_id = $4 AND student_id = $5 AND class_id = $6
             RETURNING *",
        )
        .bind(Json(validated.component_scores))
        .bind(validated.total_score)
        .bind(Utc::now())
        .bind(scheme_id)
        .bind(student_id)
        .bind(class_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(GradingError::ScoreNotFound { student_id })?;

        tracing::info!(
            record_id = %updated.id,
            %student_id,
            total = updated.total_score,
            "updated score record"
        );
        Ok(updated)
    }

    /// The class score sheet for a scheme: every currently enrolled student,
    /// with null score fields for students who have no record yet.
    pub async fn scores_for_class(
        &self,
        school_id: Uuid,
        scheme_id: Uuid,
        session_id: Uuid,
        term_id: Uuid,
    ) -> Result<Vec<ClassScoreEntry>, GradingError> {
        let scheme = fetch_scheme_by_id(&self.pool, scheme_id).await?;
        if scheme.school_id != school_id {
            return Err(GradingError::SchemeNotFound);
        }

        let enrolled = self
            .directory
            .list_enrolled(scheme.class_id, session_id, term_id)
            .await?;

        let records = sqlx::query_as::<_, ScoreRecord>(
            "SELECT * FROM score_records WHERE grading_scheme_id = $1",
        )
        .bind(scheme_id)
        .fetch_all(&self.pool)
        .await?;

        let by_student: std::collections::HashMap<Uuid, ScoreRecord> =
            records.into_iter().map(|r| (r.student_id, r)).collect();

        Ok(enrolled
            .into_iter()
            .map(|student_id| match by_student.get(&student_id) {
                Some(record) => ClassScoreEntry {
                    student_id,
                    record_id: Some(record.id),
                    component_scores: Some(record.component_scores.0.clone()),
                    total_score: Some(record.total_score),
                    updated_at: Some(record.updated_at),
                },
                None => ClassScoreEntry {
                    student_id,
                    record_id: None,
                    component_scores: None,
                    total_score: None,
                    updated_at: None,
                },
            })
            .collect())
    }
}
