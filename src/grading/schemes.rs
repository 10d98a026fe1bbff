use chrono::Utc;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::error::GradingError;
use super::validator;
use crate::config;
use crate::database::models::{Component, GradingScheme};
use crate::database::DatabaseManager;
use crate::directory::{Directory, PgDirectory};

/// Owns the weighted-component schema for a (school, class, subject, teacher)
/// tuple. At most one scheme exists per tuple; the unique index backs up the
/// application-level check against concurrent creates.
pub struct SchemeService<D = PgDirectory> {
    pool: PgPool,
    directory: D,
}

impl SchemeService<PgDirectory> {
    pub async fn new() -> Result<Self, GradingError> {
        let pool = DatabaseManager::pool().await?;
        let directory = PgDirectory::new(pool.clone());
        Ok(Self { pool, directory })
    }
}

impl<D: Directory> SchemeService<D> {
    pub fn with_parts(pool: PgPool, directory: D) -> Self {
        Self { pool, directory }
    }

    pub async fn create_scheme(
        &self,
        school_id: Uuid,
        class_id: Uuid,
        subject_id: Uuid,
        teacher_id: Uuid,
        components: Vec<Component>,
    ) -> Result<GradingScheme, GradingError> {
        // Shape rules run before any database access
        validator::validate_component_shape(
            &components,
            config::config().grading.max_components_per_scheme,
        )?;

        if !self.directory.class_exists(school_id, class_id).await? {
            return Err(GradingError::ClassNotFound);
        }
        if !self
            .directory
            .is_approved_teacher(teacher_id, school_id)
            .await?
        {
            return Err(GradingError::TeacherNotApproved);
        }
        if !self
            .directory
            .subject_belongs_to(subject_id, class_id, teacher_id, school_id)
            .await?
        {
            return Err(GradingError::SubjectNotFound);
        }
        if !self.directory.subject_is_approved(subject_id).await? {
            return Err(GradingError::SubjectNotApproved);
        }

        let existing: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM grading_schemes
             WHERE school_id = $1 AND class_id = $2 AND subject_id = $3 AND teacher_id = $4",
        )
        .bind(school_id)
        .bind(class_id)
        .bind(subject_id)
        .bind(teacher_id)
        .fetch_optional(&self.pool)
        .await?;
        if existing.is_some() {
            return Err(GradingError::DuplicateScheme);
        }

        let scheme = sqlx::query_as::<_, GradingScheme>(
            "INSERT INTO grading_schemes
                 (id, school_id, class_id, subject_id, teacher_id, components, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(school_id)
        .bind(class_id)
        .bind(subject_id)
        .bind(teacher_id)
        .bind(Json(components))
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            // Concurrent create for the same tuple loses to the unique index
            sqlx::Error::Database(db) if db.constraint() == Some("grading_schemes_scope_key") => {
                GradingError::DuplicateScheme
            }
            _ => GradingError::from(e),
        })?;

        tracing::info!(scheme_id = %scheme.id, %class_id, %subject_id, "created grading scheme");
        Ok(scheme)
    }

    /// Replaces the full component list. Existing score records are NOT
    /// revalidated; a record that now references absent component names
    /// fails closed at its next update (see ScoreService::update_score).
    pub async fn update_scheme(
        &self,
        scheme_id: Uuid,
        school_id: Uuid,
        teacher_id: Uuid,
        components: Vec<Component>,
    ) -> Result<GradingScheme, GradingError> {
        validator::validate_component_shape(
            &components,
            config::config().grading.max_components_per_scheme,
        )?;

        let scheme = fetch_scheme_by_id(&self.pool, scheme_id).await?;
        if scheme.school_id != school_id {
            return Err(GradingError::SchemeNotFound);
        }
        if scheme.teacher_id != teacher_id {
            return Err(GradingError::NotSchemeOwner);
        }

        let updated = sqlx::query_as::<_, GradingScheme>(
            "UPDATE grading_schemes SET components = $1, updated_at = $2 WHERE id = $3 RETURNING *",
        )
        .bind(Json(components))
        .bind(Utc::now())
        .bind(scheme_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(GradingError::SchemeNotFound)?;

        tracing::info!(scheme_id = %scheme_id, "replaced grading scheme components");
        Ok(updated)
    }

    pub async fn get_scheme(
        &self,
        school_id: Uuid,
        class_id: Uuid,
        subject_id: Uuid,
        teacher_id: Uuid,
    ) -> Result<GradingScheme, GradingError> {
        sqlx::query_as::<_, GradingScheme>(
            "SELECT * FROM grading_schemes
             WHERE school_id = $1 AND class_id = $2 AND subject_id = $3 AND teacher_id = $4",
        )
        .bind(school_id)
        .bind(class_id)
        .bind(subject_id)
        .bind(teacher_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(GradingError::SchemeNotFound)
    }

    /// Deletion is refused while any score record references the scheme.
    pub async fn delete_scheme(
        &self,
        scheme_id: Uuid,
        school_id: Uuid,
        teacher_id: Uuid,
    ) -> Result<(), GradingError> {
        let scheme = fetch_scheme_by_id(&self.pool, scheme_id).await?;
        if scheme.school_id != school_id {
            return Err(GradingError::SchemeNotFound);
        }
        if scheme.teacher_id != teacher_id {
            return Err(GradingError::NotSchemeOwner);
        }

        let mut tx = self.pool.begin().await.map_err(GradingError::from)?;

        let dependents: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM score_records WHERE grading_scheme_id = $1")
                .bind(scheme_id)
                .fetch_one(&mut *tx)
                .await?;
        if dependents.0 > 0 {
            return Err(GradingError::SchemeInUse);
        }

        let deleted: Option<(Uuid,)> =
            sqlx::query_as("DELETE FROM grading_schemes WHERE id = $1 RETURNING id")
                .bind(scheme_id)
                .fetch_optional(&mut *tx)
                .await?;
        if deleted.is_none() {
            return Err(GradingError::SchemeNotFound);
        }

        tx.commit().await.map_err(GradingError::from)?;
        tracing::info!(scheme_id = %scheme_id, "deleted grading scheme");
        Ok(())
    }

    pub async fn list_schemes_for_class(
        &self,
        school_id: Uuid,
        class_id: Uuid,
    ) -> Result<Vec<GradingScheme>, GradingError> {
        let schemes = sqlx::query_as::<_, GradingScheme>(
            "SELECT * FROM grading_schemes
             WHERE school_id = $1 AND class_id = $2
             ORDER BY created_at, id",
        )
        .bind(school_id)
        .bind(class_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(schemes)
    }
}

/// Shared scheme lookup used by the ledger, coordinator and aggregator.
pub(super) async fn fetch_scheme_by_id(
    pool: &PgPool,
    scheme_id: Uuid,
) -> Result<GradingScheme, GradingError> {
    sqlx::query_as::<_, GradingScheme>("SELECT * FROM grading_schemes WHERE id = $1")
        .bind(scheme_id)
        .fetch_optional(pool)
        .await?
        .ok_or(GradingError::SchemeNotFound)
}
