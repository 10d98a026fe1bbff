use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{Directory, SessionRef, SubjectRef, TermRef};
use crate::database::DatabaseError;

/// Directory port backed by the platform's collaborator tables.
#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Directory for PgDirectory {
    async fn class_exists(&self, school_id: Uuid, class_id: Uuid) -> Result<bool, DatabaseError> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM classes WHERE id = $1 AND school_id = $2")
                .bind(class_id)
                .bind(school_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.0 > 0)
    }

    async fn subject_belongs_to(
        &self,
        subject_id: Uuid,
        class_id: Uuid,
        teacher_id: Uuid,
        school_id: Uuid,
    ) -> Result<bool, DatabaseError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM subjects
             WHERE id = $1 AND class_id = $2 AND teacher_id = $3 AND school_id = $4",
        )
        .bind(subject_id)
        .bind(class_id)
        .bind(teacher_id)
        .bind(school_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0 > 0)
    }

    async fn subject_is_approved(&self, subject_id: Uuid) -> Result<bool, DatabaseError> {
        let approved: Option<(bool,)> =
            sqlx::query_as("SELECT approved FROM subjects WHERE id = $1")
                .bind(subject_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(approved.map(|(a,)| a).unwrap_or(false))
    }

    async fn is_approved_teacher(
        &self,
        teacher_id: Uuid,
        school_id: Uuid,
    ) -> Result<bool, DatabaseError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM teachers
             WHERE id = $1 AND school_id = $2 AND approved = TRUE",
        )
        .bind(teacher_id)
        .bind(school_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0 > 0)
    }

    async fn is_enrolled(&self, student_id: Uuid, class_id: Uuid) -> Result<bool, DatabaseError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM class_enrollments WHERE student_id = $1 AND class_id = $2",
        )
        .bind(student_id)
        .bind(class_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0 > 0)
    }

    async fn list_enrolled(
        &self,
        class_id: Uuid,
        session_id: Uuid,
        term_id: Uuid,
    ) -> Result<Vec<Uuid>, DatabaseError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT student_id FROM class_enrollments
             WHERE class_id = $1 AND session_id = $2 AND term_id = $3
             ORDER BY student_id",
        )
        .bind(class_id)
        .bind(session_id)
        .bind(term_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn enrollment_for(
        &self,
        student_id: Uuid,
        session_id: Uuid,
        term_id: Uuid,
    ) -> Result<Option<Uuid>, DatabaseError> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            "SELECT class_id FROM class_enrollments
             WHERE student_id = $1 AND session_id = $2 AND term_id = $3",
        )
        .bind(student_id)
        .bind(session_id)
        .bind(term_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(class_id,)| class_id))
    }

    async fn subject_ref(&self, subject_id: Uuid) -> Result<Option<SubjectRef>, DatabaseError> {
        let row: Option<(Uuid, String, Uuid, String)> = sqlx::query_as(
            "SELECT s.id, s.name, s.teacher_id, t.name
             FROM subjects s
             JOIN teachers t ON t.id = s.teacher_id
             WHERE s.id = $1",
        )
        .bind(subject_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, name, teacher_id, teacher_name)| SubjectRef {
            id,
            name,
            teacher_id,
            teacher_name,
        }))
    }

    async fn list_sessions(&self, school_id: Uuid) -> Result<Vec<SessionRef>, DatabaseError> {
        let sessions: Vec<(Uuid, String)> = sqlx::query_as(
            "SELECT id, name FROM sessions WHERE school_id = $1 ORDER BY starts_on, id",
        )
        .bind(school_id)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(sessions.len());
        for (id, name) in sessions {
            let terms: Vec<(Uuid, String)> = sqlx::query_as(
                "SELECT id, name FROM terms WHERE session_id = $1 ORDER BY starts_on, id",
            )
            .bind(id)
            .fetch_all(&self.pool)
            .await?;
            out.push(SessionRef {
                id,
                name,
                terms: terms
                    .into_iter()
                    .map(|(id, name)| TermRef { id, name })
                    .collect(),
            });
        }
        Ok(out)
    }
}
