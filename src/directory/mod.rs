// Read-only view of the school system outside the grading engine: classes,
// subjects, teachers, enrollment, sessions and terms. The engine consumes
// these through the Directory port and never writes them.
pub mod pg;

use async_trait::async_trait;
use uuid::Uuid;

use crate::database::DatabaseError;

pub use pg::PgDirectory;

/// Subject identity used to annotate result reports.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SubjectRef {
    pub id: Uuid,
    pub name: String,
    pub teacher_id: Uuid,
    pub teacher_name: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct TermRef {
    pub id: Uuid,
    pub name: String,
}

/// An academic session and its terms, in chronological order.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionRef {
    pub id: Uuid,
    pub name: String,
    pub terms: Vec<TermRef>,
}

#[async_trait]
pub trait Directory: Send + Sync {
    async fn class_exists(&self, school_id: Uuid, class_id: Uuid) -> Result<bool, DatabaseError>;

    async fn subject_belongs_to(
        &self,
        subject_id: Uuid,
        class_id: Uuid,
        teacher_id: Uuid,
        school_id: Uuid,
    ) -> Result<bool, DatabaseError>;

    async fn subject_is_approved(&self, subject_id: Uuid) -> Result<bool, DatabaseError>;

    async fn is_approved_teacher(
        &self,
        teacher_id: Uuid,
        school_id: Uuid,
    ) -> Result<bool, DatabaseError>;

    async fn is_enrolled(&self, student_id: Uuid, class_id: Uuid) -> Result<bool, DatabaseError>;

    async fn list_enrolled(
        &self,
        class_id: Uuid,
        session_id: Uuid,
        term_id: Uuid,
    ) -> Result<Vec<Uuid>, DatabaseError>;

    /// The class a student was enrolled in for a given session/term, if any.
    async fn enrollment_for(
        &self,
        student_id: Uuid,
        session_id: Uuid,
        term_id: Uuid,
    ) -> Result<Option<Uuid>, DatabaseError>;

    async fn subject_ref(&self, subject_id: Uuid) -> Result<Option<SubjectRef>, DatabaseError>;

    /// All sessions of a school with their terms, oldest first.
    async fn list_sessions(&self, school_id: Uuid) -> Result<Vec<SessionRef>, DatabaseError>;
}
