use chrono::Utc;
use serde::Deserialize;
use sqlx::types::Json;
use sqlx::PgPool;
use std::collections::{HashSet, BTreeMap};
use uuid::Uuid;

use super::error::{BatchFailure, GradingError, ValidationError, Violation};
use super::schemes::fetch_scheme_by_id;
use super::validator::{self, ScoreSubmission, ValidatedSubmission};
use crate::config;
use crate::database::models::{ComponentScore, GradingScheme, ScoreRecord};
use crate::database::DatabaseManager;
use crate::directory::{Directory, PgDirectory};

/// Whether a batch creates fresh records or edits existing ones. A batch is
/// homogeneous: mixing the two paths is a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    Create,
    Edit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchEntry {
    pub student_id: Uuid,
    pub component_scores: Vec<ComponentScore>,
}

/// Applies multi-student score batches as one atomic unit. Every entry is
/// validated before any write; the write phase locks the target rows and
/// commits once, so a failed batch leaves the ledger completely unchanged.
pub struct BatchCoordinator<D = PgDirectory> {
    pool: PgPool,
    directory: D,
}

impl BatchCoordinator<PgDirectory> {
    pub async fn new() -> Result<Self, GradingError> {
        let pool = DatabaseManager::pool().await?;
        let directory = PgDirectory::new(pool.clone());
        Ok(Self { pool, directory })
    }
}

impl<D: Directory> BatchCoordinator<D> {
    pub fn with_parts(pool: PgPool, directory: D) -> Self {
        Self { pool, directory }
    }

    pub async fn apply_batch(
        &self,
        school_id: Uuid,
        scheme_id: Uuid,
        session_id: Uuid,
        term_id: Uuid,
        entries: Vec<BatchEntry>,
        mode: BatchMode,
    ) -> Result<Vec<ScoreRecord>, GradingError> {
        // Size limits are checked before anything touches the database.
        if entries.is_empty() {
            return Err(ValidationError::new(vec![Violation::EmptyBatch]).into());
        }
        let limit = config::config().grading.max_batch_size;
        if entries.len() > limit {
            return Err(ValidationError::new(vec![Violation::BatchTooLarge {
                count: entries.len(),
                limit,
            }])
            .into());
        }

        // Resolve the scheme once; every entry validates against this snapshot.
        let scheme = fetch_scheme_by_id(&self.pool, scheme_id).await?;
        if scheme.school_id != school_id {
            return Err(GradingError::SchemeNotFound);
        }

        let enrolled: HashSet<Uuid> = self
            .directory
            .list_enrolled(scheme.class_id, session_id, term_id)
            .await?
            .into_iter()
            .collect();

        // Phase 1: validate the whole batch, collecting every failure. The
        // caller gets the complete failure set in one round trip.
        let validated = prevalidate_entries(&scheme, &entries, &enrolled)
            .map_err(|failures| GradingError::BatchRejected { failures })?;

        // Phase 2: all writes in one transaction. Target rows are locked so
        // concurrent batches over the same students serialize.
        let mut tx = self.pool.begin().await.map_err(GradingError::from)?;

        let student_ids: Vec<Uuid> = validated.iter().map(|(id, _)| *id).collect();
        let existing: Vec<Uuid> = sqlx::query_scalar(
            "SELECT student_id FROM score_records
             WHERE grading_scheme_id = $1 AND student_id = ANY($2)
             FOR UPDATE",
        )
        .bind(scheme_id)
        .bind(&student_ids)
        .fetch_all(&mut *tx)
        .await?;
        let existing: HashSet<Uuid> = existing.into_iter().collect();

        let conflicts = homogeneity_conflicts(mode, &student_ids, &existing);
        if !conflicts.is_empty() {
            // Dropping the transaction rolls back; nothing was written.
            return Err(GradingError::BatchConflict {
                failures: conflicts,
            });
        }

        let now = Utc::now();
        let mut records = Vec::with_capacity(validated.len());
        for (student_id, submission) in validated {
            let record = match mode {
                BatchMode::Create => {
                    sqlx::query_as::<_, ScoreRecord>(
                        "INSERT INTO score_records
                             (id, grading_scheme_id, student_id, class_id, teacher_id, school_id,
                              component_scores, total_score, created_at, updated_at)
                         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
                         RETURNING *",
                    )
                    .bind(Uuid::new_v4())
                    .bind(scheme_id)
                    .bind(student_id)
                    .bind(scheme.class_id)
                    .bind(scheme.teacher_id)
                    .bind(scheme.school_id)
                    .bind(Json(submission.component_scores))
                    .bind(submission.total_score)
                    .bind(now)
                    .fetch_one(&mut *tx)
                    .await?
                }
                BatchMode::Edit => {
                    sqlx::query_as::<_, ScoreRecord>(
                        "UPDATE score_records
                         SET component_scores = $1, total_score = $2, updated_at = $3
                         WHERE grading_scheme_id = $4 AND student_id = $5
                         RETURNING *",
                    )
                    .bind(Json(submission.component_scores))
                    .bind(submission.total_score)
                    .bind(now)
                    .bind(scheme_id)
                    .bind(student_id)
                    .fetch_one(&mut *tx)
                    .await?
                }
            };
            records.push(record);
        }

        tx.commit().await.map_err(GradingError::from)?;

        tracing::info!(
            scheme_id = %scheme_id,
            count = records.len(),
            mode = ?mode,
            "committed score batch"
        );
        Ok(records)
    }
}

/// Pure batch pre-validation: duplicate students within the batch, enrollment
/// eligibility, and submission shape per entry. Returns the validated batch
/// in entry order, or EVERY failure (fail-fast is deliberately not done).
pub fn prevalidate_entries(
    scheme: &GradingScheme,
    entries: &[BatchEntry],
    enrolled: &HashSet<Uuid>,
) -> Result<Vec<(Uuid, ValidatedSubmission)>, Vec<BatchFailure>> {
    let mut failures: Vec<BatchFailure> = Vec::new();
    let mut validated = Vec::with_capacity(entries.len());

    // BTreeMap keeps duplicate detection deterministic in the error output.
    let mut seen: BTreeMap<Uuid, usize> = BTreeMap::new();
    for entry in entries {
        *seen.entry(entry.student_id).or_insert(0) += 1;
    }
    for (student_id, count) in &seen {
        if *count > 1 {
            failures.push(BatchFailure {
                student_id: *student_id,
                reason: format!("appears {} times in the batch", count),
            });
        }
    }

    for entry in entries {
        if seen[&entry.student_id] > 1 {
            continue; // already reported as a duplicate
        }

        if !enrolled.contains(&entry.student_id) {
            failures.push(BatchFailure {
                student_id: entry.student_id,
                reason: "not enrolled in the scheme's class".to_string(),
            });
            continue;
        }

        let submission = ScoreSubmission {
            component_scores: entry.component_scores.clone(),
        };
        match validator::validate_submission(scheme, &submission) {
            Ok(v) => validated.push((entry.student_id, v)),
            Err(e) => failures.push(BatchFailure {
                student_id: entry.student_id,
                reason: e.summary(),
            }),
        }
    }

    if failures.is_empty() {
        Ok(validated)
    } else {
        Err(failures)
    }
}

/// Create batches must target only absent rows, edit batches only present
/// ones. Returns the offending entries, empty when the batch is homogeneous.
pub fn homogeneity_conflicts(
    mode: BatchMode,
    student_ids: &[Uuid],
    existing: &HashSet<Uuid>,
) -> Vec<BatchFailure> {
    match mode {
        BatchMode::Create => student_ids
            .iter()
            .filter(|id| existing.contains(id))
            .map(|id| BatchFailure {
                student_id: *id,
                reason: "score record already exists; use the edit path".to_string(),
            })
            .collect(),
        BatchMode::Edit => student_ids
            .iter()
            .filter(|id| !existing.contains(id))
            .map(|id| BatchFailure {
                student_id: *id,
                reason: "no score record to edit; use the create path".to_string(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Component;
    use chrono::Utc;

    fn scheme() -> GradingScheme {
        let now = Utc::now();
        GradingScheme {
            id: Uuid::new_v4(),
            school_id: Uuid::new_v4(),
            class_id: Uuid::new_v4(),
            subject_id: Uuid::new_v4(),
            teacher_id: Uuid::new_v4(),
            components: Json(vec![
                Component {
                    name: "CA".to_string(),
                    weight: 30,
                },
                Component {
                    name: "Exam".to_string(),
                    weight: 70,
                },
            ]),
            created_at: now,
            updated_at: now,
        }
    }

    fn entry(student_id: Uuid, ca: f64, exam: f64) -> BatchEntry {
        BatchEntry {
            student_id,
            component_scores: vec![
                ComponentScore {
                    name: "CA".to_string(),
                    score: ca,
                },
                ComponentScore {
                    name: "Exam".to_string(),
                    score: exam,
                },
            ],
        }
    }

    #[test]
    fn valid_batch_passes_in_entry_order() {
        let scheme = scheme();
        let students: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let enrolled: HashSet<Uuid> = students.iter().copied().collect();
        let entries: Vec<BatchEntry> = students
            .iter()
            .map(|id| entry(*id, 20.0, 60.0))
            .collect();

        let validated = prevalidate_entries(&scheme, &entries, &enrolled).unwrap();
        assert_eq!(validated.len(), 3);
        let order: Vec<Uuid> = validated.iter().map(|(id, _)| *id).collect();
        assert_eq!(order, students);
        assert!(validated.iter().all(|(_, v)| v.total_score == 80.0));
    }

    #[test]
    fn one_bad_entry_rejects_whole_batch_and_names_only_it() {
        let scheme = scheme();
        let mut students: Vec<Uuid> = (0..6).map(|_| Uuid::new_v4()).collect();
        students.sort();
        let enrolled: HashSet<Uuid> = students.iter().copied().collect();

        let mut entries: Vec<BatchEntry> = students
            .iter()
            .take(5)
            .map(|id| entry(*id, 20.0, 60.0))
            .collect();
        // sixth entry scores an unknown component
        entries.push(BatchEntry {
            student_id: students[5],
            component_scores: vec![
                ComponentScore {
                    name: "CA".to_string(),
                    score: 20.0,
                },
                ComponentScore {
                    name: "Project".to_string(),
                    score: 60.0,
                },
            ],
        });

        let failures = prevalidate_entries(&scheme, &entries, &enrolled).unwrap_err();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].student_id, students[5]);
        assert!(failures[0].reason.contains("Project"));
    }

    #[test]
    fn unenrolled_student_is_a_batch_failure() {
        let scheme = scheme();
        let enrolled_student = Uuid::new_v4();
        let outsider = Uuid::new_v4();
        let enrolled: HashSet<Uuid> = [enrolled_student].into_iter().collect();

        let entries = vec![
            entry(enrolled_student, 10.0, 50.0),
            entry(outsider, 10.0, 50.0),
        ];

        let failures = prevalidate_entries(&scheme, &entries, &enrolled).unwrap_err();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].student_id, outsider);
        assert!(failures[0].reason.contains("not enrolled"));
    }

    #[test]
    fn duplicate_student_in_batch_is_reported_once() {
        let scheme = scheme();
        let student = Uuid::new_v4();
        let enrolled: HashSet<Uuid> = [student].into_iter().collect();

        let entries = vec![entry(student, 10.0, 50.0), entry(student, 12.0, 55.0)];

        let failures = prevalidate_entries(&scheme, &entries, &enrolled).unwrap_err();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].student_id, student);
        assert!(failures[0].reason.contains("2 times"));
    }

    #[test]
    fn create_mode_conflicts_on_existing_rows() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let existing: HashSet<Uuid> = [b].into_iter().collect();

        let conflicts = homogeneity_conflicts(BatchMode::Create, &[a, b], &existing);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].student_id, b);
    }

    #[test]
    fn edit_mode_conflicts_on_missing_rows() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let existing: HashSet<Uuid> = [b].into_iter().collect();

        let conflicts = homogeneity_conflicts(BatchMode::Edit, &[a, b], &existing);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].student_id, a);
    }

    #[test]
    fn homogeneous_batches_have_no_conflicts() {
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let all: HashSet<Uuid> = ids.iter().copied().collect();
        let none: HashSet<Uuid> = HashSet::new();

        assert!(homogeneity_conflicts(BatchMode::Create, &ids, &none).is_empty());
        assert!(homogeneity_conflicts(BatchMode::Edit, &ids, &all).is_empty());
    }
}
