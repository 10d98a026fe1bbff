use futures::future::try_join_all;
use serde::Serialize;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use super::error::GradingError;
use super::grade_scale::{find_band, GradeScaleService};
use crate::database::models::{GradingScheme, ScoreRecord};
use crate::database::DatabaseManager;
use crate::directory::{Directory, PgDirectory, SubjectRef};

/// Cross-student statistics for one subject, recomputed on read over the
/// records of students who have been graded (ungraded students do not drag
/// the average down).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectStats {
    pub class_average: f64,
    pub lowest_score: f64,
    pub highest_score: f64,
    pub graded_count: usize,
}

/// A scheme component with the student's achieved score beside the declared
/// weight. The score is null when the record predates a scheme change and no
/// longer carries this component name.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentResult {
    pub name: String,
    pub weight: i32,
    pub score: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct OwnSubjectScore {
    pub subject_id: Uuid,
    pub subject_name: Option<String>,
    pub teacher_id: Uuid,
    pub teacher_name: Option<String>,
    pub record_id: Uuid,
    pub components: Vec<ComponentResult>,
    pub total_score: f64,
    pub class_average: Option<f64>,
    pub letter_grade: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OwnScoresReport {
    pub school_id: Uuid,
    pub class_id: Uuid,
    pub student_id: Uuid,
    pub subjects: Vec<OwnSubjectScore>,
}

/// One cell of the class result grid: a student's standing in one subject,
/// null-filled when nothing has been recorded.
#[derive(Debug, Serialize)]
pub struct ClassSubjectCell {
    pub subject_id: Uuid,
    pub subject_name: Option<String>,
    pub teacher_id: Uuid,
    pub teacher_name: Option<String>,
    pub record_id: Option<Uuid>,
    pub total_score: Option<f64>,
    pub letter_grade: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StudentResultRow {
    pub student_id: Uuid,
    pub subjects: Vec<ClassSubjectCell>,
}

#[derive(Debug, Serialize)]
pub struct ClassResultsReport {
    pub school_id: Uuid,
    pub class_id: Uuid,
    pub session_id: Uuid,
    pub term_id: Uuid,
    pub students: Vec<StudentResultRow>,
}

#[derive(Debug, Serialize)]
pub struct TranscriptSubject {
    pub subject_id: Uuid,
    pub subject_name: Option<String>,
    pub total_score: f64,
    pub class_average: f64,
    pub lowest_score: f64,
    pub highest_score: f64,
    pub letter_grade: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TranscriptTerm {
    pub term_id: Uuid,
    pub term_name: String,
    pub class_id: Uuid,
    pub subjects: Vec<TranscriptSubject>,
}

#[derive(Debug, Serialize)]
pub struct TranscriptSession {
    pub session_id: Uuid,
    pub session_name: String,
    pub terms: Vec<TranscriptTerm>,
}

#[derive(Debug, Serialize)]
pub struct TranscriptReport {
    pub student_id: Uuid,
    pub school_id: Uuid,
    pub sessions: Vec<TranscriptSession>,
}

/// Assembles student result reports by reading across the score ledger and
/// the scheme store. Reads only; never writes.
pub struct ResultService<D = PgDirectory> {
    pool: PgPool,
    directory: D,
}

impl ResultService<PgDirectory> {
    pub async fn new() -> Result<Self, GradingError> {
        let pool = DatabaseManager::pool().await?;
        let directory = PgDirectory::new(pool.clone());
        Ok(Self { pool, directory })
    }
}

impl<D: Directory> ResultService<D> {
    pub fn with_parts(pool: PgPool, directory: D) -> Self {
        Self { pool, directory }
    }

    /// Everything one student has been scored on in a class, each subject
    /// joined to its scheme's declared weights and the class average.
    pub async fn own_scores(
        &self,
        school_id: Uuid,
        class_id: Uuid,
        student_id: Uuid,
    ) -> Result<OwnScoresReport, GradingError> {
        let records = sqlx::query_as::<_, ScoreRecord>(
            "SELECT r.* FROM score_records r
             JOIN grading_schemes g ON g.id = r.grading_scheme_id
             WHERE r.school_id = $1 AND r.class_id = $2 AND r.student_id = $3
             ORDER BY g.created_at, g.id",
        )
        .bind(school_id)
        .bind(class_id)
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        let schemes = self.schemes_by_id(school_id, class_id).await?;
        let bands = GradeScaleService::with_pool(self.pool.clone())
            .bands_for_school(school_id)
            .await?;

        // Class statistics per subject are fetched concurrently; each is an
        // independent read.
        let stats = try_join_all(records.iter().map(|record| {
            let subject_id = schemes
                .get(&record.grading_scheme_id)
                .map(|s| s.subject_id);
            async move {
                match subject_id {
                    Some(subject_id) => {
                        subject_stats_for(&self.pool, school_id, class_id, subject_id).await
                    }
                    None => Ok(None),
                }
            }
        }))
        .await?;

        let mut subjects = Vec::with_capacity(records.len());
        for (record, stat) in records.iter().zip(stats) {
            let scheme = schemes
                .get(&record.grading_scheme_id)
                .ok_or(GradingError::SchemeNotFound)?;
            let subject = self.directory.subject_ref(scheme.subject_id).await?;

            subjects.push(OwnSubjectScore {
                subject_id: scheme.subject_id,
                subject_name: subject.as_ref().map(|s| s.name.clone()),
                teacher_id: scheme.teacher_id,
                teacher_name: subject.as_ref().map(|s| s.teacher_name.clone()),
                record_id: record.id,
                components: merge_components(scheme, record),
                total_score: record.total_score,
                class_average: stat.map(|s| s.class_average),
                letter_grade: find_band(&bands, record.total_score)
                    .map(|b| b.letter_grade.clone()),
            });
        }

        Ok(OwnScoresReport {
            school_id,
            class_id,
            student_id,
            subjects,
        })
    }

    /// The full class result grid for a session/term: every enrolled student
    /// crossed with every subject that has a scheme. Absent scores appear as
    /// nulls, never as missing rows.
    pub async fn class_results(
        &self,
        school_id: Uuid,
        session_id: Uuid,
        term_id: Uuid,
        class_id: Uuid,
    ) -> Result<ClassResultsReport, GradingError> {
        let schemes = sqlx::query_as::<_, GradingScheme>(
            "SELECT * FROM grading_schemes
             WHERE school_id = $1 AND class_id = $2
             ORDER BY created_at, id",
        )
        .bind(school_id)
        .bind(class_id)
        .fetch_all(&self.pool)
        .await?;

        let enrolled = self
            .directory
            .list_enrolled(class_id, session_id, term_id)
            .await?;

        let records = sqlx::query_as::<_, ScoreRecord>(
            "SELECT * FROM score_records WHERE school_id = $1 AND class_id = $2",
        )
        .bind(school_id)
        .bind(class_id)
        .fetch_all(&self.pool)
        .await?;
        let by_key: HashMap<(Uuid, Uuid), &ScoreRecord> = records
            .iter()
            .map(|r| ((r.grading_scheme_id, r.student_id), r))
            .collect();

        let mut subject_refs: Vec<Option<SubjectRef>> = Vec::with_capacity(schemes.len());
        for scheme in &schemes {
            subject_refs.push(self.directory.subject_ref(scheme.subject_id).await?);
        }

        let bands = GradeScaleService::with_pool(self.pool.clone())
            .bands_for_school(school_id)
            .await?;

        let students = enrolled
            .into_iter()
            .map(|student_id| StudentResultRow {
                student_id,
                subjects: schemes
                    .iter()
                    .zip(&subject_refs)
                    .map(|(scheme, subject)| {
                        let record = by_key.get(&(scheme.id, student_id));
                        ClassSubjectCell {
                            subject_id: scheme.subject_id,
                            subject_name: subject.as_ref().map(|s| s.name.clone()),
                            teacher_id: scheme.teacher_id,
                            teacher_name: subject.as_ref().map(|s| s.teacher_name.clone()),
                            record_id: record.map(|r| r.id),
                            total_score: record.map(|r| r.total_score),
                            letter_grade: record.and_then(|r| {
                                find_band(&bands, r.total_score).map(|b| b.letter_grade.clone())
                            }),
                        }
                    })
                    .collect(),
            })
            .collect();

        Ok(ClassResultsReport {
            school_id,
            class_id,
            session_id,
            term_id,
            students,
        })
    }

    /// A student's record across every session and term, oldest first. Terms
    /// where the student has no score record at all produce no entry.
    pub async fn multi_term_result(
        &self,
        student_id: Uuid,
        school_id: Uuid,
    ) -> Result<TranscriptReport, GradingError> {
        let sessions = self.directory.list_sessions(school_id).await?;
        let bands = GradeScaleService::with_pool(self.pool.clone())
            .bands_for_school(school_id)
            .await?;

        let mut out_sessions = Vec::new();
        for session in sessions {
            let mut out_terms = Vec::new();
            for term in &session.terms {
                let Some(class_id) = self
                    .directory
                    .enrollment_for(student_id, session.id, term.id)
                    .await?
                else {
                    continue;
                };

                // Each record with its scheme's subject; the join keeps
                // subject attribution stable even if a scheme was renamed.
                let rows: Vec<(Uuid, f64)> = sqlx::query_as(
                    "SELECT g.subject_id, r.total_score
                     FROM score_records r
                     JOIN grading_schemes g ON g.id = r.grading_scheme_id
                     WHERE r.school_id = $1 AND r.class_id = $2 AND r.student_id = $3
                     ORDER BY g.created_at, g.id",
                )
                .bind(school_id)
                .bind(class_id)
                .bind(student_id)
                .fetch_all(&self.pool)
                .await?;
                if rows.is_empty() {
                    continue;
                }

                let mut subjects = Vec::with_capacity(rows.len());
                for (subject_id, total_score) in rows {
                    let stats =
                        subject_stats_for(&self.pool, school_id, class_id, subject_id).await?;
                    let subject = self.directory.subject_ref(subject_id).await?;
                    // A graded subject always has at least this one record.
                    let stats = stats.unwrap_or(SubjectStats {
                        class_average: total_score,
                        lowest_score: total_score,
                        highest_score: total_score,
                        graded_count: 1,
                    });
                    subjects.push(TranscriptSubject {
                        subject_id,
                        subject_name: subject.map(|s| s.name),
                        total_score,
                        class_average: stats.class_average,
                        lowest_score: stats.lowest_score,
                        highest_score: stats.highest_score,
                        letter_grade: find_band(&bands, total_score)
                            .map(|b| b.letter_grade.clone()),
                    });
                }

                out_terms.push(TranscriptTerm {
                    term_id: term.id,
                    term_name: term.name.clone(),
                    class_id,
                    subjects,
                });
            }

            if !out_terms.is_empty() {
                out_sessions.push(TranscriptSession {
                    session_id: session.id,
                    session_name: session.name,
                    terms: out_terms,
                });
            }
        }

        Ok(TranscriptReport {
            student_id,
            school_id,
            sessions: out_sessions,
        })
    }

    async fn schemes_by_id(
        &self,
        school_id: Uuid,
        class_id: Uuid,
    ) -> Result<HashMap<Uuid, GradingScheme>, GradingError> {
        let schemes = sqlx::query_as::<_, GradingScheme>(
            "SELECT * FROM grading_schemes WHERE school_id = $1 AND class_id = $2",
        )
        .bind(school_id)
        .bind(class_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(schemes.into_iter().map(|s| (s.id, s)).collect())
    }
}

/// Average/min/max of total scores over every record of one subject in one
/// class. None when nobody has been graded yet.
pub fn subject_stats(totals: &[f64]) -> Option<SubjectStats> {
    if totals.is_empty() {
        return None;
    }
    let sum: f64 = totals.iter().sum();
    let mut lowest = totals[0];
    let mut highest = totals[0];
    for &t in &totals[1..] {
        if t < lowest {
            lowest = t;
        }
        if t > highest {
            highest = t;
        }
    }
    Some(SubjectStats {
        class_average: sum / totals.len() as f64,
        lowest_score: lowest,
        highest_score: highest,
        graded_count: totals.len(),
    })
}

async fn subject_stats_for(
    pool: &PgPool,
    school_id: Uuid,
    class_id: Uuid,
    subject_id: Uuid,
) -> Result<Option<SubjectStats>, GradingError> {
    let totals: Vec<f64> = sqlx::query_scalar(
        "SELECT r.total_score
         FROM score_records r
         JOIN grading_schemes g ON g.id = r.grading_scheme_id
         WHERE g.school_id = $1 AND g.class_id = $2 AND g.subject_id = $3",
    )
    .bind(school_id)
    .bind(class_id)
    .bind(subject_id)
    .fetch_all(pool)
    .await?;
    Ok(subject_stats(&totals))
}

/// Scheme components in declaration order, each carrying the achieved score
/// from the record when the record still has that component name.
fn merge_components(scheme: &GradingScheme, record: &ScoreRecord) -> Vec<ComponentResult> {
    scheme
        .components()
        .iter()
        .map(|component| ComponentResult {
            name: component.name.clone(),
            weight: component.weight,
            score: record
                .component_scores()
                .iter()
                .find(|e| e.name == component.name)
                .map(|e| e.score),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{Component, ComponentScore};
    use chrono::Utc;
    use sqlx::types::Json;

    #[test]
    fn stats_over_three_records() {
        let stats = subject_stats(&[60.0, 70.0, 80.0]).unwrap();
        assert_eq!(stats.class_average, 70.0);
        assert_eq!(stats.lowest_score, 60.0);
        assert_eq!(stats.highest_score, 80.0);
        assert_eq!(stats.graded_count, 3);
    }

    #[test]
    fn stats_over_single_record() {
        let stats = subject_stats(&[42.5]).unwrap();
        assert_eq!(stats.class_average, 42.5);
        assert_eq!(stats.lowest_score, 42.5);
        assert_eq!(stats.highest_score, 42.5);
    }

    #[test]
    fn no_records_means_no_stats() {
        assert!(subject_stats(&[]).is_none());
    }

    #[test]
    fn merged_components_expose_weight_beside_score() {
        let now = Utc::now();
        let scheme = GradingScheme {
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
        };
        let record = ScoreRecord {
            id: Uuid::new_v4(),
            grading_scheme_id: scheme.id,
            student_id: Uuid::new_v4(),
            class_id: scheme.class_id,
            teacher_id: scheme.teacher_id,
            school_id: scheme.school_id,
            component_scores: Json(vec![
                ComponentScore {
                    name: "CA".to_string(),
                    score: 25.0,
                },
                ComponentScore {
                    name: "Exam".to_string(),
                    score: 65.0,
                },
            ]),
            total_score: 90.0,
            created_at: now,
            updated_at: now,
        };

        let merged = merge_components(&scheme, &record);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].name, "CA");
        assert_eq!(merged[0].weight, 30);
        assert_eq!(merged[0].score, Some(25.0));
        assert_eq!(merged[1].score, Some(65.0));
    }

    #[test]
    fn stale_record_component_reads_as_null() {
        let now = Utc::now();
        let scheme = GradingScheme {
            id: Uuid::new_v4(),
            school_id: Uuid::new_v4(),
            class_id: Uuid::new_v4(),
            subject_id: Uuid::new_v4(),
            teacher_id: Uuid::new_v4(),
            components: Json(vec![Component {
                name: "Project".to_string(),
                weight: 100,
            }]),
            created_at: now,
            updated_at: now,
        };
        // written before the scheme was changed to a single Project component
        let record = ScoreRecord {
            id: Uuid::new_v4(),
            grading_scheme_id: scheme.id,
            student_id: Uuid::new_v4(),
            class_id: scheme.class_id,
            teacher_id: scheme.teacher_id,
            school_id: scheme.school_id,
            component_scores: Json(vec![ComponentScore {
                name: "CA".to_string(),
                score: 25.0,
            }]),
            total_score: 25.0,
            created_at: now,
            updated_at: now,
        };

        let merged = merge_components(&scheme, &record);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "Project");
        assert_eq!(merged[0].score, None);
    }
}
