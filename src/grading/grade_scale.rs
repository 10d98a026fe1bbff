use sqlx::PgPool;
use uuid::Uuid;

use super::error::GradingError;
use crate::database::models::GradeBand;
use crate::database::DatabaseManager;

/// Maps numeric totals to a school's letter grades. Band ranges are
/// inclusive on both ends; when bands overlap, the earliest-inserted band
/// wins (bands_for_school returns them in insertion order).
pub struct GradeScaleService {
    pool: PgPool,
}

impl GradeScaleService {
    pub async fn new() -> Result<Self, GradingError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self { pool })
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn bands_for_school(&self, school_id: Uuid) -> Result<Vec<GradeBand>, GradingError> {
        let bands = sqlx::query_as::<_, GradeBand>(
            "SELECT * FROM grade_bands WHERE school_id = $1 ORDER BY created_at, id",
        )
        .bind(school_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(bands)
    }

    pub async fn resolve_letter_grade(
        &self,
        school_id: Uuid,
        score: f64,
    ) -> Result<Option<String>, GradingError> {
        let bands = self.bands_for_school(school_id).await?;
        Ok(find_band(&bands, score).map(|b| b.letter_grade.clone()))
    }
}

/// First band whose inclusive range contains the score, in the order given.
pub fn find_band(bands: &[GradeBand], score: f64) -> Option<&GradeBand> {
    bands.iter().find(|b| b.contains(score))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn band(letter: &str, min: f64, max: f64) -> GradeBand {
        GradeBand {
            id: Uuid::new_v4(),
            school_id: Uuid::new_v4(),
            letter_grade: letter.to_string(),
            min_score: min,
            max_score: max,
            created_at: Utc::now(),
        }
    }

    fn standard_bands() -> Vec<GradeBand> {
        vec![band("A", 80.0, 100.0), band("B", 60.0, 79.0), band("C", 0.0, 59.0)]
    }

    #[test]
    fn resolves_within_band() {
        let bands = standard_bands();
        assert_eq!(find_band(&bands, 90.0).unwrap().letter_grade, "A");
        assert_eq!(find_band(&bands, 65.0).unwrap().letter_grade, "B");
        assert_eq!(find_band(&bands, 10.0).unwrap().letter_grade, "C");
    }

    #[test]
    fn band_edges_are_inclusive() {
        let bands = standard_bands();
        assert_eq!(find_band(&bands, 79.0).unwrap().letter_grade, "B");
        assert_eq!(find_band(&bands, 80.0).unwrap().letter_grade, "A");
        assert_eq!(find_band(&bands, 100.0).unwrap().letter_grade, "A");
        assert_eq!(find_band(&bands, 0.0).unwrap().letter_grade, "C");
    }

    #[test]
    fn score_outside_every_band_resolves_to_none() {
        let bands = vec![band("A", 80.0, 100.0)];
        assert!(find_band(&bands, 50.0).is_none());
    }

    #[test]
    fn overlapping_bands_resolve_to_first_inserted() {
        let bands = vec![band("Pass", 50.0, 100.0), band("Merit", 75.0, 100.0)];
        assert_eq!(find_band(&bands, 85.0).unwrap().letter_grade, "Pass");
    }
}
