// Pure validation rules for grading schemes and score submissions. No state,
// no I/O; every rule violation found in one pass is reported together.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use super::error::{ValidationError, Violation};
use crate::database::models::{Component, ComponentScore, GradingScheme};

/// A score submission as parsed at the API boundary. Scores are the
/// weight-adjusted marks the teacher enters per component; the total is the
/// raw sum of them, never re-scaled by the declared weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub component_scores: Vec<ComponentScore>,
}

/// A submission that passed validation against a scheme, with its total.
#[derive(Debug, Clone)]
pub struct ValidatedSubmission {
    pub component_scores: Vec<ComponentScore>,
    pub total_score: f64,
}

/// Schema-shape rules for a component list: non-empty, unique non-empty
/// names, weights within 0..=100 summing to exactly 100.
pub fn validate_component_shape(
    components: &[Component],
    max_components: usize,
) -> Result<(), ValidationError> {
    let mut violations = Vec::new();

    if components.is_empty() {
        violations.push(Violation::EmptyComponents);
        return Err(ValidationError::new(violations));
    }

    if components.len() > max_components {
        violations.push(Violation::TooManyComponents {
            count: components.len(),
            limit: max_components,
        });
    }

    let mut seen = BTreeSet::new();
    let mut weight_sum: i32 = 0;
    for component in components {
        let name = component.name.trim();
        if name.is_empty() {
            violations.push(Violation::EmptyComponentName);
        } else if !seen.insert(name.to_string()) {
            violations.push(Violation::DuplicateComponent(name.to_string()));
        }

        if !(0..=100).contains(&component.weight) {
            violations.push(Violation::WeightOutOfRange {
                name: component.name.clone(),
                weight: component.weight,
            });
        }
        weight_sum += component.weight;
    }

    // Integer weights keep this check exact; 99 and 101 both fail.
    if weight_sum != 100 {
        violations.push(Violation::WeightSumMismatch(weight_sum));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(violations))
    }
}

/// Validates a submission against a scheme: the submitted component-name set
/// must exactly equal the scheme's (no missing, no unknown, no duplicates)
/// and every score must be a finite number in 0..=100. Rejection is
/// wholesale; a submission is never partially accepted.
pub fn validate_submission(
    scheme: &GradingScheme,
    submission: &ScoreSubmission,
) -> Result<ValidatedSubmission, ValidationError> {
    let mut violations = Vec::new();

    let scheme_names: BTreeSet<&str> =
        scheme.components().iter().map(|c| c.name.as_str()).collect();

    let mut submitted: HashMap<&str, f64> = HashMap::with_capacity(submission.component_scores.len());
    for entry in &submission.component_scores {
        if submitted.insert(entry.name.as_str(), entry.score).is_some() {
            violations.push(Violation::DuplicateScoreEntry(entry.name.clone()));
        }
        if !scheme_names.contains(entry.name.as_str()) {
            violations.push(Violation::UnknownComponent(entry.name.clone()));
        }
    }

    for name in &scheme_names {
        if !submitted.contains_key(*name) {
            violations.push(Violation::MissingComponent((*name).to_string()));
        }
    }

    for entry in &submission.component_scores {
        if !entry.score.is_finite() {
            violations.push(Violation::NonFiniteScore(entry.name.clone()));
        } else if !(0.0..=100.0).contains(&entry.score) {
            violations.push(Violation::ScoreOutOfRange {
                name: entry.name.clone(),
                score: entry.score,
            });
        }
    }

    if !violations.is_empty() {
        return Err(ValidationError::new(violations));
    }

    // Total is the plain sum of submitted scores. Declared weights bound what
    // a component SHOULD contribute but are not multiplied in here.
    let total_score = submission.component_scores.iter().map(|e| e.score).sum();

    Ok(ValidatedSubmission {
        component_scores: submission.component_scores.clone(),
        total_score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sqlx::types::Json;
    use uuid::Uuid;

    fn components(spec: &[(&str, i32)]) -> Vec<Component> {
        spec.iter()
            .map(|(name, weight)| Component {
                name: name.to_string(),
                weight: *weight,
            })
            .collect()
    }

    fn scheme(spec: &[(&str, i32)]) -> GradingScheme {
        let now = Utc::now();
        GradingScheme {
            id: Uuid::new_v4(),
            school_id: Uuid::new_v4(),
            class_id: Uuid::new_v4(),
            subject_id: Uuid::new_v4(),
            teacher_id: Uuid::new_v4(),
            components: Json(components(spec)),
            created_at: now,
            updated_at: now,
        }
    }

    fn submission(spec: &[(&str, f64)]) -> ScoreSubmission {
        ScoreSubmission {
            component_scores: spec
                .iter()
                .map(|(name, score)| ComponentScore {
                    name: name.to_string(),
                    score: *score,
                })
                .collect(),
        }
    }

    #[test]
    fn accepts_weights_summing_to_exactly_100() {
        assert!(validate_component_shape(&components(&[("CA", 30), ("Exam", 70)]), 20).is_ok());
    }

    #[test]
    fn rejects_weight_sum_of_99_and_101() {
        for sum in [("CA", 30, "Exam", 69), ("CA", 30, "Exam", 71)] {
            let err = validate_component_shape(
                &components(&[(sum.0, sum.1), (sum.2, sum.3)]),
                20,
            )
            .unwrap_err();
            assert!(err
                .violations
                .iter()
                .any(|v| matches!(v, Violation::WeightSumMismatch(_))));
        }
    }

    #[test]
    fn rejects_empty_component_list() {
        let err = validate_component_shape(&[], 20).unwrap_err();
        assert_eq!(err.violations, vec![Violation::EmptyComponents]);
    }

    #[test]
    fn rejects_duplicate_and_empty_names() {
        let err = validate_component_shape(
            &components(&[("CA", 30), ("CA", 30), ("  ", 40)]),
            20,
        )
        .unwrap_err();
        assert!(err
            .violations
            .contains(&Violation::DuplicateComponent("CA".to_string())));
        assert!(err.violations.contains(&Violation::EmptyComponentName));
    }

    #[test]
    fn rejects_out_of_range_weight() {
        let err =
            validate_component_shape(&components(&[("CA", -5), ("Exam", 105)]), 20).unwrap_err();
        let out_of_range = err
            .violations
            .iter()
            .filter(|v| matches!(v, Violation::WeightOutOfRange { .. }))
            .count();
        assert_eq!(out_of_range, 2);
    }

    #[test]
    fn rejects_component_count_over_limit() {
        let many = components(&[("A", 25), ("B", 25), ("C", 25), ("D", 25)]);
        let err = validate_component_shape(&many, 3).unwrap_err();
        assert!(err
            .violations
            .iter()
            .any(|v| matches!(v, Violation::TooManyComponents { count: 4, limit: 3 })));
    }

    #[test]
    fn submission_total_is_raw_sum_of_scores() {
        let scheme = scheme(&[("CA", 30), ("Exam", 70)]);
        let validated =
            validate_submission(&scheme, &submission(&[("CA", 25.0), ("Exam", 65.0)])).unwrap();
        assert_eq!(validated.total_score, 90.0);
    }

    #[test]
    fn submission_score_may_exceed_component_weight() {
        // Weights are a shares invariant on the scheme, not a per-component
        // cap on submitted scores.
        let scheme = scheme(&[("CA", 30), ("Exam", 70)]);
        let validated =
            validate_submission(&scheme, &submission(&[("CA", 100.0), ("Exam", 0.0)])).unwrap();
        assert_eq!(validated.total_score, 100.0);
    }

    #[test]
    fn rejects_renamed_component_wholesale() {
        let scheme = scheme(&[("CA", 30), ("Exam", 70)]);
        let err =
            validate_submission(&scheme, &submission(&[("CA1", 25.0), ("Exam", 65.0)]))
                .unwrap_err();
        assert!(err
            .violations
            .contains(&Violation::UnknownComponent("CA1".to_string())));
        assert!(err
            .violations
            .contains(&Violation::MissingComponent("CA".to_string())));
    }

    #[test]
    fn rejects_omitted_component() {
        let scheme = scheme(&[("CA", 30), ("Exam", 70)]);
        let err = validate_submission(&scheme, &submission(&[("Exam", 65.0)])).unwrap_err();
        assert_eq!(
            err.violations,
            vec![Violation::MissingComponent("CA".to_string())]
        );
    }

    #[test]
    fn rejects_duplicate_submission_entry() {
        let scheme = scheme(&[("CA", 30), ("Exam", 70)]);
        let err = validate_submission(
            &scheme,
            &submission(&[("CA", 10.0), ("CA", 20.0), ("Exam", 65.0)]),
        )
        .unwrap_err();
        assert!(err
            .violations
            .contains(&Violation::DuplicateScoreEntry("CA".to_string())));
    }

    #[test]
    fn rejects_out_of_range_and_non_finite_scores() {
        let scheme = scheme(&[("CA", 30), ("Exam", 70)]);
        let err = validate_submission(
            &scheme,
            &submission(&[("CA", 101.0), ("Exam", f64::NAN)]),
        )
        .unwrap_err();
        assert!(err
            .violations
            .iter()
            .any(|v| matches!(v, Violation::ScoreOutOfRange { .. })));
        assert!(err
            .violations
            .contains(&Violation::NonFiniteScore("Exam".to_string())));
    }

    #[test]
    fn boundary_scores_are_accepted() {
        let scheme = scheme(&[("CA", 30), ("Exam", 70)]);
        let validated =
            validate_submission(&scheme, &submission(&[("CA", 0.0), ("Exam", 100.0)])).unwrap();
        assert_eq!(validated.total_score, 100.0);
    }
}
