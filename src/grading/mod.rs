// The grading configuration and score aggregation engine: scheme store,
// validator, score ledger, bulk coordinator, result aggregator, grade scale.
pub mod batch;
pub mod error;
pub mod grade_scale;
pub mod results;
pub mod schemes;
pub mod scores;
pub mod validator;

pub use batch::{BatchCoordinator, BatchEntry, BatchMode};
pub use error::{BatchFailure, GradingError, ValidationError, Violation};
pub use grade_scale::GradeScaleService;
pub use results::ResultService;
pub use schemes::SchemeService;
pub use scores::ScoreService;
pub use validator::{ScoreSubmission, ValidatedSubmission};
