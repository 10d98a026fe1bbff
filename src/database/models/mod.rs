pub mod grade_band;
pub mod scheme;
pub mod score;

pub use grade_band::GradeBand;
pub use scheme::{Component, GradingScheme};
pub use score::{ComponentScore, ScoreRecord};
