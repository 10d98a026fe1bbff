use axum::extract::Extension;
use serde::Deserialize;
use uuid::Uuid;

use super::require_teacher;
use crate::config;
use crate::database::models::ScoreRecord;
use crate::grading::{
    BatchCoordinator, BatchEntry, BatchMode, GradingError, ValidationError, Violation,
};
use crate::middleware::{ApiResponse, ApiResult, SchoolContext};

#[derive(Debug, Deserialize)]
pub struct ScoreBatchRequest {
    pub scheme_id: Uuid,
    pub entries: Vec<BatchEntry>,
}

/// POST /api/grading/score-batch - Atomically create scores for many students
pub async fn post(
    Extension(ctx): Extension<SchoolContext>,
    axum::Json(payload): axum::Json<ScoreBatchRequest>,
) -> ApiResult<Vec<ScoreRecord>> {
    apply(ctx, payload, BatchMode::Create).await
}

/// PATCH /api/grading/score-batch - Atomically edit scores for many students
pub async fn patch(
    Extension(ctx): Extension<SchoolContext>,
    axum::Json(payload): axum::Json<ScoreBatchRequest>,
) -> ApiResult<Vec<ScoreRecord>> {
    apply(ctx, payload, BatchMode::Edit).await
}

async fn apply(
    ctx: SchoolContext,
    payload: ScoreBatchRequest,
    mode: BatchMode,
) -> ApiResult<Vec<ScoreRecord>> {
    require_teacher(&ctx)?;

    // Size limits are boundary checks; they run before any connection is
    // acquired (the coordinator re-checks them).
    check_batch_size(payload.entries.len())?;

    let coordinator = BatchCoordinator::new().await?;
    let records = coordinator
        .apply_batch(
            ctx.school_id,
            payload.scheme_id,
            ctx.session_id,
            ctx.term_id,
            payload.entries,
            mode,
        )
        .await?;

    match mode {
        BatchMode::Create => Ok(ApiResponse::created(records)),
        BatchMode::Edit => Ok(ApiResponse::success(records)),
    }
}

fn check_batch_size(count: usize) -> Result<(), GradingError> {
    if count == 0 {
        return Err(ValidationError::new(vec![Violation::EmptyBatch]).into());
    }
    let limit = config::config().grading.max_batch_size;
    if count > limit {
        return Err(ValidationError::new(vec![Violation::BatchTooLarge { count, limit }]).into());
    }
    Ok(())
}
