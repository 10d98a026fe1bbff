use axum::extract::{Extension, Path};
use uuid::Uuid;

use crate::error::ApiError;
use crate::grading::results::{ClassResultsReport, OwnScoresReport, TranscriptReport};
use crate::grading::ResultService;
use crate::middleware::{ApiResponse, ApiResult, SchoolContext};

/// Students may only read their own results; staff may read anyone's.
fn check_student_access(ctx: &SchoolContext, student_id: Uuid) -> Result<(), ApiError> {
    if ctx.role == "student" && ctx.user_id != student_id {
        return Err(ApiError::forbidden(
            "Students may only view their own results",
        ));
    }
    Ok(())
}

/// GET /api/results/own/:class_id/:student_id - One student's scores in a class
pub async fn own_scores(
    Path((class_id, student_id)): Path<(Uuid, Uuid)>,
    Extension(ctx): Extension<SchoolContext>,
) -> ApiResult<OwnScoresReport> {
    check_student_access(&ctx, student_id)?;

    let service = ResultService::new().await?;
    let report = service
        .own_scores(ctx.school_id, class_id, student_id)
        .await?;

    Ok(ApiResponse::success(report))
}

/// GET /api/results/class/:class_id - Result grid for the active session/term
pub async fn class_results(
    Path(class_id): Path<Uuid>,
    Extension(ctx): Extension<SchoolContext>,
) -> ApiResult<ClassResultsReport> {
    let service = ResultService::new().await?;
    let report = service
        .class_results(ctx.school_id, ctx.session_id, ctx.term_id, class_id)
        .await?;

    Ok(ApiResponse::success(report))
}

/// GET /api/results/transcript/:student_id - Multi-term result across sessions
pub async fn transcript(
    Path(student_id): Path<Uuid>,
    Extension(ctx): Extension<SchoolContext>,
) -> ApiResult<TranscriptReport> {
    check_student_access(&ctx, student_id)?;

    let service = ResultService::new().await?;
    let report = service.multi_term_result(student_id, ctx.school_id).await?;

    Ok(ApiResponse::success(report))
}
