use axum::extract::{Extension, Path};
use serde::Deserialize;
use uuid::Uuid;

use super::require_teacher;
use crate::database::models::{ComponentScore, ScoreRecord};
use crate::grading::{ScoreService, ScoreSubmission};
use crate::middleware::{ApiResponse, ApiResult, SchoolContext};

use crate::grading::scores::ClassScoreEntry;

#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub scheme_id: Uuid,
    pub student_id: Uuid,
    pub class_id: Uuid,
    pub component_scores: Vec<ComponentScore>,
}

/// POST /api/grading/scores - Record a student's scores for a scheme
pub async fn post(
    Extension(ctx): Extension<SchoolContext>,
    axum::Json(payload): axum::Json<ScoreRequest>,
) -> ApiResult<ScoreRecord> {
    require_teacher(&ctx)?;

    let submission = ScoreSubmission {
        component_scores: payload.component_scores,
    };
    let service = ScoreService::new().await?;
    let record = service
        .create_score(
            ctx.school_id,
            payload.scheme_id,
            payload.student_id,
            payload.class_id,
            &submission,
        )
        .await?;

    Ok(ApiResponse::created(record))
}

/// PUT /api/grading/scores - Overwrite an existing score record
pub async fn put(
    Extension(ctx): Extension<SchoolContext>,
    axum::Json(payload): axum::Json<ScoreRequest>,
) -> ApiResult<ScoreRecord> {
    require_teacher(&ctx)?;

    let submission = ScoreSubmission {
        component_scores: payload.component_scores,
    };
    let service = ScoreService::new().await?;
    let record = service
        .update_score(
            ctx.school_id,
            payload.scheme_id,
            payload.student_id,
            payload.class_id,
            &submission,
        )
        .await?;

    Ok(ApiResponse::success(record))
}

/// GET /api/grading/scores/:scheme_id - Score sheet for the scheme's class
pub async fn get_class_sheet(
    Path(scheme_id): Path<Uuid>,
    Extension(ctx): Extension<SchoolContext>,
) -> ApiResult<Vec<ClassScoreEntry>> {
    let service = ScoreService::new().await?;
    let entries = service
        .scores_for_class(ctx.school_id, scheme_id, ctx.session_id, ctx.term_id)
        .await?;

    Ok(ApiResponse::success(entries))
}
