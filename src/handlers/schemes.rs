use axum::extract::{Extension, Path, Query};
use serde::Deserialize;
use uuid::Uuid;

use super::require_teacher;
use crate::config;
use crate::database::models::{Component, GradingScheme};
use crate::grading::{validator, SchemeService};
use crate::middleware::{ApiResponse, ApiResult, SchoolContext};

#[derive(Debug, Deserialize)]
pub struct CreateSchemeRequest {
    pub class_id: Uuid,
    pub subject_id: Uuid,
    pub components: Vec<Component>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSchemeRequest {
    pub components: Vec<Component>,
}

#[derive(Debug, Deserialize)]
pub struct SchemeLookupQuery {
    pub class_id: Uuid,
    pub subject_id: Uuid,
    /// Defaults to the caller when absent
    pub teacher_id: Option<Uuid>,
}

/// POST /api/grading/schemes - Define a grading scheme for a class/subject
pub async fn post(
    Extension(ctx): Extension<SchoolContext>,
    axum::Json(payload): axum::Json<CreateSchemeRequest>,
) -> ApiResult<GradingScheme> {
    require_teacher(&ctx)?;

    // Shape rules run at the boundary, before any connection is acquired
    validator::validate_component_shape(
        &payload.components,
        config::config().grading.max_components_per_scheme,
    )
    .map_err(crate::grading::GradingError::from)?;

    let service = SchemeService::new().await?;
    let scheme = service
        .create_scheme(
            ctx.school_id,
            payload.class_id,
            payload.subject_id,
            ctx.user_id,
            payload.components,
        )
        .await?;

    Ok(ApiResponse::created(scheme))
}

/// PUT /api/grading/schemes/:id - Replace a scheme's component list
pub async fn put(
    Path(scheme_id): Path<Uuid>,
    Extension(ctx): Extension<SchoolContext>,
    axum::Json(payload): axum::Json<UpdateSchemeRequest>,
) -> ApiResult<GradingScheme> {
    require_teacher(&ctx)?;

    validator::validate_component_shape(
        &payload.components,
        config::config().grading.max_components_per_scheme,
    )
    .map_err(crate::grading::GradingError::from)?;

    let service = SchemeService::new().await?;
    let scheme = service
        .update_scheme(scheme_id, ctx.school_id, ctx.user_id, payload.components)
        .await?;

    Ok(ApiResponse::success(scheme))
}

/// GET /api/grading/schemes - Look up the scheme for a (class, subject, teacher)
pub async fn get(
    Query(query): Query<SchemeLookupQuery>,
    Extension(ctx): Extension<SchoolContext>,
) -> ApiResult<GradingScheme> {
    let service = SchemeService::new().await?;
    let scheme = service
        .get_scheme(
            ctx.school_id,
            query.class_id,
            query.subject_id,
            query.teacher_id.unwrap_or(ctx.user_id),
        )
        .await?;

    Ok(ApiResponse::success(scheme))
}

/// GET /api/grading/schemes/class/:class_id - All schemes defined for a class
pub async fn list_for_class(
    Path(class_id): Path<Uuid>,
    Extension(ctx): Extension<SchoolContext>,
) -> ApiResult<Vec<GradingScheme>> {
    let service = SchemeService::new().await?;
    let schemes = service
        .list_schemes_for_class(ctx.school_id, class_id)
        .await?;

    Ok(ApiResponse::success(schemes))
}

/// DELETE /api/grading/schemes/:id - Remove a scheme with no dependent scores
pub async fn delete(
    Path(scheme_id): Path<Uuid>,
    Extension(ctx): Extension<SchoolContext>,
) -> ApiResult<serde_json::Value> {
    require_teacher(&ctx)?;

    let service = SchemeService::new().await?;
    service
        .delete_scheme(scheme_id, ctx.school_id, ctx.user_id)
        .await?;

    Ok(ApiResponse::success(serde_json::json!({ "deleted": scheme_id })))
}
