mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

// Component-shape rules are enforced at the boundary, before any database
// access, so a bad payload fails fast with field-level detail.

fn scheme_payload(components: serde_json::Value) -> serde_json::Value {
    json!({
        "class_id": Uuid::new_v4(),
        "subject_id": Uuid::new_v4(),
        "components": components,
    })
}

#[tokio::test]
async fn weight_sum_of_99_is_rejected() -> Result<()> {
    let token = common::token_for_role("teacher")?;
    let res = common::send_json(
        common::router(),
        "POST",
        "/api/grading/schemes",
        Some(&token),
        Some(scheme_payload(json!([
            { "name": "CA", "weight": 30 },
            { "name": "Exam", "weight": 69 },
        ]))),
    )
    .await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let payload = common::body_json(res).await?;
    assert_eq!(payload["code"], "VALIDATION_ERROR");
    assert!(payload["field_errors"]["components"]
        .as_str()
        .unwrap()
        .contains("99"));

    Ok(())
}

#[tokio::test]
async fn weight_sum_of_101_is_rejected() -> Result<()> {
    let token = common::token_for_role("teacher")?;
    let res = common::send_json(
        common::router(),
        "POST",
        "/api/grading/schemes",
        Some(&token),
        Some(scheme_payload(json!([
            { "name": "CA", "weight": 31 },
            { "name": "Exam", "weight": 70 },
        ]))),
    )
    .await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let payload = common::body_json(res).await?;
    assert_eq!(payload["code"], "VALIDATION_ERROR");

    Ok(())
}

#[tokio::test]
async fn empty_component_list_is_rejected() -> Result<()> {
    let token = common::token_for_role("teacher")?;
    let res = common::send_json(
        common::router(),
        "POST",
        "/api/grading/schemes",
        Some(&token),
        Some(scheme_payload(json!([]))),
    )
    .await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn duplicate_component_names_are_rejected_on_update_too() -> Result<()> {
    let token = common::token_for_role("teacher")?;
    let res = common::send_json(
        common::router(),
        "PUT",
        &format!("/api/grading/schemes/{}", Uuid::new_v4()),
        Some(&token),
        Some(json!({
            "components": [
                { "name": "CA", "weight": 50 },
                { "name": "CA", "weight": 50 },
            ]
        })),
    )
    .await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let payload = common::body_json(res).await?;
    assert!(payload["field_errors"]["CA"]
        .as_str()
        .unwrap()
        .contains("duplicate"));

    Ok(())
}

#[tokio::test]
async fn scheme_writes_are_teacher_only() -> Result<()> {
    let token = common::token_for_role("student")?;
    let res = common::send_json(
        common::router(),
        "POST",
        "/api/grading/schemes",
        Some(&token),
        Some(scheme_payload(json!([
            { "name": "CA", "weight": 30 },
            { "name": "Exam", "weight": 70 },
        ]))),
    )
    .await?;

    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    Ok(())
}
