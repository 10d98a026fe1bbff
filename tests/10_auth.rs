mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

// Authentication surface: every protected route rejects missing or malformed
// tokens before any request handling happens.

#[tokio::test]
async fn root_endpoint_is_public() -> Result<()> {
    let res = common::send_json(common::router(), "GET", "/", None, None).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let payload = common::body_json(res).await?;
    assert!(payload["success"].as_bool().unwrap_or(false));
    assert_eq!(payload["data"]["name"], "Registrar API");

    Ok(())
}

#[tokio::test]
async fn protected_routes_require_a_token() -> Result<()> {
    for (method, uri) in [
        ("POST", "/api/grading/schemes"),
        ("POST", "/api/grading/score-batch"),
        (
            "GET",
            "/api/results/class/6b1e1c4e-0000-0000-0000-000000000000",
        ),
    ] {
        let res = common::send_json(common::router(), method, uri, None, Some(json!({}))).await?;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{} {}", method, uri);

        let payload = common::body_json(res).await?;
        assert_eq!(payload["code"], "UNAUTHORIZED");
    }

    Ok(())
}

#[tokio::test]
async fn malformed_bearer_token_is_rejected() -> Result<()> {
    let res = common::send_json(
        common::router(),
        "GET",
        "/api/grading/schemes?class_id=6b1e1c4e-0000-0000-0000-000000000000&subject_id=6b1e1c4e-0000-0000-0000-000000000001",
        Some("not-a-jwt"),
        None,
    )
    .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}
