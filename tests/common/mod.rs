use anyhow::Result;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use tower::ServiceExt;
use uuid::Uuid;

use registrar_api::app::app;
use registrar_api::auth::{generate_jwt, Claims};

pub fn router() -> Router {
    app()
}

/// Mint a bearer token the way the identity service would, using the
/// development JWT secret from the default config.
pub fn token_for_role(role: &str) -> Result<String> {
    let claims = Claims::new(
        Uuid::new_v4(),
        Uuid::new_v4(),
        Uuid::new_v4(),
        Uuid::new_v4(),
        role.to_string(),
    );
    Ok(generate_jwt(claims)?)
}

/// Drive one request through the router without binding a socket.
pub async fn send_json(
    router: Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Result<Response> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }

    let request = match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&value)?))?,
        None => builder.body(Body::empty())?,
    };

    Ok(router.oneshot(request).await?)
}

pub async fn body_json(response: Response) -> Result<serde_json::Value> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
