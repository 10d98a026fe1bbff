use serde_json::json;

use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;

pub async fn handle(url: String, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let endpoint = format!("{}/health", url.trim_end_matches('/'));

    match client.get(&endpoint).send().await {
        Ok(res) => {
            let status = res.status();
            let body = res.json::<serde_json::Value>().await.unwrap_or(json!({}));
            if status.is_success() {
                output_success(
                    &output_format,
                    &format!("{} is healthy", url),
                    Some(json!({ "health": body })),
                )
            } else {
                output_error(
                    &output_format,
                    &format!("{} reported {}: {}", url, status, body),
                    Some("UNHEALTHY"),
                )
            }
        }
        Err(e) => output_error(
            &output_format,
            &format!("could not reach {}: {}", endpoint, e),
            Some("UNREACHABLE"),
        ),
    }
}
