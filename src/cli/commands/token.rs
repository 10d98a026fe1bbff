use clap::Args;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{generate_jwt, Claims};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;

#[derive(Debug, Args)]
pub struct TokenArgs {
    #[arg(long, help = "Caller user id (random when omitted)")]
    pub user_id: Option<Uuid>,

    #[arg(long, help = "School id (random when omitted)")]
    pub school_id: Option<Uuid>,

    #[arg(long, help = "Active session id (random when omitted)")]
    pub session_id: Option<Uuid>,

    #[arg(long, help = "Active term id (random when omitted)")]
    pub term_id: Option<Uuid>,

    #[arg(long, default_value = "teacher", help = "Caller role")]
    pub role: String,
}

pub async fn handle(args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let claims = Claims::new(
        args.user_id.unwrap_or_else(Uuid::new_v4),
        args.school_id.unwrap_or_else(Uuid::new_v4),
        args.session_id.unwrap_or_else(Uuid::new_v4),
        args.term_id.unwrap_or_else(Uuid::new_v4),
        args.role,
    );
    let token = generate_jwt(claims)?;

    output_success(&output_format, "Token minted", Some(json!({ "token": token })))
}
