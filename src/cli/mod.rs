pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "registrar")]
#[command(about = "Registrar CLI - administration for the school backend API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the API server")]
    Serve {
        #[arg(long, help = "Port to bind (defaults to REGISTRAR_API_PORT or 3000)")]
        port: Option<u16>,
    },

    #[command(about = "Check server health via the /health endpoint")]
    Health {
        #[arg(help = "Server base URL", default_value = "http://localhost:3000")]
        url: String,
    },

    #[command(about = "Mint a development bearer token")]
    Token {
        #[command(flatten)]
        args: commands::token::TokenArgs,
    },
}

#[derive(Debug, Clone)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Serve { port } => commands::serve::handle(port).await,
        Commands::Health { url } => commands::health::handle(url, output_format).await,
        Commands::Token { args } => commands::token::handle(args, output_format).await,
    }
}
