//! Connectivity check for the configured Azure OpenAI deployment
//!
//! Reads the same environment as the server and sends a short text prompt.
//!
//! Usage:
//!   cargo run --bin check_azure

use anyhow::Result;
use clap::Parser;
use coin_analyzer::{
    config::Settings,
    schemas::azure::ChatMessage,
    services::AzureOpenAiService,
};

/// Verify Azure OpenAI credentials and deployment
#[derive(Parser, Debug)]
#[command(name = "check_azure")]
#[command(about = "Send a short prompt to the configured Azure OpenAI deployment")]
struct Args {
    /// Prompt to send
    #[arg(
        long,
        default_value = "Hello! Please respond with 'Connection successful!' if you can see this message."
    )]
    prompt: String,

    /// Maximum tokens in the reply
    #[arg(long, default_value = "50")]
    max_tokens: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::load()?;
    let azure = &settings.azure;

    println!("Endpoint:   {}", azure.endpoint().unwrap_or("(not set)"));
    println!("Deployment: {}", azure.deployment_name);
    println!("API version: {}", azure.api_version);
    println!("Credential: {}", azure.credential_kind());

    let service = AzureOpenAiService::new(azure)?;
    println!("Calling {}", service.api_url());

    let reply = service
        .chat(vec![ChatMessage::user(args.prompt)], args.max_tokens)
        .await?;

    if reply.trim().is_empty() {
        anyhow::bail!("Azure OpenAI returned an empty reply");
    }

    println!("Response received: {}", reply);
    Ok(())
}
