//! Command-line client for a running Coin Analyzer server
//!
//! Usage:
//!   cargo run --bin analyze_client -- path/to/coin.jpg
//!   cargo run --bin analyze_client -- --base-url http://localhost:9000 coin.png

use anyhow::{Context, Result};
use clap::Parser;
use coin_analyzer::schemas::coin::AnalysisResponse;
use reqwest::multipart::{Form, Part};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Check a Coin Analyzer server and optionally analyze an image
#[derive(Parser, Debug)]
#[command(name = "analyze_client")]
#[command(about = "Check a Coin Analyzer server and upload a coin image")]
struct Args {
    /// Image to analyze; without it only the health endpoints are checked
    image: Option<PathBuf>,

    /// Server base URL
    #[arg(long, default_value = "http://localhost:8000")]
    base_url: String,

    /// Content type sent with the image (guessed from the extension if omitted)
    #[arg(long)]
    content_type: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value = "120")]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let base_url = args.base_url.trim_end_matches('/').to_string();

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(args.timeout))
        .build()?;

    println!("Coin Analyzer client");
    println!("{}", "=".repeat(40));

    let root: serde_json::Value = client
        .get(format!("{}/", base_url))
        .send()
        .await
        .with_context(|| format!("Could not connect to {}. Is the server running?", base_url))?
        .error_for_status()?
        .json()
        .await?;
    println!("Root: {}", root["message"].as_str().unwrap_or("-"));

    let health = client
        .get(format!("{}/health", base_url))
        .send()
        .await?;
    if !health.status().is_success() {
        anyhow::bail!("Health check failed: {}", health.status());
    }
    let health: serde_json::Value = health.json().await?;
    println!("Health: {}", serde_json::to_string_pretty(&health)?);

    let Some(image_path) = args.image else {
        println!("\nTo analyze a coin, pass an image path:");
        println!("  analyze_client path/to/coin.jpg");
        return Ok(());
    };

    let bytes = tokio::fs::read(&image_path)
        .await
        .with_context(|| format!("Image file '{}' not found", image_path.display()))?;
    let content_type = args
        .content_type
        .unwrap_or_else(|| guess_content_type(&image_path).to_string());
    let file_name = image_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "coin".to_string());

    println!("\nUploading {} ({} bytes, {})", file_name, bytes.len(), content_type);

    let part = Part::bytes(bytes).file_name(file_name).mime_str(&content_type)?;
    let form = Form::new().part("image", part);

    let response = client
        .post(format!("{}/analyze", base_url))
        .multipart(form)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Analysis failed: {}\n{}", status, body);
    }

    let analysis: AnalysisResponse = response.json().await?;
    println!("Model used: {}", analysis.metadata.model_used);
    println!(
        "Parsing: structured={} fallback={} unknown={}/{}",
        analysis.metadata.parsing.structured,
        analysis.metadata.parsing.fallback_applied,
        analysis.metadata.parsing.unknown_fields,
        analysis.metadata.parsing.total_fields,
    );
    println!("{}", "-".repeat(40));
    println!("{}", serde_json::to_string_pretty(&analysis.coin_analysis)?);
    println!("{}", "-".repeat(40));

    Ok(())
}

fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        _ => "image/jpeg",
    }
}
