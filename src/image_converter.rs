use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use reqwest::Client;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use xls_loadtest_lib::image_converter_lib::{
    convert_image_file, ConvertOptions, DEFAULT_HEIGHT_SCALE,
};
use xls_loadtest_lib::SpreadsheetConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Image to paint into the spreadsheet
    image: PathBuf,

    /// Width of the painted image in cells
    #[arg(default_value_t = 26)]
    max_width: u32,

    /// Spreadsheet row to start painting at
    #[arg(default_value_t = 0)]
    row_start: i64,

    /// Spreadsheet API endpoint
    #[arg(long, env("SPREADSHEET_URL"), default_value = "https://xls.fly.dev/api/spreadsheet")]
    url: String,

    /// Factor applied to the resized height to make up for tall cells
    #[arg(long, default_value_t = DEFAULT_HEIGHT_SCALE)]
    height_scale: f64,
}

impl SpreadsheetConfig for Args {
    fn spreadsheet_url(&self) -> &str {
        &self.url
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if present
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // One client for the whole upload so connections are reused
    let client = Client::builder().build().context("Failed to build HTTP client")?;

    let options = ConvertOptions {
        max_width: args.max_width,
        row_start: args.row_start,
        height_scale: args.height_scale,
    };

    let report = convert_image_file(&client, &args, &args.image, &options)
        .await
        .with_context(|| format!("Failed to convert {}", args.image.display()))?;

    println!("Sent {} cells", report.cells_sent);
    if report.failed > 0 {
        println!("Failed to send {} cells", report.failed);
    }

    Ok(())
}
