use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use clap::Parser;

use pdf_ocr_merge::server::{ServerState, run_server};
use pdf_ocr_merge::{Config, Mode, logging, settings};

#[derive(Parser, Debug)]
#[command(
    name = "pdf-ocr-merge",
    version,
    about = "Rebuild page text from a PDF and heal OCR errors with the PDF's own text"
)]
struct Cli {
    /// PDF file to process
    #[arg(short = 'd', long = "data")]
    data: Option<PathBuf>,

    /// Which text to produce
    #[arg(short = 'm', long = "mode", value_enum, default_value_t = Mode::Merge)]
    mode: Mode,

    /// Anchor keyword (repeatable); replaces the configured list
    #[arg(short = 'k', long = "keyword")]
    keywords: Vec<String>,

    /// Anchor keywords as a JSON array of strings
    #[arg(long = "keywords-json")]
    keywords_json: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Print pages as a JSON object
    #[arg(long = "json")]
    json: bool,

    /// Serve the HTTP API on this address (e.g. 0.0.0.0:8000); "default" uses [server] addr
    #[arg(long = "server")]
    server: Option<String>,

    /// Enable verbose logging (-v per page, -vv every replaced line)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    if let Some(addr) = cli.server {
        let settings = settings::load_settings(cli.read_settings.as_deref().map(Path::new))?;
        let addr = if addr.trim().eq_ignore_ascii_case("default") {
            settings.server_addr.clone()
        } else {
            addr
        };
        let state = ServerState::from_settings(settings)?;
        return run_server(state, addr).await;
    }

    let data = cli
        .data
        .ok_or_else(|| anyhow!("--data is required unless --server is given"))?;
    let config = Config {
        data,
        mode: cli.mode,
        keywords: cli.keywords,
        keywords_json: cli.keywords_json,
        settings_path: cli.read_settings,
        json: cli.json,
    };
    let output = tokio::task::spawn_blocking(move || pdf_ocr_merge::run(config)).await??;
    println!("{}", output);
    Ok(())
}
