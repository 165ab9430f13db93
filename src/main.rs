// src/main.rs
mod utils;
mod extractors;
mod storage;

use std::path::PathBuf;

use clap::Parser;
use utils::AppError;
use extractors::lines::split_document;
use extractors::pricing::DEFAULT_PRICING_WINDOW;
use extractors::{EquipmentOverrides, ExtractorConfig, QuoteExtractor};
use storage::StorageManager;

/// Command Line Interface for the service quote extractor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Plain-text rendering of the quote document
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory for the extracted draft
    #[arg(short, long, default_value = "./output")]
    output_dir: String,

    /// Debug mode - save an annotated line dump showing the located blocks
    #[arg(short, long)]
    debug: bool,

    /// Overwrite existing output files
    #[arg(short, long)]
    force: bool,

    /// Lines kept after the pricing heading when no terminator follows (default: 25)
    #[arg(long)]
    pricing_window: Option<usize>,

    /// Multi-catch trap count, replacing the document's equipment table
    #[arg(long)]
    multi_catch: Option<u32>,

    /// Rodent bait station count, replacing the document's equipment table
    #[arg(long)]
    bait_stations: Option<u32>,

    /// Insect light trap count, replacing the document's equipment table
    #[arg(long)]
    ilt: Option<u32>,

    /// Print the draft JSON to stdout as well
    #[arg(long)]
    print: bool,
}

/// Resolves the pricing window from the CLI, then `PRICING_WINDOW`, then the default.
fn resolve_pricing_window(arg: Option<usize>) -> Result<usize, AppError> {
    if let Some(window) = arg {
        tracing::debug!("Using pricing window {} from command-line argument", window);
        return Ok(window);
    }

    match std::env::var("PRICING_WINDOW") {
        Ok(raw) => {
            let window = raw
                .trim()
                .parse::<usize>()
                .map_err(|e| AppError::Config(format!("Invalid PRICING_WINDOW '{}': {}", raw, e)))?;
            tracing::debug!("Using pricing window {} from PRICING_WINDOW", window);
            Ok(window)
        }
        Err(_) => {
            tracing::debug!("Using default pricing window {}", DEFAULT_PRICING_WINDOW);
            Ok(DEFAULT_PRICING_WINDOW)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Parse CLI Arguments
    let args = Args::parse();

    // 2. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging(args.debug);
    tracing::info!("Starting processing for args: {:?}", args);

    // 3. Resolve configuration
    let pricing_window = resolve_pricing_window(args.pricing_window)?;
    if pricing_window == 0 {
        return Err(AppError::Config("Pricing window must be at least 1 line".to_string()));
    }
    let config = ExtractorConfig {
        pricing_window,
        equipment_overrides: EquipmentOverrides {
            multi_catch: args.multi_catch,
            bait_stations: args.bait_stations,
            insect_light_traps: args.ilt,
        },
    };

    // 4. Initialize storage and extractor
    let storage = StorageManager::new(&args.output_dir, args.force)?;
    let extractor = QuoteExtractor::new(config);

    // 5. Load the document
    let text = StorageManager::load_document(&args.input).await?;
    let stem = args
        .input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| AppError::Config(format!("Input path has no file name: {}", args.input.display())))?;

    // 6. Extract
    let draft = extractor.extract(&text)?;
    if draft.pricing.is_empty() {
        tracing::warn!("No pricing values found in {}", args.input.display());
    }

    if args.debug {
        let lines = split_document(&text);
        let blocks = extractor.locate_blocks(&lines);
        let dump_path = storage.base_dir().join(format!("{}_blocks.txt", stem));
        if let Err(e) = utils::block_debug::save_block_dump(&lines, &blocks, &dump_path) {
            tracing::warn!("Failed to create block dump: {}", e);
        }
    }

    // 7. Save results
    let draft_path = storage.save_draft(&draft, &stem)?;
    tracing::info!("Saved draft to: {}", draft_path.display());
    let meta_path = storage.save_draft_metadata(&draft, &stem, &args.input)?;
    tracing::info!("Saved draft metadata to: {}", meta_path.display());

    if args.print {
        let json = serde_json::to_string_pretty(&draft)
            .map_err(|e| AppError::Processing(format!("Failed to render draft: {}", e)))?;
        println!("{}", json);
    }

    tracing::info!(
        "Processing finished. Services: {}, covered pests: {}",
        draft.services.len(),
        draft.covered_pests.len()
    );

    Ok(())
}
