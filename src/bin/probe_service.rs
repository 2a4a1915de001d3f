use anyhow::{Context, Result};
use clap::Parser;
use diag_finder::core::{extractor, prompt};
use diag_finder::domain::model::{CenterCount, Coordinates, LocationMode, SearchRequest};
use diag_finder::domain::ports::{GenerationRequest, GenerationService, RetrievalTools};
use diag_finder::domain::specialty::SpecialtySelection;
use diag_finder::utils::logger;
use diag_finder::{EnvConfig, GeminiClient};

/// 直接呼叫一次模型，印出原始回應與引用，方便排查格式問題
#[derive(Parser)]
#[command(name = "probe_service")]
#[command(about = "Send one prompt to the generation service and dump the raw response")]
struct Args {
    /// City to build the standard search prompt for
    #[arg(long, default_value = "Springfield")]
    city: String,

    /// Send this text instead of the built search prompt
    #[arg(long)]
    raw_prompt: Option<String>,

    /// Only print the prompt, do not call the service
    #[arg(long)]
    dry_run: bool,

    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    lat: Option<f64>,

    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let geo_bias = args.lat.zip(args.lon).map(|(lat, lon)| Coordinates::new(lat, lon));
    let prompt_text = match &args.raw_prompt {
        Some(text) => text.clone(),
        None => {
            let location = match geo_bias {
                Some(coords) => LocationMode::NearMe(coords),
                None => LocationMode::city(&args.city),
            };
            let request = SearchRequest::new(
                location,
                CenterCount::Fixed(1),
                SpecialtySelection::default().labels(),
            );
            prompt::build_prompt(&request)
        }
    };

    println!("🧪 Prompt ({} chars):\n{}\n", prompt_text.len(), prompt_text);
    if args.dry_run {
        return Ok(());
    }

    let client = GeminiClient::from_config(&EnvConfig::from_env())
        .context("could not create the service client")?;
    let response = client
        .generate(GenerationRequest {
            prompt: prompt_text,
            tools: RetrievalTools::default(),
            geo_bias,
        })
        .await
        .context("service call failed")?;

    println!("📨 Raw response:\n{}\n", response.text);
    println!("🔗 {} citation chunks", response.citations.len());
    for source in extractor::collect_sources(&response.citations) {
        println!("  - [{:?}] {} <{}>", source.kind, source.display_title(), source.uri);
    }

    match extractor::parse_centers(&response.text) {
        Ok(centers) => println!("✅ Parsed {} centers", centers.len()),
        Err(e) => println!("❌ {}", e),
    }

    Ok(())
}
