use clap::Parser;
use diag_finder::adapters::location::{
    resolve_session_location, FixedLocation, IpGeolocator, NoLocation,
};
use diag_finder::adapters::render::{self, OutputFormat};
use diag_finder::config::toml_config::LocationSource;
use diag_finder::domain::model::Coordinates;
use diag_finder::domain::ports::{ConfigProvider, LocationProvider, RetrievalTools, Storage};
use diag_finder::domain::specialty::{ALL_SPECIALTIES, DEFAULT_SPECIALTIES};
use diag_finder::utils::error::{ErrorSeverity, FinderError};
use diag_finder::utils::{logger, validation::Validate};
use diag_finder::{CliConfig, EnvConfig, GeminiClient, LocalStorage, SearchOrchestrator, TomlConfig};

fn exit_code(error: &FinderError) -> i32 {
    match error.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn fail(error: FinderError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        error,
        error.category(),
        error.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", error.recovery_suggestion());
    eprintln!("❌ Error: {}", error.user_friendly_message());
    eprintln!("💡 {}", error.recovery_suggestion());
    std::process::exit(exit_code(&error).max(1));
}

fn print_catalog() {
    println!("Available specialties:");
    for specialty in ALL_SPECIALTIES {
        let marker = if DEFAULT_SPECIALTIES.contains(&specialty) {
            " (default)"
        } else {
            ""
        };
        println!("  - {}{}", specialty, marker);
    }
}

fn location_provider(
    cli: &CliConfig,
    file: Option<&TomlConfig>,
) -> Result<Box<dyn LocationProvider>, FinderError> {
    if let Some(coords) = cli.fixed_location() {
        return Ok(Box::new(FixedLocation(coords)));
    }
    let Some(file) = file else {
        return Ok(Box::new(NoLocation));
    };
    Ok(match file.location_source() {
        LocationSource::Ip => Box::new(IpGeolocator::new(file.location_endpoint())?),
        LocationSource::Fixed => match file.fixed_location() {
            Some(coords) => Box::new(FixedLocation(coords)),
            None => Box::new(NoLocation),
        },
        LocationSource::None => Box::new(NoLocation),
    })
}

async fn export(
    path: &str,
    format: OutputFormat,
    rendered: &str,
) -> Result<String, FinderError> {
    let storage = LocalStorage::new(path);
    let filename = format!(
        "centers_{}.{}",
        chrono::Utc::now().format("%Y%m%dT%H%M%SZ"),
        format.extension()
    );
    storage.write_file(&filename, rendered.as_bytes()).await
}

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    if cli.list_specialties {
        print_catalog();
        return;
    }

    tracing::info!("Starting diag-finder");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = cli.validate() {
        fail(e);
    }

    // 載入配置檔
    let file = match cli.config.as_deref().map(TomlConfig::from_file).transpose() {
        Ok(file) => file,
        Err(e) => fail(e),
    };
    if let Some(file) = &file {
        if let Err(e) = file.validate() {
            fail(e);
        }
    }

    let env_config = EnvConfig::from_env();
    let provider: &dyn ConfigProvider = match &file {
        Some(file) => file,
        None => &env_config,
    };

    // 沒有憑證就不啟動
    let client = match GeminiClient::from_config(provider) {
        Ok(client) => client,
        Err(e) => fail(e),
    };
    tracing::info!("🤖 Using model {}", client.model());
    let tools = RetrievalTools {
        web_search: provider.web_search(),
        maps_search: provider.maps_search(),
    };

    // 啟動時讀一次位置
    let session_location: Option<Coordinates> = match location_provider(&cli, file.as_ref()) {
        Ok(locator) => resolve_session_location(locator.as_ref()).await,
        Err(e) => {
            tracing::warn!("Location provider unavailable: {}", e);
            None
        }
    };

    let (request, format) = match cli
        .build_request(file.as_ref(), session_location)
        .and_then(|request| Ok((request, cli.resolve_format(file.as_ref())?)))
    {
        Ok(resolved) => resolved,
        Err(e) => fail(e),
    };

    let orchestrator = SearchOrchestrator::new(client)
        .with_tools(tools)
        .with_observer(Box::new(|message: &str| eprintln!("  • {}", message)));

    let specialties = request.specialties.clone();
    let result = match orchestrator.search(request).await {
        Ok(result) => result,
        Err(e) => fail(e),
    };

    let rendered = match render::render(&result, &specialties, format) {
        Ok(rendered) => rendered,
        Err(e) => fail(e),
    };
    print!("{}", rendered);

    if let Some(path) = cli.resolve_output_path(file.as_ref()) {
        match export(&path, format, &rendered).await {
            Ok(written) => {
                tracing::info!("📁 Output saved to: {}", written);
                eprintln!("📁 Output saved to: {}", written);
            }
            Err(e) => fail(e),
        }
    }
}
