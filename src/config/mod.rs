pub mod env;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;

#[cfg(feature = "cli")]
mod cli {
    use crate::adapters::render::OutputFormat;
    use crate::config::toml_config::TomlConfig;
    use crate::domain::model::{CenterCount, Coordinates, LocationMode, SearchRequest};
    use crate::domain::specialty::SpecialtySelection;
    use crate::utils::error::Result;
    use crate::utils::validation::{validate_coordinates, validate_path, Validate};
    use clap::Parser;

    #[derive(Debug, Clone, Default, Parser)]
    #[command(name = "diag-finder")]
    #[command(about = "Find diagnostic centers with CT machines and nearby specialists")]
    pub struct CliConfig {
        /// City, town or pin code to search in
        #[arg(long)]
        pub city: Option<String>,

        /// Search around the current location instead of a city
        #[arg(long, conflicts_with = "city")]
        pub near_me: bool,

        /// Latitude of the current location
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        pub lat: Option<f64>,

        /// Longitude of the current location
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        pub lon: Option<f64>,

        /// Number of centers (e.g. 5, 10) or "all"
        #[arg(long)]
        pub count: Option<CenterCount>,

        /// Specialty to look for near each center (repeatable)
        #[arg(short, long = "specialty", value_delimiter = ',')]
        pub specialties: Vec<String>,

        /// Print the specialty catalog and exit
        #[arg(long)]
        pub list_specialties: bool,

        /// Output format: text, json or csv
        #[arg(long)]
        pub format: Option<OutputFormat>,

        /// Directory to also write the rendered result into
        #[arg(long)]
        pub output: Option<String>,

        /// Path to TOML configuration file
        #[arg(short, long)]
        pub config: Option<String>,

        #[arg(short, long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Emit logs as JSON")]
        pub log_json: bool,
    }

    impl CliConfig {
        pub fn fixed_location(&self) -> Option<Coordinates> {
            Some(Coordinates::new(self.lat?, self.lon?))
        }

        pub fn resolve_count(&self, file: Option<&TomlConfig>) -> Result<CenterCount> {
            if let Some(count) = self.count {
                return Ok(count);
            }
            match file {
                Some(config) => Ok(config.default_count()?.unwrap_or_default()),
                None => Ok(CenterCount::default()),
            }
        }

        pub fn resolve_specialties(&self, file: Option<&TomlConfig>) -> Result<SpecialtySelection> {
            if !self.specialties.is_empty() {
                return SpecialtySelection::from_labels(&self.specialties);
            }
            match file {
                Some(config) => Ok(config.default_specialties()?.unwrap_or_default()),
                None => Ok(SpecialtySelection::default()),
            }
        }

        pub fn resolve_format(&self, file: Option<&TomlConfig>) -> Result<OutputFormat> {
            if let Some(format) = self.format {
                return Ok(format);
            }
            match file {
                Some(config) => Ok(config.output_format()?.unwrap_or_default()),
                None => Ok(OutputFormat::default()),
            }
        }

        pub fn resolve_output_path(&self, file: Option<&TomlConfig>) -> Option<String> {
            self.output
                .clone()
                .or_else(|| file.and_then(|c| c.output_path().map(str::to_string)))
        }

        /// 城市優先；--near-me 需要啟動時已取得位置，否則交給協調器回報驗證錯誤
        pub fn build_request(
            &self,
            file: Option<&TomlConfig>,
            session_location: Option<Coordinates>,
        ) -> Result<SearchRequest> {
            let location = match (&self.city, self.near_me, session_location) {
                (Some(city), _, _) => LocationMode::city(city),
                (None, true, Some(coords)) => LocationMode::NearMe(coords),
                _ => LocationMode::Unset,
            };
            let specialties = self.resolve_specialties(file)?;
            Ok(SearchRequest::new(
                location,
                self.resolve_count(file)?,
                specialties.labels(),
            ))
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            if let Some(coords) = self.fixed_location() {
                validate_coordinates(coords.latitude, coords.longitude)?;
            }
            if let Some(path) = &self.output {
                validate_path("output", path)?;
            }
            Ok(())
        }
    }

}
