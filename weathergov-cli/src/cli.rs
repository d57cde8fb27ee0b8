use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use inquire::Text;

use weathergov_core::{
    ClientConfig, Config, Coordinate, Forecast, Observation, ResponseEnvelope, WeatherGovClient,
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weathergov", version, about = "Weather from api.weather.gov")]
pub struct Cli {
    /// Print the raw JSON payload instead of a summary.
    #[arg(long, global = true)]
    pub json: bool,

    /// Identification string sent as User-Agent (overrides config).
    #[arg(long, global = true)]
    pub user_agent: Option<String>,

    /// Service base URL (overrides config).
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Where to look: explicit coordinates or a saved location name.
#[derive(Debug, Args)]
pub struct Place {
    /// Latitude in decimal degrees.
    #[arg(allow_negative_numbers = true, requires = "longitude", required_unless_present = "location")]
    pub latitude: Option<f64>,

    /// Longitude in decimal degrees.
    #[arg(allow_negative_numbers = true)]
    pub longitude: Option<f64>,

    /// Name of a location saved with `weathergov locations add`.
    #[arg(long, short, conflicts_with = "latitude")]
    pub location: Option<String>,
}

impl Place {
    fn resolve(&self, config: &Config) -> anyhow::Result<(f64, f64)> {
        match (&self.location, self.latitude, self.longitude) {
            (Some(name), _, _) => {
                let coordinate = config.location(name)?;
                Ok((coordinate.latitude(), coordinate.longitude()))
            }
            (None, Some(latitude), Some(longitude)) => Ok((latitude, longitude)),
            _ => anyhow::bail!("Give either <LATITUDE> <LONGITUDE> or --location <NAME>."),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the grid cell and forecast office for a point.
    Points(Place),

    /// List the observation stations nearest to a point.
    Stations(Place),

    /// Show the latest observation from the nearest station.
    Current(Place),

    /// Show the forecast for a point.
    Forecast {
        #[command(flatten)]
        place: Place,

        /// Use the hour-by-hour forecast.
        #[arg(long)]
        hourly: bool,

        /// Number of periods to show.
        #[arg(long, default_value_t = 6)]
        periods: usize,
    },

    /// Interactively set the User-Agent and base URL.
    Configure,

    /// Manage saved locations.
    Locations {
        #[command(subcommand)]
        action: LocationsCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum LocationsCommand {
    /// Save a named location.
    Add {
        name: String,
        #[arg(allow_negative_numbers = true)]
        latitude: f64,
        #[arg(allow_negative_numbers = true)]
        longitude: f64,
    },

    /// Forget a saved location.
    Remove { name: String },

    /// List saved locations.
    List,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let Cli {
            json,
            user_agent,
            base_url,
            command,
        } = self;

        let mut config = Config::load()?;

        let mut client_config = config.client_config();
        if let Some(agent) = user_agent {
            client_config = client_config.with_user_agent(agent);
        }
        if let Some(url) = base_url {
            client_config = client_config.with_base_url(url);
        }
        tracing::debug!(
            base_url = client_config.base_url(),
            user_agent = client_config.user_agent(),
            "client configuration resolved"
        );

        match command {
            Command::Points(place) => {
                let (lat, lon) = place.resolve(&config)?;
                let response = client(client_config)?.points(lat, lon).await?;
                output(json, &response, render::points)?;
            }
            Command::Stations(place) => {
                let (lat, lon) = place.resolve(&config)?;
                let response = client(client_config)?
                    .observation_stations(lat, lon)
                    .await?;
                output(json, &response, render::stations)?;
            }
            Command::Current(place) => {
                let (lat, lon) = place.resolve(&config)?;
                let response = client(client_config)?.current_weather(lat, lon).await?;
                output(json, &response, |response| {
                    Ok(render::observation(&Observation::from_envelope(response)?))
                })?;
            }
            Command::Forecast {
                place,
                hourly,
                periods,
            } => {
                let (lat, lon) = place.resolve(&config)?;
                let client = client(client_config)?;
                let response = if hourly {
                    client.forecast_hourly(lat, lon).await?
                } else {
                    client.forecast(lat, lon).await?
                };
                output(json, &response, |response| {
                    Ok(render::forecast(&Forecast::from_envelope(response)?, periods))
                })?;
            }
            Command::Configure => configure(&mut config)?,
            Command::Locations { action } => manage_locations(&mut config, action)?,
        }

        Ok(())
    }
}

fn client(config: ClientConfig) -> anyhow::Result<WeatherGovClient> {
    WeatherGovClient::new(config).context("Failed to build weather.gov client")
}

fn output<F>(json: bool, response: &ResponseEnvelope, summary: F) -> anyhow::Result<()>
where
    F: FnOnce(&ResponseEnvelope) -> Result<String, weathergov_core::WeatherGovError>,
{
    let text = if json {
        serde_json::to_string_pretty(response.data()?)?
    } else {
        summary(response)?
    };
    println!("{text}");
    Ok(())
}

fn configure(config: &mut Config) -> anyhow::Result<()> {
    let current = config.client_config();

    let agent = Text::new("User-Agent to identify yourself to weather.gov:")
        .with_default(current.user_agent())
        .with_help_message("weather.gov asks for an app name and contact, e.g. `my-app (me@example.com)`")
        .prompt()?;

    let url = Text::new("Service base URL:")
        .with_default(current.base_url())
        .prompt()?;

    config.user_agent = Some(agent);
    config.base_url = Some(url);
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn manage_locations(config: &mut Config, action: LocationsCommand) -> anyhow::Result<()> {
    match action {
        LocationsCommand::Add {
            name,
            latitude,
            longitude,
        } => {
            let coordinate = Coordinate::new(latitude, longitude)?;
            if let Some(previous) = config.upsert_location(&name, coordinate) {
                println!("Replacing {name} ({previous}) with {coordinate}");
            } else {
                println!("Saved {name} at {coordinate}");
            }
            config.save()?;
        }
        LocationsCommand::Remove { name } => {
            if config.remove_location(&name).is_none() {
                anyhow::bail!("No location named '{name}' configured.");
            }
            config.save()?;
            println!("Removed {name}");
        }
        LocationsCommand::List => {
            if config.locations.is_empty() {
                println!("No saved locations.");
            }
            for (name, coordinate) in &config.locations {
                println!("{name}\t{coordinate}");
            }
        }
    }
    Ok(())
}
