// ImpactMap CLI - run impact simulations against a simulation service

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use impactmap::geocoding::Geocoder;
use impactmap::renderer::animation::AnimationStep;
use impactmap::renderer::canvas::CanvasSize;
use impactmap::{
    AppConfig, ClientError, HeadlessMap, ImpactApp, InputMode, NominatimClient, SimulationClient,
    TokioScheduler, Workspace,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Asteroid impact simulation client for the continental US")]
struct Args {
    /// Simulation endpoint (overrides IMPACT_SIMULATION_URL)
    #[arg(long, global = true)]
    simulation_url: Option<String>,

    /// Geocoder base URL (overrides IMPACT_GEOCODER_URL)
    #[arg(long, global = true)]
    geocoder_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one simulation and render its outputs
    Simulate {
        /// Impact latitude
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Impact longitude
        #[arg(long, allow_hyphen_values = true)]
        lon: Option<f64>,

        /// Place name to geocode instead of --lat/--lon
        #[arg(long, conflicts_with_all = ["lat", "lon"])]
        place: Option<String>,

        /// Catalog asteroid id; switches to catalog mode
        #[arg(long)]
        neo_id: Option<String>,

        /// Diameter in meters (manual mode)
        #[arg(long)]
        diameter: Option<String>,

        /// Velocity in km/s (manual mode)
        #[arg(long)]
        velocity: Option<String>,

        /// Density in kg/m³ (defaults to 3000)
        #[arg(long)]
        density: Option<String>,

        /// Entry angle in degrees
        #[arg(long)]
        angle: Option<String>,

        /// Display name for the impactor (manual mode)
        #[arg(long)]
        name: Option<String>,

        /// Write the comparative diagram as SVG
        #[arg(long)]
        svg: Option<PathBuf>,

        /// Write the result geometry as GeoJSON (file or directory)
        #[arg(long)]
        geojson: Option<PathBuf>,

        /// Play the shockwave replay and print each frame
        #[arg(long)]
        animate: bool,

        /// Diagram width in CSS pixels
        #[arg(long, default_value_t = 640.0)]
        width: f64,

        /// Diagram height in CSS pixels
        #[arg(long, default_value_t = 420.0)]
        height: f64,

        /// Device pixel ratio for the diagram
        #[arg(long, default_value_t = 1.0)]
        dpr: f64,
    },

    /// Find a place by name
    Search { query: String },

    /// Name the place at a coordinate
    Reverse {
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        #[arg(allow_hyphen_values = true)]
        lon: f64,
    },

    /// Check that the simulation service is up
    Health,
}

struct SimulateOptions {
    lat: Option<f64>,
    lon: Option<f64>,
    place: Option<String>,
    neo_id: Option<String>,
    diameter: Option<String>,
    velocity: Option<String>,
    density: Option<String>,
    angle: Option<String>,
    name: Option<String>,
    svg: Option<PathBuf>,
    geojson: Option<PathBuf>,
    animate: bool,
    canvas: CanvasSize,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("impactmap=info")),
        )
        .init();

    if let Err(e) = run(Args::parse()).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), ClientError> {
    let mut config = AppConfig::from_env();
    if let Some(url) = args.simulation_url {
        config.simulation_url = url;
    }
    if let Some(url) = args.geocoder_url {
        config.geocoder_url = url;
    }
    debug!(?config, "configuration loaded");

    let http = config.http_client()?;
    let simulator = SimulationClient::with_client(&config.simulation_url, http.clone());
    let geocoder =
        NominatimClient::with_client(&config.geocoder_url, &config.accept_language, http);

    match args.command {
        Command::Simulate {
            lat,
            lon,
            place,
            neo_id,
            diameter,
            velocity,
            density,
            angle,
            name,
            svg,
            geojson,
            animate,
            width,
            height,
            dpr,
        } => {
            let options = SimulateOptions {
                lat,
                lon,
                place,
                neo_id,
                diameter,
                velocity,
                density,
                angle,
                name,
                svg,
                geojson,
                animate,
                canvas: CanvasSize::new(width, height, dpr),
            };
            simulate(options, simulator, geocoder).await
        }
        Command::Search { query } => {
            let place = geocoder.forward(&query).await?;
            println!("{:.4}, {:.4}  {}", place.lat, place.lon, place.label);
            Ok(())
        }
        Command::Reverse { lat, lon } => {
            let label = geocoder.lookup_reverse(lat, lon).await?;
            if label.is_empty() {
                println!("Lat: {:.4}, Lon: {:.4}", lat, lon);
            } else {
                println!("{}", label);
            }
            Ok(())
        }
        Command::Health => {
            let healthy = simulator.health().await?;
            println!("{} is {}", simulator.health_url(), if healthy { "up" } else { "down" });
            if healthy {
                Ok(())
            } else {
                Err(ClientError::Transport("simulation service is not healthy".to_string()))
            }
        }
    }
}

async fn simulate(
    options: SimulateOptions,
    simulator: SimulationClient,
    geocoder: NominatimClient,
) -> Result<(), ClientError> {
    let (scheduler, mut ticks) = TokioScheduler::new();
    let workspace = Workspace::with_canvas(HeadlessMap::new(), scheduler, options.canvas);
    let app = ImpactApp::new(workspace, simulator, geocoder);

    let mode = if options.neo_id.is_some() {
        InputMode::Catalog
    } else {
        InputMode::Manual
    };
    app.set_mode(mode);

    if let Some(query) = &options.place {
        if let Some(place) = app.search_place(query).await? {
            info!(label = %place.label, "location from search");
        }
    } else if let (Some(lat), Some(lon)) = (options.lat, options.lon) {
        let label = app.pick_location(lat, lon).await?;
        if !label.is_empty() {
            info!(%label, "location picked");
        }
    }

    app.with_workspace(|ws| {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        ws.form.manual.diameter = text(&options.diameter);
        ws.form.manual.velocity = text(&options.velocity);
        ws.form.manual.density = text(&options.density);
        ws.form.manual.angle = text(&options.angle);
        ws.form.manual.name = text(&options.name);
        ws.form.catalog.neo_id = text(&options.neo_id);
        ws.form.catalog.density = text(&options.density);
        ws.form.catalog.angle = text(&options.angle);
    });

    app.simulate().await?;

    let svg = app.with_workspace(|ws| {
        if let Some(view) = ws.rendered() {
            println!("{}", view.summary);
        }
        ws.diagram().to_svg()
    });

    if let Some(path) = &options.svg {
        tokio::fs::write(path, svg)
            .await
            .map_err(|e| ClientError::Io(format!("{}: {}", path.display(), e)))?;
        println!("Diagram written to {}", path.display());
    }

    if let Some(path) = &options.geojson {
        let written = app.download()?.save(path).await?;
        println!("GeoJSON written to {}", written.display());
    }

    if options.animate {
        while app.is_replaying() {
            let Some(handle) = ticks.recv().await else {
                break;
            };
            if let Some(AnimationStep::Advanced) = app.on_timer(handle) {
                if let Some(line) = app.with_workspace(|ws| ws.replay_status().map(str::to_string)) {
                    println!("{}", line);
                }
            }
        }
    }

    Ok(())
}
