//! CLI entry point for route_hazards.
//!
//! Provides subcommands for matching a route request against the obstacle
//! catalogue, listing the catalogue, and decoding Valhalla shapes.

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use route_hazards::config::{AppConfig, HazardSource};
use route_hazards::hazards::{HazardStore, JsonFileHazardStore, S3HazardStore};
use route_hazards::matcher::Matcher;
use route_hazards::output::{MatchRecord, append_records, write_response};
use route_hazards::polyline::{self, VALHALLA_PRECISION};
use route_hazards::request::RouteWithObstaclesRequest;
use route_hazards::routing;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "route_hazards")]
#[command(about = "Find obstacles on or near pedestrian routes", long_about = None)]
struct Cli {
    /// Read the obstacle catalogue from a local JSON file
    #[arg(long, global = true, conflicts_with = "s3_bucket")]
    obstacles: Option<String>,

    /// Read the obstacle catalogue from this S3 bucket
    #[arg(long, global = true)]
    s3_bucket: Option<String>,

    /// Object key of the catalogue in --s3-bucket (".gz" keys are gunzipped)
    #[arg(long, global = true, default_value = "obstacles.json", requires = "s3_bucket")]
    s3_key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Route a request and annotate every trip with its obstacles
    Route {
        /// JSON request body file ("-" for stdin)
        #[arg(value_name = "REQUEST")]
        request: String,

        /// File to write the annotated response to (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// CSV file to append one match record per trip variant to
        #[arg(short, long)]
        report: Option<String>,
    },
    /// Log every obstacle in the catalogue with summary counts
    ListObstacles,
    /// Decode an encoded polyline and print its points as JSON
    Decode {
        shape: String,

        #[arg(short, long, default_value_t = VALHALLA_PRECISION)]
        precision: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/route_hazards.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("route_hazards.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    let source = match (cli.obstacles, cli.s3_bucket) {
        (Some(path), _) => Some(HazardSource::File(path.into())),
        (None, Some(bucket)) => Some(HazardSource::S3 {
            bucket,
            key: cli.s3_key,
        }),
        (None, None) => config.hazards.clone(),
    };

    match cli.command {
        Commands::Route {
            request,
            output,
            report,
        } => {
            let hazards = hazard_store(source).await?;
            route(&config, hazards, &request, output.as_deref(), report.as_deref()).await?;
        }
        Commands::ListObstacles => {
            let hazards = hazard_store(source).await?;
            let obstacles = hazards.list().await?;

            for o in &obstacles {
                info!(
                    obstacle_id = o.id,
                    lat = o.position.lat,
                    lon = o.position.lon,
                    kind = o.kind,
                    danger_level = o.danger_level,
                    way_ids = o.way_ids.len(),
                    "Obstacle"
                );
            }

            let with_way_ids = obstacles.iter().filter(|o| o.has_way_ids()).count();
            let no_nearby_road = obstacles.iter().filter(|o| o.no_nearby_road).count();
            let with_image = obstacles
                .iter()
                .filter(|o| !o.image_s3_key.is_empty())
                .count();
            let invalid_position = obstacles
                .iter()
                .filter(|o| !o.position.is_valid())
                .count();

            info!(
                total = obstacles.len(),
                with_way_ids,
                no_nearby_road,
                with_image,
                invalid_position,
                "Obstacle catalogue summary"
            );
        }
        Commands::Decode { shape, precision } => {
            let points = polyline::decode(&shape, precision);
            debug!(points = points.len(), precision, "Shape decoded");
            println!("{}", serde_json::to_string(&points)?);
        }
    }

    Ok(())
}

/// Builds the configured hazard store.
async fn hazard_store(source: Option<HazardSource>) -> Result<Arc<dyn HazardStore>> {
    let store: Arc<dyn HazardStore> = match source {
        Some(HazardSource::File(path)) => {
            info!(path = %path.display(), "Reading obstacles from file");
            Arc::new(JsonFileHazardStore::new(path))
        }
        Some(HazardSource::S3 { bucket, key }) => {
            info!(bucket = %bucket, key = %key, "Reading obstacles from S3");
            let sdk = aws_config::load_from_env().await;
            Arc::new(S3HazardStore::new(&sdk, bucket, key))
        }
        None => bail!(
            "no obstacle catalogue configured; set OBSTACLE_CATALOGUE_PATH or OBSTACLE_BUCKET, or pass --obstacles/--s3-bucket"
        ),
    };
    Ok(store)
}

/// Runs one route-with-obstacles request from a JSON body on disk.
#[tracing::instrument(skip(config, hazards, output, report), fields(source = %request_path))]
async fn route(
    config: &AppConfig,
    hazards: Arc<dyn HazardStore>,
    request_path: &str,
    output: Option<&str>,
    report: Option<&str>,
) -> Result<()> {
    let body = if request_path == "-" {
        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut tokio::io::stdin(), &mut buf).await?;
        buf
    } else {
        tokio::fs::read(request_path)
            .await
            .with_context(|| format!("reading request body from {request_path}"))?
    };

    let provider = routing::connect(&config.provider)?;
    let matcher = Matcher::new(provider, hazards, config.matcher.clone());

    let outcome = match RouteWithObstaclesRequest::from_json(&body).and_then(|r| r.into_query()) {
        Ok(query) => matcher.match_route(query).await,
        Err(e) => Err(e),
    };

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(status = e.status().as_u16(), error = %e, "Route request failed");
            return Err(e.into());
        }
    };

    for v in &outcome.variants {
        info!(
            variant = v.index,
            obstacles = v.obstacle_ids.len(),
            trace_degraded = v.trace_degraded,
            "Trip annotated"
        );
    }

    if let Some(path) = report {
        append_records(path, &MatchRecord::from_outcome(&outcome, Utc::now()))?;
    }
    write_response(output, &outcome.response)?;

    Ok(())
}
