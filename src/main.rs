use std::path::Path;

use anyhow::{Context, Result};
use clap::{Arg, Command, value_parser};
use log::info;

use tablemap::calibration::{CalibrationStore, CalibrationUse, HttpCalibrationSource};
use tablemap::config::Config;
use tablemap::convert::DisplaySurface;
use tablemap::display;
use tablemap::feed::{FeedState, HttpMarkerSource, MarkerFeed};
use tablemap::geo;
use tablemap::logging;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let matches = Command::new("tablemap")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Projects tracked tabletop markers onto a schematic or geographic map")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("JSON config file"),
        )
        .arg(
            Arg::new("calibration-url")
                .long("calibration-url")
                .value_name("URL")
                .help("Map-config endpoint"),
        )
        .arg(
            Arg::new("markers-url")
                .long("markers-url")
                .value_name("URL")
                .help("Marker-positions endpoint"),
        )
        .arg(
            Arg::new("interval-ms")
                .long("interval-ms")
                .value_name("MS")
                .help("Poll interval in milliseconds")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("width")
                .long("width")
                .value_name("PX")
                .help("Schematic surface width in pixels")
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("mode")
                .long("mode")
                .value_name("MODE")
                .help("Target surface")
                .default_value("schematic")
                .value_parser(["schematic", "geo"]),
        )
        .get_matches();

    let mut config = Config::load_with_env(matches.get_one::<String>("config").map(Path::new))?;

    if let Some(url) = matches.get_one::<String>("calibration-url") {
        config.calibration_url = url.clone();
    }
    if let Some(url) = matches.get_one::<String>("markers-url") {
        config.markers_url = url.clone();
    }
    if let Some(ms) = matches.get_one::<u64>("interval-ms") {
        config.poll_interval_ms = *ms;
    }
    if let Some(width) = matches.get_one::<f64>("width") {
        config.display_width = *width;
    }
    let geographic = matches.get_one::<String>("mode").map(String::as_str) == Some("geo");

    run(config, geographic).await
}

async fn run(config: Config, geographic: bool) -> Result<()> {
    let usage = if geographic {
        CalibrationUse::Geographic
    } else {
        CalibrationUse::Dimensions
    };
    let calibration_source = HttpCalibrationSource::with_timeout(&config.calibration_url, config.request_timeout())
        .context("Failed to create HTTP client")?;
    let store = CalibrationStore::new(calibration_source, usage);
    let calibration = store.get().await;

    let surface = match config.display_height {
        Some(height) => DisplaySurface::new(config.display_width, height),
        None => DisplaySurface::for_calibration(&calibration, config.display_width),
    };
    info!(
        "Board {}x{} cm (version {}), surface {}x{} px",
        calibration.width, calibration.height, calibration.version, surface.width, surface.height
    );
    if geographic {
        let center = geo::bounds_center(&calibration.bounds_or_fallback());
        info!("Map center: {:.6}, {:.6}", center.lat, center.lng);
    }

    let marker_source = HttpMarkerSource::with_timeout(&config.markers_url, config.request_timeout())
        .context("Failed to create HTTP client")?;
    let feed = MarkerFeed::new(marker_source, config.poll_interval());

    let policy = config.out_of_bounds;
    let handle = feed.start(move |state: &FeedState| {
        if state.loading {
            return;
        }
        if let Some(err) = &state.error {
            eprintln!("Warning: {} (showing last known positions)", err);
        }
        let rendered = if geographic {
            serde_json::to_string(&display::geo_entities(&state.markers, &calibration, policy))
        } else {
            serde_json::to_string(&display::schematic_entities(&state.markers, &calibration, surface, policy))
        };
        match rendered {
            Ok(json) => println!("{}", json),
            Err(err) => eprintln!("Failed to serialize entities: {}", err),
        }
    });

    println!("Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    feed.stop(handle);
    Ok(())
}
