use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use clap::Parser;
use loop_course::{config::Config, live_planner, models::CourseRequest};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Plan a closed-loop walking course from the command line"
)]
struct Args {
    /// Free-text start location (e.g. "Gamla stan, Stockholm")
    #[arg(long)]
    location: String,

    /// Target course length in kilometers
    #[arg(long)]
    distance: f64,

    /// Seed for the course heading, for reproducible courses
    #[arg(long)]
    seed: Option<u64>,

    /// Write the course as a GPX file
    #[arg(long)]
    gpx: Option<PathBuf>,

    /// Print the full course as JSON instead of the directions list
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;
    let planner = live_planner(&config)?;

    let request = CourseRequest {
        location: args.location,
        distance: args.distance,
        seed: args.seed,
    };
    let course = planner.plan(&request).await?;

    if let Some(path) = &args.gpx {
        let bytes = BASE64.decode(&course.gpx_base64)?;
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(&bytes)?;
        tracing::info!("course written to {:?}", path);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&course)?);
        return Ok(());
    }

    println!(
        "{}: {:.2} km (target {:.1} km), {} waypoints",
        course.location,
        course.route_distance,
        course.distance,
        course.waypoints.len()
    );
    if course.dropped_waypoints > 0 {
        println!(
            "note: {} waypoint(s) had no road nearby and were skipped",
            course.dropped_waypoints
        );
    }
    for (idx, direction) in course.directions.iter().enumerate() {
        println!("{:>3}. {}", idx + 1, direction);
    }

    Ok(())
}
