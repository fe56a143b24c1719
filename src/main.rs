use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use qr_tracker::logging::init_logging;
use qr_tracker::{
    format_time_ago, render_or_blank, CachedGeolocation, DownloadSink, FixedPosition,
    FixedTokenDecoder, ObjectRegistry, PrintSheet, RawPosition, ScanFrame, ScanWorkflow,
    SvgQrRenderer, TrackedObject, TrackerConfig,
};

/// Token the demo scan resolves to when no --scan is given
const DEMO_TOKEN: &str = "QR_NOTEBOOK_001";

#[derive(Parser, Debug)]
#[command(name = "qr-tracker", version, about = "Track objects by scanning their QR codes")]
struct Cli {
    /// TOML config file
    #[arg(long, env = "QR_TRACKER_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Seed demo objects, register more, run scans, print the histories
    Demo {
        /// Register an extra object (repeatable)
        #[arg(long = "name")]
        names: Vec<String>,

        /// Scan this identity token (repeatable, run in order)
        #[arg(long = "scan")]
        scans: Vec<String>,

        /// Latitude reported by the simulated geolocation
        #[arg(long, default_value_t = -23.5505, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude reported by the simulated geolocation
        #[arg(long, default_value_t = -46.6333, allow_hyphen_values = true)]
        lon: f64,

        /// Print the registry as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Render TEXT as a QR code data URI
    Render {
        text: String,

        /// Save the image and a printable sheet into this directory
        #[arg(long)]
        out: Option<PathBuf>,

        /// Label printed on the sheet (defaults to TEXT)
        #[arg(long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = TrackerConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Command::Demo {
            names,
            scans,
            lat,
            lon,
            json,
        } => run_demo(&config, names, scans, RawPosition::new(lat, lon), json).await,
        Command::Render { text, out, name } => run_render(&config, &text, out, name),
    }
}

async fn run_demo(
    config: &TrackerConfig,
    names: Vec<String>,
    scans: Vec<String>,
    position: RawPosition,
    json: bool,
) -> Result<()> {
    let registry = ObjectRegistry::new();
    let seeded = registry.seed_demo_objects(Utc::now());
    tracing::info!("Seeded {} demo objects", seeded.len());

    for name in &names {
        match registry.register(name) {
            Ok(object) => println!("✓ Registered {} → {}", object.name(), object.identity_token()),
            Err(e) => eprintln!("❌ Could not register {:?}: {}", name, e),
        }
    }

    let scans = if scans.is_empty() {
        vec![DEMO_TOKEN.to_string()]
    } else {
        scans
    };

    let provider = CachedGeolocation::new(FixedPosition(position));
    for token in scans {
        let workflow = ScanWorkflow::new(
            registry.clone(),
            FixedTokenDecoder::new(token.clone()),
            &provider,
        )
        .with_options(config.geolocation);

        match workflow.trigger(ScanFrame::empty()).await {
            Ok(report) => println!(
                "📍 {} located at {}",
                report.object.name(),
                report.sample.address().unwrap_or("unknown")
            ),
            Err(e) => eprintln!("❌ Scan of {} failed: {}", token, e),
        }
    }

    if json {
        let out = serde_json::to_string_pretty(&registry.list())
            .context("Failed to serialize registry")?;
        println!("{}", out);
        return Ok(());
    }

    println!("\n📦 Tracked objects ({})", registry.count());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for object in registry.list() {
        print_object(&object);
    }

    Ok(())
}

fn print_object(object: &TrackedObject) {
    let now = Utc::now();
    println!("\n{}  [{}]", object.name(), object.identity_token());

    match object.last_location() {
        Some(last) => println!(
            "   Last seen: {} ({})",
            last.address().unwrap_or("unknown"),
            format_time_ago(last.timestamp(), now)
        ),
        None => println!("   Not located yet - waiting for a scan"),
    }

    for sample in object.location_history().iter() {
        println!(
            "   • {}  {:.4}, {:.4}  {}",
            sample.timestamp().format("%Y-%m-%d %H:%M:%S"),
            sample.latitude(),
            sample.longitude(),
            sample.address().unwrap_or("")
        );
    }
}

fn run_render(
    config: &TrackerConfig,
    text: &str,
    out: Option<PathBuf>,
    name: Option<String>,
) -> Result<()> {
    let (image, err) = render_or_blank(&SvgQrRenderer, text, &config.render);
    if let Some(err) = err {
        return Err(err).context("Failed to render QR code");
    }

    match out {
        Some(dir) => {
            let label = name.as_deref().unwrap_or(text);
            let sink = DownloadSink::new(dir);
            let image_path = sink.save_image(label, &image)?;
            let sheet = PrintSheet {
                name: label,
                token: text,
                image: &image,
            };
            let sheet_path = sink.save_print_sheet(&sheet)?;
            println!("✓ Image: {}", image_path.display());
            println!("✓ Print sheet: {}", sheet_path.display());
        }
        None => println!("{}", image.data_uri),
    }

    Ok(())
}
