use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bmp_reduce::{
    encode, identity_palette, sobel, BmpRef, Geometry, EDGE_PIXELS, PIXEL_DATA_OFFSET,
};
use tinycam::assets::{AssetLoader, ConfigSource};
use tinycam::client::StreamClient;
use tinycam::models::{
    AppConfig, Credentials, TransformConfig, TransformKind, TransformOverrides,
};
use tinycam::rendering::encode_grayscale_png;
use tinycam::server;

#[derive(Parser)]
#[command(name = "tinycam")]
#[command(about = "Tinycam - grayscale frame server with on-device gesture classification")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the frame server
    Serve,
    /// Reduce a 96x96 BMP to 32x32 (training data generation)
    Reduce {
        /// Input 96x96 8-bit BMP
        #[arg(short, long)]
        input: PathBuf,

        /// Output 32x32 BMP
        #[arg(short, long)]
        output: PathBuf,

        /// Transform to apply (defaults to the configured pipeline transform)
        #[arg(short, long, value_enum)]
        transform: Option<TransformArg>,

        /// Binarization threshold (-1 disables it for nearest-threshold).
        /// Overrides the configured value
        #[arg(long, allow_hyphen_values = true)]
        threshold: Option<i32>,

        /// Swap black and white when binarizing
        #[arg(long)]
        invert: bool,

        /// Number of gray levels for quantize
        #[arg(long)]
        depth: Option<i32>,

        /// Also write the Sobel edge map of the output to this BMP
        #[arg(long)]
        edges: Option<PathBuf>,

        /// Also write a PNG preview of the output
        #[arg(long)]
        png: Option<PathBuf>,
    },
    /// Connect to a running server and print predictions
    Watch {
        /// Server address
        #[arg(short, long, default_value = "127.0.0.1:9999")]
        addr: String,

        /// Username (defaults to configured credentials)
        #[arg(short, long)]
        user: Option<String>,

        /// Password (defaults to configured credentials)
        #[arg(short, long)]
        password: Option<String>,

        /// Directory to save received frames in
        #[arg(long)]
        save_dir: Option<PathBuf>,

        /// Stop after this many frames
        #[arg(long)]
        frames: Option<u64>,
    },
    /// Extract the embedded config.yaml for customization
    Init {
        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,

        /// List embedded assets without extracting
        #[arg(long)]
        list: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TransformArg {
    NearestCopy,
    NearestThreshold,
    AverageThreshold,
    Quantize,
}

impl From<TransformArg> for TransformKind {
    fn from(arg: TransformArg) -> Self {
        match arg {
            TransformArg::NearestCopy => TransformKind::NearestCopy,
            TransformArg::NearestThreshold => TransformKind::NearestThreshold,
            TransformArg::AverageThreshold => TransformKind::AverageThreshold,
            TransformArg::Quantize => TransformKind::Quantize,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve) => run_server().await,
        Some(Commands::Reduce {
            input,
            output,
            transform,
            threshold,
            invert,
            depth,
            edges,
            png,
        }) => {
            init_cli_logging();
            let overrides = TransformOverrides {
                kind: transform.map(Into::into),
                threshold,
                invert,
                depth,
            };
            let transform = resolve_transform(&overrides)?;
            run_reduce_command(&input, &output, transform, edges.as_deref(), png.as_deref())
        }
        Some(Commands::Watch {
            addr,
            user,
            password,
            save_dir,
            frames,
        }) => {
            init_cli_logging();
            run_watch_command(&addr, user, password, save_dir.as_deref(), frames).await
        }
        Some(Commands::Init { force, list }) => run_init_command(force, list),
        None => {
            run_status_command();
            Ok(())
        }
    }
}

/// Minimal logging for one-shot commands
fn init_cli_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tinycam=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();
}

/// Configured pipeline transform with the `reduce` flags laid over it. An
/// explicit `--transform` does not need a loadable config.
fn resolve_transform(overrides: &TransformOverrides) -> anyhow::Result<TransformConfig> {
    let base = match overrides.kind {
        Some(_) => TransformConfig::default(),
        None => {
            AppConfig::load_from_assets(&AssetLoader::from_env())?
                .pipeline
                .transform
        }
    };
    Ok(base.with_overrides(overrides)?)
}

/// Run one transform over a file (no server needed)
fn run_reduce_command(
    input: &Path,
    output: &Path,
    transform: TransformConfig,
    edges: Option<&Path>,
    png: Option<&Path>,
) -> anyhow::Result<()> {
    let transform = transform.to_transform()?;
    let source = std::fs::read(input)?;
    let reduced = transform.apply(&source)?;
    std::fs::write(output, reduced)?;
    println!(
        "Reduced {} with {transform} -> {}",
        input.display(),
        output.display()
    );

    if let Some(path) = edges {
        let mut edge_map = [0u8; EDGE_PIXELS];
        sobel(&reduced, PIXEL_DATA_OFFSET, &mut edge_map)?;
        std::fs::write(path, encode(Geometry::TARGET, &identity_palette(), &edge_map)?)?;
        println!("Edges -> {}", path.display());
    }

    if let Some(path) = png {
        let view = BmpRef::parse(&reduced, Geometry::TARGET)?;
        let png_bytes = encode_grayscale_png(&view)?;
        std::fs::write(path, &png_bytes)?;
        println!("Preview {} ({} bytes)", path.display(), png_bytes.len());
    }

    Ok(())
}

async fn run_watch_command(
    addr: &str,
    user: Option<String>,
    password: Option<String>,
    save_dir: Option<&Path>,
    frames: Option<u64>,
) -> anyhow::Result<()> {
    let credentials = match (user, password) {
        (Some(user), Some(password)) => Credentials::new(user, password),
        (user, password) => {
            let configured = AppConfig::load_from_assets(&AssetLoader::from_env())?.credentials;
            Credentials::new(
                user.unwrap_or(configured.username),
                password.unwrap_or(configured.password),
            )
        }
    };

    if let Some(dir) = save_dir {
        std::fs::create_dir_all(dir)?;
    }

    let mut client = StreamClient::connect(addr, &credentials).await?;
    let mut count = 0u64;
    while frames.map_or(true, |max| count < max) {
        let Some(frame) = client.next_frame().await? else {
            println!("Server closed the connection after {count} frames");
            break;
        };
        count += 1;
        println!("frame {count}: {}", frame.label);

        if let Some(dir) = save_dir {
            let path = dir.join(format!("frame_{count:05}.bmp"));
            std::fs::write(&path, &frame.bmp)?;
        }
    }
    Ok(())
}

fn run_init_command(force: bool, list: bool) -> anyhow::Result<()> {
    if list {
        println!("Embedded assets:\n");
        for f in AssetLoader::list_embedded() {
            println!("  {f}");
        }
        return Ok(());
    }

    let report = AssetLoader::from_env().init(force)?;

    for f in &report.written {
        println!("  + {f}");
    }
    if !report.skipped.is_empty() {
        println!("Skipped existing files (use --force to overwrite):");
        for f in &report.skipped {
            println!("  - {f}");
        }
    }
    Ok(())
}

/// Display status and configuration information
fn run_status_command() {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    let bind_addr = std::env::var("BIND_ADDR").ok();
    let config_file = std::env::var("CONFIG_FILE").ok();

    println!("Tinycam v{VERSION}");
    println!("Grayscale frame server with gesture classification\n");

    println!("Environment Variables:");
    println!(
        "  BIND_ADDR   = {}",
        bind_addr.as_deref().unwrap_or("(not set, using config)")
    );
    println!(
        "  CONFIG_FILE = {}",
        config_file.as_deref().unwrap_or("(not set)")
    );

    let loader = AssetLoader::from_env();
    let source = match loader.config_source() {
        ConfigSource::Embedded => "embedded".to_string(),
        ConfigSource::File(path) => path.display().to_string(),
        ConfigSource::Missing(_) => "embedded (file not found)".to_string(),
    };
    println!("\nConfig:  {source}");

    match AppConfig::load_from_assets(&loader) {
        Ok(config) => {
            println!("  Listen:    {}", config.server.bind_addr);
            println!("  Model:     {}", config.model.path.display());
            println!("  Transform: {:?}", config.pipeline.transform);
        }
        Err(e) => println!("  Invalid: {e}"),
    }

    println!("\nCommands:");
    println!("  tinycam serve    Start the frame server");
    println!("  tinycam reduce   Reduce a BMP offline");
    println!("  tinycam watch    Receive frames from a server");
    println!("  tinycam init     Extract embedded config");
    println!("\nRun 'tinycam --help' for more details.");
}

/// Run the frame server
async fn run_server() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tinycam=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let loader = AssetLoader::from_env();
    tracing::info!(config = ?loader.config_source(), "Config source");

    if let Err(e) = loader.seed_if_configured() {
        tracing::warn!(%e, "Failed to seed config");
    }

    let mut config = AppConfig::load_from_assets(&loader)?;
    if let Ok(addr) = std::env::var("BIND_ADDR") {
        config.server.bind_addr = addr;
    }

    let frame_server = server::create_server(&config)?;

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
    tracing::info!(addr = %config.server.bind_addr, "Tinycam server listening");

    frame_server.serve(listener).await?;

    Ok(())
}
