//! Waypoint - entry point.

use std::path::PathBuf;

use anyhow::Context;
use tracing::info;

use waypoint_config::ConfigLoader;
use waypoint_server::Server;

/// Command-line arguments.
struct Args {
    /// Path to configuration file.
    config: Option<PathBuf>,
    /// Start from development defaults.
    development: bool,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut config = None;
        let mut development = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    config = args.next().map(PathBuf::from);
                }
                "--dev" => development = true,
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("waypoint {}", waypoint_server::VERSION);
                    std::process::exit(0);
                }
                other => {
                    eprintln!("Unknown argument: {other}");
                    eprintln!("Use --help for usage information");
                    std::process::exit(1);
                }
            }
        }

        Self {
            config,
            development,
        }
    }
}

fn print_help() {
    println!(
        r"Waypoint - request policy pipeline server

USAGE:
    waypoint [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to configuration file (TOML or JSON)
        --dev              Start from development defaults (pretty logs, debug level)
    -h, --help             Print help information
    -v, --version          Print version information

ENVIRONMENT VARIABLES:
    WAYPOINT__SERVER__HTTP_ADDR           Bind address (default: 0.0.0.0:3000)
    WAYPOINT__POLICY__RATE_LIMIT          Requests allowed per caller (default: 10)
    WAYPOINT__POLICY__MAINTENANCE_MODE    Start in maintenance mode (default: false)
    WAYPOINT__POLICY__BLOCKED_COUNTRIES   Comma-separated country codes (default: CN,KP)
    WAYPOINT__TELEMETRY__LOGGING__LEVEL   Log level (default: info)
    MAINTENANCE_MODE                      Set to 'true' to start in maintenance mode

CONTROL API:
    GET  /_waypoint/health | routes | state | logs | logs/export | metrics
    POST /_waypoint/simulate | preset/<anonymous|user|admin> | reset
    PUT  /_waypoint/maintenance
    DELETE /_waypoint/logs
"
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new().with_dotenv()?;
    loader = if args.development {
        loader.with_development()
    } else {
        loader.with_defaults()
    };
    if let Some(path) = &args.config {
        loader = loader
            .with_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?;
    }
    let config = loader
        .with_env_prefix("WAYPOINT")
        .with_legacy_env()
        .load()
        .context("invalid configuration")?;

    waypoint_telemetry::init_telemetry(&config.telemetry_config())
        .context("failed to initialize telemetry")?;

    info!(
        version = waypoint_server::VERSION,
        addr = %config.server.http_addr,
        rate_limit = config.policy.rate_limit,
        maintenance = config.policy.maintenance_mode,
        "Starting Waypoint"
    );

    Server::new(config).run().await?;
    Ok(())
}
