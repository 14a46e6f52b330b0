use clap::{Parser, Subcommand};
use satisfactory_serve_map::config::{self, Overrides, ServerConfig};
use satisfactory_serve_map::naming::SatisfactoryNaming;
use satisfactory_serve_map::render::IndexLinks;
use satisfactory_serve_map::resolve::resolve;
use satisfactory_serve_map::scan::Scanner;
use satisfactory_serve_map::{output, server};
use std::path::PathBuf;
use std::sync::Arc;

/// Flags that override the config file.
#[derive(clap::Args, Clone)]
struct ConfigArgs {
    /// TOML config file (see `gen-config`)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory containing save files
    #[arg(short, long, global = true)]
    save_dir: Option<PathBuf>,

    /// Public URL of this service, used to build links
    #[arg(short, long, global = true)]
    base_url: Option<String>,

    /// Port to run the server on
    #[arg(short, long, global = true)]
    port: Option<u16>,
}

#[derive(Parser)]
#[command(name = "satisfactory-serve-map")]
#[command(about = "Serve the latest Satisfactory saves to the interactive map")]
#[command(long_about = "\
Serve the latest Satisfactory saves to the interactive map

Scans a save directory, groups files by save name and serves the newest one:

  GET /map/<name>   latest file for save <name>
  GET /map          HTML index of all saves

Save naming:

  Factory_autosave_0.sav          autosave slot, ranked by modification time
  Factory_20240317-210455.sav     ranked by the timestamp in the name
  Factory.sav                     ranked by modification time

All three belong to the save \"Factory\".

Run 'satisfactory-serve-map gen-config' to generate a documented config file.")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve saves over HTTP (default)
    Serve,
    /// Scan the save directory once and print the latest save per name
    List {
        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a stock config file with all options documented
    GenConfig,
}

fn load(args: &ConfigArgs) -> Result<ServerConfig, config::ConfigError> {
    config::load_config(
        args.config.as_deref(),
        Overrides {
            base_url: args.base_url.clone(),
            save_dir: args.save_dir.clone(),
            port: args.port,
        },
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let config = load(&cli.config)?;
            server::run(config).await?;
        }
        Command::List { json } => {
            let config = load(&cli.config)?;
            config::check_save_dir(&config.save_dir)?;
            let scanner = Scanner::new(
                &config.save_dir,
                Arc::new(SatisfactoryNaming::new(&config.saves.extensions)),
                config.saves.version_policy,
            );
            let records = tokio::task::spawn_blocking(move || scanner.scan()).await??;
            let catalog = resolve(records);
            if json {
                println!("{}", serde_json::to_string_pretty(&catalog)?);
            } else {
                let links = IndexLinks::from_config(&config)?;
                output::print_catalog(&catalog, &config.save_dir, Some(&links));
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr; `RUST_LOG` overrides the verbosity flags.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new(format!("satisfactory_serve_map={level},warn"))
        });
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
