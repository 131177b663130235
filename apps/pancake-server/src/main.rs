use anyhow::{ensure, Context, Result};
use api_ingress::{ApiIngress, ApiIngressConfig};
use clap::{Parser, Subcommand, ValueEnum};
use runtime::{AppConfig, CliArgs};
use std::path::{Path, PathBuf};

mod api;

/// Pancake server - a demonstration API declared with apiary
#[derive(Parser)]
#[command(name = "pancake-server")]
#[command(about = "Pancake server - a demonstration API declared with apiary")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration and action declarations
    Check,
    /// Print the API documentation
    Docs {
        #[arg(long, value_enum, default_value_t = DocsFormat::Markdown)]
        format: DocsFormat,
    },
    /// Print the OpenAPI document
    Openapi {
        #[arg(long, value_enum, default_value_t = SpecFormat::Yaml)]
        format: SpecFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DocsFormat {
    Markdown,
    Html,
}

#[derive(Clone, Copy, ValueEnum)]
enum SpecFormat {
    Json,
    Yaml,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    if let Some(path) = &cli.config {
        ensure!(path.is_file(), "config file not found: {}", path.display());
    }

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    if args.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            init_logging(&config);
            run_server(config).await
        }
        Commands::Check => {
            init_logging(&config);
            check_config(&config)
        }
        // Output goes to stdout, so these run without a log subscriber.
        Commands::Docs { format } => print_docs(&config, format),
        Commands::Openapi { format } => print_openapi(&config, format),
    }
}

fn init_logging(config: &AppConfig) {
    let logging_config = config.logging.clone().unwrap_or_default();
    runtime::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
}

fn build_app(config: &AppConfig) -> Result<apiary::App> {
    api::build_app(&config.api, api::SharedStore::default())
        .context("invalid action declarations")
}

async fn run_server(config: AppConfig) -> Result<()> {
    tracing::info!("Pancake server starting");
    let app = build_app(&config)?;
    let ingress = ApiIngress::new(app, ApiIngressConfig::from(&config));

    ingress
        .serve(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
        })
        .await
}

fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");
    let app = build_app(config)?;

    tracing::info!(routes = app.route_count(), "Configuration is valid");
    println!("Configuration check passed");
    println!("Declared actions:");
    for (verb, path) in app.routes() {
        println!("  {verb} {}{path}", app.mountpoint());
    }
    println!("{}", config.to_yaml()?);
    Ok(())
}

fn print_docs(config: &AppConfig, format: DocsFormat) -> Result<()> {
    let app = build_app(config)?;
    let output = match format {
        DocsFormat::Markdown => app.to_markdown(),
        DocsFormat::Html => app
            .to_html_document()
            .context("failed to render documentation")?,
    };
    println!("{output}");
    Ok(())
}

fn print_openapi(config: &AppConfig, format: SpecFormat) -> Result<()> {
    let app = build_app(config)?;
    let output = match format {
        SpecFormat::Json => app.to_openapi_json(),
        SpecFormat::Yaml => app.to_openapi_yaml(),
    }
    .context("failed to render the OpenAPI document")?;
    println!("{output}");
    Ok(())
}
