use anyhow::Result;
use clap::Parser;
use std::path::Path;
use vocam::cli::{Cli, Commands, ModelsAction};
use vocam::config::Config;
use vocam::models::{install_model, model_path};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    let config = load_config(&cli)?;

    match cli.command {
        None | Some(Commands::Run) => {
            vocam::app::run_loop(config, cli.simulate, cli.image, cli.quiet).await?;
        }
        Some(Commands::Listen) => {
            vocam::app::run_listen(config, cli.simulate, cli.quiet).await?;
        }
        Some(Commands::Ask { text, image }) => {
            run_ask(&config, &text, &image).await?;
        }
        Some(Commands::Models { action }) => {
            handle_models_command(action, &config)?;
        }
    }

    Ok(())
}

fn init_tracing(quiet: bool, verbose: u8) {
    let default_filter = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load config from the given path (or the default), then layer environment
/// and CLI overrides on top.
fn load_config(cli: &Cli) -> Result<Config> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_default(&path)?.with_env_overrides();

    if let Some(model) = &cli.model {
        config.speech.model = model.clone();
    }
    if let Some(url) = &cli.backend_url {
        config.backend.url = url.clone();
    }

    Ok(config)
}

/// Send a typed request with an image and print the response.
async fn run_ask(config: &Config, text: &str, image: &Path) -> Result<()> {
    let backend = vocam::BackendClient::new(
        &config.backend.url,
        std::time::Duration::from_secs(config.backend.timeout_secs),
    )?;
    let response = backend.ask(text, image).await?;
    println!("{response}");
    Ok(())
}

fn handle_models_command(action: ModelsAction, config: &Config) -> Result<()> {
    match action {
        ModelsAction::Install => {
            let source = config.speech.asset_dir.join(&config.speech.model);
            let target = model_path(&config.speech.model);
            install_model(&source, &target)?;
            println!("Installed {} to {}", config.speech.model, target.display());
        }
        ModelsAction::Path => {
            println!("{}", model_path(&config.speech.model).display());
        }
    }
    Ok(())
}
