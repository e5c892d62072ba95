use anyhow::Result;
use clap::{CommandFactory, Parser};
use jimaku::cli::{Cli, Commands, ConfigAction, ModelsAction};
use jimaku::config::Config;
use jimaku::daemon::{build_orchestrator, run_daemon};
use jimaku::diagnostics::check_dependencies;
use jimaku::ipc::client::send_request;
use jimaku::ipc::protocol::{Request, Response};
use jimaku::ipc::server::IpcServer;
use jimaku::models::catalog::list_models;
use jimaku::models::download::{download_model, is_model_installed};
use jimaku::pipeline::orchestrator::SubtitleSegment;
use owo_colors::OwoColorize;
use std::path::Path;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            ref url,
            start,
            duration,
            json,
        } => {
            let config = load_config(cli.config.as_deref(), cli.model.clone())?;
            run_process(
                config,
                url,
                start,
                duration,
                json,
                cli.quiet,
                cli.verbose,
                cli.no_download,
            )
            .await?;
        }
        Commands::Daemon { ref socket } => {
            let config = load_config(cli.config.as_deref(), cli.model.clone())?;
            run_daemon(
                config,
                socket.clone(),
                cli.quiet,
                cli.verbose,
                cli.no_download,
            )
            .await?;
        }
        Commands::Status { ref socket } => {
            let socket = socket
                .clone()
                .unwrap_or_else(IpcServer::default_socket_path);
            handle_status(&socket).await?;
        }
        Commands::Shutdown { ref socket } => {
            let socket = socket
                .clone()
                .unwrap_or_else(IpcServer::default_socket_path);
            let response = send_request(&socket, Request::Shutdown).await?;
            if matches!(response, Response::Ok) {
                println!("Daemon shutting down.");
            }
        }
        Commands::Models { ref action } => {
            handle_models_command(action).await?;
        }
        Commands::Check => {
            let config = load_config(cli.config.as_deref(), cli.model.clone())?;
            if !check_dependencies(&config) {
                std::process::exit(1);
            }
        }
        Commands::Config { ref action } => {
            handle_config_command(action, cli.config.as_deref(), cli.model.clone())?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "jimaku", &mut std::io::stdout());
        }
    }

    Ok(())
}

/// Load configuration from an explicit path or the default location, apply
/// environment overrides, then CLI overrides.
fn load_config(path: Option<&Path>, model_override: Option<String>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(&Config::default_path())?,
    };

    let mut config = config.with_env_overrides();
    if let Some(model) = model_override.filter(|m| !m.is_empty()) {
        config.stt.model = model;
    }
    Ok(config)
}

/// One-shot pipeline run without a daemon.
#[allow(clippy::too_many_arguments)]
async fn run_process(
    config: Config,
    url: &str,
    start: u32,
    duration: u32,
    json: bool,
    quiet: bool,
    verbosity: u8,
    no_download: bool,
) -> Result<()> {
    let orchestrator = build_orchestrator(&config, quiet, verbosity, no_download).await?;

    let segments = orchestrator
        .process_chunk(url, start, duration, &CancellationToken::new())
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&segments)?);
    } else {
        print_segments(&segments);
    }

    Ok(())
}

fn print_segments(segments: &[SubtitleSegment]) {
    if segments.is_empty() {
        println!("{}", "(no speech found in this window)".dimmed());
        return;
    }

    for segment in segments {
        println!(
            "{} {}",
            format!("[{:7.1}s - {:7.1}s]", segment.start_secs, segment.end_secs).dimmed(),
            segment.source_script.bold()
        );
        if !segment.reading.is_empty() {
            println!("                      {}", segment.reading.cyan());
        }
        println!("                      {}", segment.target_text);
    }
}

async fn handle_status(socket: &Path) -> Result<()> {
    match send_request(socket, Request::Status).await? {
        Response::Status {
            model_name,
            in_flight,
            cache_dir,
        } => {
            println!("Daemon running");
            println!("  model:      {}", model_name);
            println!("  in flight:  {}", in_flight);
            println!("  chunk dir:  {}", cache_dir);
        }
        other => println!("Unexpected response: {:?}", other),
    }
    Ok(())
}

async fn handle_models_command(action: &ModelsAction) -> Result<()> {
    match action {
        ModelsAction::List => {
            for model in list_models() {
                let installed = if is_model_installed(model.name) {
                    "installed".green().to_string()
                } else {
                    "not installed".dimmed().to_string()
                };
                println!("  {:10} {:5} MB  {}", model.name, model.size_mb, installed);
            }
        }
        ModelsAction::Install { name } => {
            if is_model_installed(name) {
                println!("Model '{}' is already installed.", name);
            } else {
                let path = download_model(name, true).await?;
                println!("Installed to {}", path.display());
            }
        }
    }
    Ok(())
}

fn handle_config_command(
    action: &ConfigAction,
    path: Option<&Path>,
    model_override: Option<String>,
) -> Result<()> {
    match action {
        ConfigAction::Path => {
            println!("{}", Config::default_path().display());
        }
        ConfigAction::Show => {
            let config = load_config(path, model_override)?;
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }
    Ok(())
}
