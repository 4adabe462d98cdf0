//! Edge Leap CLI - Entry Point
//!
//! Streamlines releasing edge modules to devices managed by an IoT hub.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use colored::Colorize;
use elcli::app::run::{
    connect_releaser, draft_deploy, draft_deployment_id, release, DRAFT_DEPLOY_REQUIRED,
    RELEASE_REQUIRED,
};
use elcli::app::settings::{Settings, DEFAULT_CONFIG_FILE, ENV_TOKEN};
use elcli::errors::LeapError;
use elcli::logs::{init_logging, LogOptions};
use elcli::utils::{release_id, short_id, version_info};

use tracing::error;

const USAGE: &str = "\
usage: elcli <command> [--key=value ...]

commands:
  release         publish a module configuration to the hub
  draft new       print a new draft session id
  draft deploy    tag the development device and publish a draft configuration

options:
  --config=<file>       configuration file (default ./edge-leap.yaml)
  --log-level=<level>   trace, debug, info, warn or error
  --log-json            emit logs as JSON
  --version             print version information";

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let mut commands: Vec<String> = Vec::new();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in env::args().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        } else {
            commands.push(arg);
        }
    }

    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(version) => println!("{}", version),
            Err(e) => eprintln!("{} {}", "error:".red().bold(), e),
        }
        return ExitCode::SUCCESS;
    }

    let command: Vec<&str> = commands.iter().map(String::as_str).collect();
    if command.is_empty() || cli_args.contains_key("help") {
        println!("{}", USAGE);
        return ExitCode::SUCCESS;
    }

    if command.as_slice() == ["draft", "new"] {
        println!("{}", short_id());
        return ExitCode::SUCCESS;
    }

    let settings = match load_settings(&cli_args) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        json_format: cli_args.contains_key("log-json"),
        ..Default::default()
    };
    if let Err(e) = init_logging(log_options) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let result = match command.as_slice() {
        ["release"] => execute_release(&settings).await,
        ["draft", "deploy"] => execute_draft_deploy(&settings).await,
        _ => {
            eprintln!("{} unknown command '{}'\n\n{}", "error:".red().bold(), command.join(" "), USAGE);
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(summary) => {
            println!("{}", summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            if e.is_unauthorized() {
                eprintln!("{} check the hub token (--token or {})", "hint:".yellow(), ENV_TOKEN);
            }
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// File, then environment, then flags
fn load_settings(cli_args: &HashMap<String, String>) -> Result<Settings, LeapError> {
    let path = cli_args
        .get("config")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut settings = Settings::load(&path)?;
    settings.apply_env();
    settings.apply_flags(cli_args)?;
    Ok(settings)
}

async fn execute_release(settings: &Settings) -> Result<String, LeapError> {
    let release_id = release_id();
    let releaser = connect_releaser(settings, RELEASE_REQUIRED)?;
    let outcome = release(&releaser, settings, &release_id).await?;
    Ok(format!("{}, release {}", outcome.id, release_id))
}

async fn execute_draft_deploy(settings: &Settings) -> Result<String, LeapError> {
    let releaser = connect_releaser(settings, DRAFT_DEPLOY_REQUIRED)?;
    draft_deploy(&releaser, settings).await?;
    Ok(draft_deployment_id(settings))
}
