//! mdpad CLI
//!
//! Command-line client for mdpad collaborative markdown servers.

use anyhow::Result;
use clap::Parser;
use mdpad_core::{PadError, SessionStore};
use mdpadctl::cli::{
    generate_completion, handle_delete, handle_export, handle_history, handle_import,
    handle_login, handle_logout, handle_profile, handle_publish, Cli, Commands, OutputFormat,
};
use mdpadctl::client::PadClient;
use mdpadctl::config::CliConfig;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    if let Err(e) = run(cli).await {
        // The typed error buried in the chain decides the exit code:
        // usage errors exit 2, everything else exits 1.
        let code = e
            .chain()
            .find_map(|cause| cause.downcast_ref::<PadError>())
            .map(PadError::exit_code)
            .unwrap_or(1);

        eprintln!("Error: {:#}", e);
        if verbose {
            eprintln!("Error details: {:?}", e);
        }
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Build configuration using priority chain:
    // defaults → config file → env → CLI args
    let mut builder = CliConfig::builder();

    // CLI argument overrides (highest priority)
    if let Some(ref server) = cli.server {
        builder = builder
            .with_server_url(server)
            .map_err(|e| PadError::InvalidInput(e.to_string()))?;
    }
    if let Some(ref path) = cli.cookie_file {
        builder = builder.with_cookie_file(path);
    }
    if cli.verbose {
        builder = builder.with_verbose(true);
    }

    // Environment, then config file, fill whatever is still unset
    builder = builder.with_env_overrides();
    builder = builder.with_config_file(!cli.no_config)?;

    let config = builder.build()?;

    if config.verbose {
        eprintln!("Server URL: {}", config.server_url);
        eprintln!("Cookie file: {}", config.cookie_file.display());
    }

    let output_format = cli.format.unwrap_or(OutputFormat::Table);

    let store = SessionStore::new(&config.cookie_file);
    let jar = store.load()?;
    let mut client = PadClient::new(&config.server_url, jar)?;

    match cli.command {
        Commands::Import { path, note_id } => {
            handle_import(&mut client, &path, note_id.as_deref()).await
        }
        Commands::Publish { note_id } => handle_publish(&mut client, &note_id).await,
        Commands::Export {
            variant,
            note_id,
            output,
        } => handle_export(&mut client, &variant, &note_id, output).await,
        Commands::Delete { note_id } => handle_delete(&mut client, &note_id).await,
        Commands::Login {
            method,
            user,
            password,
        } => handle_login(&mut client, &store, &method, user, password).await,
        Commands::Logout => handle_logout(&mut client, &store).await,
        Commands::Profile => handle_profile(&mut client, &config, &output_format).await,
        Commands::History => handle_history(&mut client, &output_format).await,
        Commands::Completion { shell } => {
            generate_completion(shell);
            Ok(())
        }
    }
}
