//! Command execution handlers

use anyhow::{Context, Result};
use mdpad_core::{PadError, SessionStore};
use std::fs;
use std::path::{Path, PathBuf};

use crate::client::PadClient;
use crate::config::CliConfig;
use crate::export;
use crate::format::{format_history, format_profile, format_success};

use super::commands::*;

/// Where a credential comes from: given on the command line, or asked
/// for interactively. Selected once per credential instead of branching
/// at every prompt site.
#[derive(Debug)]
pub enum CredentialSource {
    Explicit(String),
    Prompt(&'static str),
}

impl CredentialSource {
    pub fn from_arg(arg: Option<String>, prompt: &'static str) -> Self {
        match arg {
            Some(value) => Self::Explicit(value),
            None => Self::Prompt(prompt),
        }
    }

    /// Resolve the credential, prompting if needed. Secret values are
    /// read without terminal echo.
    pub fn resolve(self, secret: bool) -> Result<String> {
        match self {
            Self::Explicit(value) => Ok(value),
            Self::Prompt(label) => {
                if secret {
                    dialoguer::Password::new()
                        .with_prompt(label)
                        .interact()
                        .context("Failed to read password")
                } else {
                    dialoguer::Input::new()
                        .with_prompt(label)
                        .interact_text()
                        .context("Failed to read input")
                }
            }
        }
    }
}

/// Handle import command: upload a file and print the new note id.
pub async fn handle_import(
    client: &mut PadClient,
    path: &Path,
    note_id: Option<&str>,
) -> Result<()> {
    let content = fs::read(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let id = client.import_note(content, note_id).await?;
    println!("{}", id);
    Ok(())
}

/// Handle publish command: print the public identifier.
pub async fn handle_publish(client: &mut PadClient, note_id: &str) -> Result<()> {
    let public_id = client.publish_note(note_id).await?;
    println!("{}", public_id);
    Ok(())
}

/// Handle export command in all four variants. Prints the output path.
pub async fn handle_export(
    client: &mut PadClient,
    variant: &ExportVariant,
    note_id: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    let out_path = if variant.md {
        let body = client.download_markdown(note_id).await?;
        let out = output.unwrap_or_else(|| PathBuf::from(format!("{}.md", note_id)));
        fs::write(&out, body)
            .with_context(|| format!("Failed to write {}", out.display()))?;
        out
    } else if variant.pdf {
        let body = client.download_pdf(note_id).await?;
        let out = output.unwrap_or_else(|| PathBuf::from(format!("{}.pdf", note_id)));
        fs::write(&out, body)
            .with_context(|| format!("Failed to write {}", out.display()))?;
        out
    } else if variant.html {
        let public_id = client.publish_note(note_id).await?;
        let page = client.fetch_public_page(&public_id).await?;
        let standalone = export::rewrite_standalone(&page, client.base_url());
        let out = output.unwrap_or_else(|| PathBuf::from(format!("{}.html", note_id)));
        fs::write(&out, standalone)
            .with_context(|| format!("Failed to write {}", out.display()))?;
        out
    } else {
        export::export_slides(client, note_id, output).await?
    };

    println!("{}", out_path.display());
    Ok(())
}

/// Handle delete command: echo the server's response.
pub async fn handle_delete(client: &mut PadClient, note_id: &str) -> Result<()> {
    client.require_auth().await?;

    let response = client.delete_note(note_id).await?;
    println!("{}", response.trim_end());
    Ok(())
}

/// Handle login command: authenticate, verify, persist the session.
pub async fn handle_login(
    client: &mut PadClient,
    store: &SessionStore,
    method: &LoginMethod,
    user: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let user_prompt = match method {
        LoginMethod::Email => "Email",
        LoginMethod::Ldap => "Username",
    };
    let user = CredentialSource::from_arg(user, user_prompt).resolve(false)?;
    let password = CredentialSource::from_arg(password, "Password").resolve(true)?;

    match method {
        LoginMethod::Email => client.login_email(&user, &password).await?,
        LoginMethod::Ldap => client.login_ldap(&user, &password).await?,
    }

    // The login endpoints hand out cookies unconditionally; only a
    // session that passes the profile probe is worth keeping.
    if !client.is_authenticated().await? {
        return Err(PadError::LoginRejected.into());
    }

    store.save(client.cookies())?;
    let method_name = match method {
        LoginMethod::Email => "email",
        LoginMethod::Ldap => "ldap",
    };
    println!(
        "{}",
        format_success(&format!(
            "Logged in to {} via {}",
            client.base_url(),
            method_name
        ))
    );
    Ok(())
}

/// Handle logout command. Both steps are best-effort.
pub async fn handle_logout(client: &mut PadClient, store: &SessionStore) -> Result<()> {
    client.logout().await;
    let _ = store.clear();
    println!("{}", format_success("Logged out"));
    Ok(())
}

/// Handle profile command.
pub async fn handle_profile(
    client: &mut PadClient,
    config: &CliConfig,
    format: &OutputFormat,
) -> Result<()> {
    let profile = client.profile().await?;
    if !profile.is_ok() {
        return Err(PadError::AuthRequired.into());
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        OutputFormat::Table => {
            println!("{}", format_profile(&profile, config));
        }
    }

    Ok(())
}

/// Handle history command.
pub async fn handle_history(client: &mut PadClient, format: &OutputFormat) -> Result<()> {
    client.require_auth().await?;

    let entries = client.history().await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Table => {
            println!("{}", format_history(&entries));
        }
    }

    Ok(())
}

/// Generate shell completion script
pub fn generate_completion(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}
