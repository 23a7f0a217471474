//! Output formatting utilities for the CLI

use colored::*;
use mdpad_core::api::{HistoryEntry, UserProfile};

use crate::config::CliConfig;

/// Format the history listing as a tab-separated table.
///
/// Header row is `ID`, two blank columns, `Name` — the padding keeps
/// the title column clear of the wide note identifiers. Entries stay in
/// server-provided order.
pub fn format_history(entries: &[HistoryEntry]) -> String {
    let mut lines = vec!["ID\t\t\tName".to_string()];
    for entry in entries {
        lines.push(format!("{}\t{}", entry.id, entry.text));
    }
    lines.join("\n")
}

/// Format the profile block: server, local paths, then whatever user
/// fields the server reported.
pub fn format_profile(profile: &UserProfile, config: &CliConfig) -> String {
    let mut output = String::new();
    output.push_str(&"mdpad Session".bold().to_string());
    output.push('\n');
    output.push_str(&format!("Server:      {}", config.server_url.cyan()));
    output.push('\n');
    output.push_str(&format!(
        "Config file: {}",
        config.config_file().display().to_string().cyan()
    ));
    output.push('\n');
    output.push_str(&format!(
        "Cookie file: {}",
        config.cookie_file.display().to_string().cyan()
    ));

    if let Some(name) = &profile.name {
        output.push('\n');
        output.push_str(&format!("Name:        {}", name.green()));
    }
    if let Some(id) = &profile.id {
        output.push('\n');
        output.push_str(&format!("User id:     {}", id.green()));
    }
    if let Some(photo) = &profile.photo {
        output.push('\n');
        output.push_str(&format!("Photo:       {}", photo.green()));
    }

    output
}

/// Format success message
pub fn format_success(message: &str) -> String {
    format!("{} {}", "✓".green().bold(), message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, text: &str) -> HistoryEntry {
        HistoryEntry {
            id: id.to_string(),
            text: text.to_string(),
            time: None,
            tags: Vec::new(),
        }
    }

    #[test]
    fn test_format_history_header_and_rows() {
        let entries = vec![entry("abc123", "Meeting notes"), entry("def456", "Scratch")];
        let table = format_history(&entries);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines[0], "ID\t\t\tName");
        assert_eq!(lines[1], "abc123\tMeeting notes");
        assert_eq!(lines[2], "def456\tScratch");
    }

    #[test]
    fn test_format_history_preserves_server_order() {
        let entries = vec![entry("zzz", "Last edited"), entry("aaa", "Older")];
        let table = format_history(&entries);
        let zzz = table.find("zzz").unwrap();
        let aaa = table.find("aaa").unwrap();
        assert!(zzz < aaa, "entries must not be re-sorted client-side");
    }

    #[test]
    fn test_format_history_empty() {
        assert_eq!(format_history(&[]), "ID\t\t\tName");
    }

    #[test]
    fn test_format_success() {
        let message = format_success("Logged in");
        assert!(message.contains("✓"));
        assert!(message.contains("Logged in"));
    }

    #[test]
    fn test_format_profile_includes_paths() {
        colored::control::set_override(false);

        let profile = UserProfile {
            status: "ok".to_string(),
            name: Some("Ada".to_string()),
            id: Some("u-1".to_string()),
            photo: None,
        };
        let config = crate::config::CliConfig::default();
        let output = format_profile(&profile, &config);

        assert!(output.contains(&config.server_url));
        assert!(output.contains("cookies.json"));
        assert!(output.contains("Ada"));
        assert!(output.contains("u-1"));
        assert!(!output.contains("Photo:"));

        colored::control::unset_override();
    }
}
