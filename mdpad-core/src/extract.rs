//! Redirect-target extraction
//!
//! The note endpoints answer with redirects whose target encodes the
//! interesting value: `POST /new` redirects to `/<note_id>`, and
//! `/<id>/publish` lands on `/s/<public_id>`. These helpers pull the
//! identifier out of such URLs. A URL that does not carry the expected
//! segment is an extraction failure, never a silent empty string.

use crate::error::{PadError, Result};

/// Resolve a `Location` header value against the server base URL.
///
/// Servers may send either an absolute URL or a root-relative path.
pub fn resolve_location(base_url: &str, location: &str) -> String {
    if location.starts_with("http://") || location.starts_with("https://") {
        location.to_string()
    } else if let Some(stripped) = location.strip_prefix('/') {
        format!("{}/{}", base_url.trim_end_matches('/'), stripped)
    } else {
        format!("{}/{}", base_url.trim_end_matches('/'), location)
    }
}

/// Extract the note identifier from a create-note redirect target.
///
/// The target has the shape `<server>/<note_id>`; the last non-empty
/// path segment is the identifier.
pub fn note_id_from_location(base_url: &str, location: &str) -> Result<String> {
    let url = resolve_location(base_url, location);
    let base = base_url.trim_end_matches('/');

    let path = url
        .strip_prefix(base)
        .ok_or_else(|| PadError::Extraction(format!("redirect left the server: {}", url)))?;

    match path.split('/').filter(|s| !s.is_empty()).next_back() {
        Some(segment) => Ok(segment.to_string()),
        None => Err(PadError::Extraction(format!(
            "redirect target carries no note id: {}",
            url
        ))),
    }
}

/// Extract the public identifier from a published-note URL.
///
/// A published note lives at `<server>/s/<public_id>`, making the
/// identifier the fifth `/`-delimited segment of the absolute URL.
pub fn public_id_from_url(url: &str) -> Result<String> {
    let parts: Vec<&str> = url.split('/').collect();
    match parts.get(4) {
        Some(segment) if !segment.is_empty() => Ok(segment.to_string()),
        _ => Err(PadError::Extraction(format!(
            "URL does not look like a published note: {}",
            url
        ))),
    }
}

/// Filesystem-safe label derived from the server host, used to name the
/// slide-export staging directory.
pub fn host_label(base_url: &str) -> Result<String> {
    let without_scheme = base_url
        .strip_prefix("https://")
        .or_else(|| base_url.strip_prefix("http://"))
        .unwrap_or(base_url);

    let host = without_scheme.split('/').next().unwrap_or("");
    if host.is_empty() {
        return Err(PadError::Extraction(format!(
            "cannot derive a host from {}",
            base_url
        )));
    }
    Ok(host.replace(':', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://pad.example.com";

    #[test]
    fn test_resolve_location() {
        assert_eq!(
            resolve_location(BASE, "/abc123"),
            "http://pad.example.com/abc123"
        );
        assert_eq!(
            resolve_location(BASE, "http://pad.example.com/abc123"),
            "http://pad.example.com/abc123"
        );
        assert_eq!(
            resolve_location("http://pad.example.com/", "abc123"),
            "http://pad.example.com/abc123"
        );
    }

    #[test]
    fn test_note_id_from_location() {
        assert_eq!(note_id_from_location(BASE, "/abc123").unwrap(), "abc123");
        assert_eq!(
            note_id_from_location(BASE, "http://pad.example.com/xyz").unwrap(),
            "xyz"
        );
        // Trailing slash on the target
        assert_eq!(note_id_from_location(BASE, "/abc123/").unwrap(), "abc123");
    }

    #[test]
    fn test_note_id_extraction_failures() {
        // Redirect back to the root carries no id
        assert!(note_id_from_location(BASE, "/").is_err());
        assert!(note_id_from_location(BASE, "http://pad.example.com").is_err());
        // Redirect to a different host
        assert!(note_id_from_location(BASE, "http://other.example.com/abc").is_err());
    }

    #[test]
    fn test_public_id_from_url() {
        assert_eq!(
            public_id_from_url("http://pad.example.com/s/S1ok3VuIl").unwrap(),
            "S1ok3VuIl"
        );
    }

    #[test]
    fn test_public_id_malformed() {
        assert!(public_id_from_url("http://pad.example.com/s/").is_err());
        assert!(public_id_from_url("http://pad.example.com/").is_err());
        assert!(public_id_from_url("http://pad.example.com").is_err());
    }

    #[test]
    fn test_host_label() {
        assert_eq!(host_label("http://pad.example.com").unwrap(), "pad.example.com");
        assert_eq!(
            host_label("https://pad.example.com:3000/").unwrap(),
            "pad.example.com_3000"
        );
        assert!(host_label("http://").is_err());
    }
}
