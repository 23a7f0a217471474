//! Export engines for the heavier export variants
//!
//! `--html` turns the rendered public page into a standalone file by
//! rewriting root-relative links to absolute ones. `--slides` mirrors
//! the slide deck's page tree into a staging directory named after the
//! server host, relativizes the links between the mirrored files, and
//! packs the result into a zip archive.

use anyhow::{Context, Result};
use mdpad_core::{extract, PadError};
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

/// Upper bound on mirrored resources, so a pathological deck cannot
/// turn the export into a site crawl.
const MAX_RESOURCES: usize = 256;

/// Rewrite root-relative `href`/`src` attributes to absolute URLs so
/// the page renders outside the server. Protocol-relative (`//cdn...`)
/// and already-absolute references are left untouched.
pub fn rewrite_standalone(html: &str, base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let mut out = rewrite_attr(html, "href", base);
    out = rewrite_attr(&out, "src", base);
    out
}

fn rewrite_attr(html: &str, attr: &str, base: &str) -> String {
    let needle = format!("{}=\"/", attr);
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(pos) = rest.find(&needle) {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + needle.len()..];
        if after.starts_with('/') {
            // protocol-relative URL, not a server path
            out.push_str(&needle);
        } else {
            out.push_str(attr);
            out.push_str("=\"");
            out.push_str(base);
            out.push('/');
        }
        rest = after;
    }
    out.push_str(rest);
    out
}

/// Mirror the slide deck of `note_id` and compress it into a zip
/// archive, returning the archive path.
///
/// The staging directory is derived from the server host and created in
/// the current directory; if something already occupies that path the
/// export refuses to run before any request is made.
pub async fn export_slides(
    client: &mut crate::client::PadClient,
    note_id: &str,
    output: Option<PathBuf>,
) -> Result<PathBuf> {
    let staging = std::env::current_dir()?.join(extract::host_label(client.base_url())?);
    if staging.exists() {
        return Err(PadError::InvalidInput(format!(
            "{} already exists; refusing to use it as a staging directory",
            staging.display()
        ))
        .into());
    }

    let out_path = output.unwrap_or_else(|| PathBuf::from(format!("{}.zip", note_id)));

    fs::create_dir_all(&staging)?;
    let result = mirror_slide_tree(client, note_id, &staging).await;
    let result = result.and_then(|_| zip_directory(&staging, &out_path));

    // The staging tree is scratch space either way.
    let _ = fs::remove_dir_all(&staging);

    result?;
    Ok(out_path)
}

/// Breadth-first fetch of the slide page and every same-server resource
/// it references, mirrored under `staging`. Links between mirrored
/// files are rewritten to relative paths once the full set is known.
async fn mirror_slide_tree(
    client: &mut crate::client::PadClient,
    note_id: &str,
    staging: &Path,
) -> Result<()> {
    let root = format!("/{}/slide", urlencoding::encode(note_id));
    let mut queue = VecDeque::from([root.clone()]);
    let mut visited: HashSet<String> = HashSet::new();
    // url path -> mirrored file path (relative to staging)
    let mut mirrored: HashMap<String, PathBuf> = HashMap::new();
    let mut html_pages: Vec<(PathBuf, String)> = Vec::new();

    while let Some(path) = queue.pop_front() {
        if !visited.insert(path.clone()) {
            continue;
        }
        if visited.len() > MAX_RESOURCES {
            return Err(PadError::Extraction(
                "slide deck references too many resources".to_string(),
            )
            .into());
        }

        let (status, content_type, body) = client.fetch_resource(&path).await?;
        if !status.is_success() {
            if path == root {
                return Err(PadError::Http {
                    status: status.as_u16(),
                    endpoint: "slide".to_string(),
                }
                .into());
            }
            // Dead secondary reference; the deck is still usable.
            continue;
        }

        let is_html = content_type
            .as_deref()
            .map(|c| c.starts_with("text/html"))
            .unwrap_or(false);
        let rel = relative_file_path(&path, is_html);
        mirrored.insert(path.clone(), rel.clone());

        if is_html {
            let text = String::from_utf8_lossy(&body).into_owned();
            for link in collect_local_links(&text, client.base_url()) {
                queue.push_back(link);
            }
            html_pages.push((rel, text));
        } else {
            let file_path = staging.join(&rel);
            if let Some(parent) = file_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&file_path, &body)?;
        }
    }

    // Second pass: point the mirrored pages at each other.
    let base_url = client.base_url().to_string();
    for (rel, text) in html_pages {
        let rewritten = relativize_links(&text, &rel, &base_url, &mirrored);
        let file_path = staging.join(&rel);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&file_path, rewritten)?;
    }

    Ok(())
}

/// Pull same-server resource paths out of an HTML document.
///
/// Root-relative references and absolute references under `base_url`
/// are kept (normalized to a path); everything else is foreign.
fn collect_local_links(html: &str, base_url: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector =
        Selector::parse("a[href], link[href], script[src], img[src], source[src]").unwrap();
    let base = base_url.trim_end_matches('/');

    let mut links = Vec::new();
    for element in document.select(&selector) {
        let value = element
            .value()
            .attr("href")
            .or_else(|| element.value().attr("src"));
        let Some(value) = value else { continue };

        let path = if let Some(stripped) = value.strip_prefix(base) {
            stripped.to_string()
        } else if value.starts_with('/') && !value.starts_with("//") {
            value.to_string()
        } else {
            continue;
        };

        // Drop query/fragment; the mirror is plain files.
        let path = path.split(['?', '#']).next().unwrap_or("").to_string();
        if !path.is_empty() && path.starts_with('/') {
            links.push(path);
        }
    }
    links
}

/// Map a URL path to a file path inside the staging directory.
fn relative_file_path(url_path: &str, is_html: bool) -> PathBuf {
    let trimmed = url_path.trim_start_matches('/');
    let mut name = if trimmed.is_empty() {
        "index.html".to_string()
    } else if trimmed.ends_with('/') {
        format!("{}index.html", trimmed)
    } else {
        trimmed.to_string()
    };

    if is_html && !name.ends_with(".html") && !name.ends_with(".htm") {
        name.push_str(".html");
    }
    PathBuf::from(name)
}

/// Rewrite references between mirrored files as relative paths, so the
/// unpacked archive works from any directory.
///
/// Every quoted value naming a mirrored resource is rewritten, whether
/// it was root-relative or an absolute URL under the server, and with
/// or without a query/fragment suffix — the same normalization
/// [`collect_local_links`] applied when the resource was queued.
fn relativize_links(
    html: &str,
    page: &Path,
    base_url: &str,
    mirrored: &HashMap<String, PathBuf>,
) -> String {
    let depth = page.components().count().saturating_sub(1);
    let prefix = "../".repeat(depth);
    let base = base_url.trim_end_matches('/');

    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(open) = rest.find('"') {
        let Some(close) = rest[open + 1..].find('"') else {
            break;
        };
        let value = &rest[open + 1..open + 1 + close];
        out.push_str(&rest[..=open]);

        match mirrored_target(value, base, mirrored) {
            Some(rel) => {
                out.push_str(&prefix);
                out.push_str(&rel.to_string_lossy());
            }
            None => out.push_str(value),
        }
        out.push('"');
        rest = &rest[open + close + 2..];
    }
    out.push_str(rest);
    out
}

/// Normalize a quoted attribute value to its mirrored file, if any.
fn mirrored_target<'a>(
    value: &str,
    base: &str,
    mirrored: &'a HashMap<String, PathBuf>,
) -> Option<&'a PathBuf> {
    let path = if let Some(stripped) = value.strip_prefix(base) {
        stripped
    } else if value.starts_with('/') && !value.starts_with("//") {
        value
    } else {
        return None;
    };
    let path = path.split(['?', '#']).next().unwrap_or("");
    mirrored.get(path)
}

/// Pack a directory tree into a deflate-compressed zip archive.
fn zip_directory(dir: &Path, out_path: &Path) -> Result<()> {
    let file = File::create(out_path)
        .with_context(|| format!("Failed to create archive {}", out_path.display()))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in fs::read_dir(&current)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }

            let name = path
                .strip_prefix(dir)
                .expect("walked path is under the staging root")
                .to_string_lossy()
                .replace('\\', "/");
            zip.start_file(name, options)?;
            zip.write_all(&fs::read(&path)?)?;
        }
    }

    zip.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://pad.example.com";

    #[test]
    fn test_rewrite_standalone() {
        let html = r#"<link href="/build/style.css"><img src="/uploads/a.png">"#;
        let out = rewrite_standalone(html, BASE);
        assert!(out.contains(r#"href="http://pad.example.com/build/style.css""#));
        assert!(out.contains(r#"src="http://pad.example.com/uploads/a.png""#));
    }

    #[test]
    fn test_rewrite_leaves_foreign_urls_alone() {
        let html = r#"<script src="//cdn.example.net/x.js"></script><a href="https://other.example/y">y</a>"#;
        assert_eq!(rewrite_standalone(html, BASE), html);
    }

    #[test]
    fn test_rewrite_with_trailing_slash_base() {
        let html = r#"<a href="/abc">abc</a>"#;
        let out = rewrite_standalone(html, "http://pad.example.com/");
        assert_eq!(out, r#"<a href="http://pad.example.com/abc">abc</a>"#);
    }

    #[test]
    fn test_collect_local_links() {
        let html = format!(
            r##"<html><head>
                 <link href="/build/reveal.css" rel="stylesheet">
                 <script src="{}/js/deck.js"></script>
               </head><body>
                 <img src="/uploads/fig.png?v=2">
                 <a href="https://elsewhere.example/page">out</a>
                 <a href="//cdn.example.net/lib.js">cdn</a>
                 <a href="#section-2">anchor</a>
               </body></html>"##,
            BASE
        );
        let links = collect_local_links(&html, BASE);
        assert_eq!(
            links,
            vec!["/build/reveal.css", "/js/deck.js", "/uploads/fig.png"]
        );
    }

    #[test]
    fn test_relative_file_path() {
        assert_eq!(
            relative_file_path("/abc/slide", true),
            PathBuf::from("abc/slide.html")
        );
        assert_eq!(
            relative_file_path("/build/reveal.css", false),
            PathBuf::from("build/reveal.css")
        );
        assert_eq!(relative_file_path("/", true), PathBuf::from("index.html"));
        assert_eq!(
            relative_file_path("/deck/", true),
            PathBuf::from("deck/index.html")
        );
    }

    #[test]
    fn test_relativize_links() {
        let mut mirrored = HashMap::new();
        mirrored.insert("/build/reveal.css".to_string(), PathBuf::from("build/reveal.css"));

        let html = r#"<link href="/build/reveal.css">"#;
        let out = relativize_links(html, Path::new("abc/slide.html"), BASE, &mirrored);
        assert_eq!(out, r#"<link href="../build/reveal.css">"#);

        let out = relativize_links(html, Path::new("index.html"), BASE, &mirrored);
        assert_eq!(out, r#"<link href="build/reveal.css">"#);
    }

    #[test]
    fn test_relativize_absolute_and_query_links() {
        let mut mirrored = HashMap::new();
        mirrored.insert("/js/deck.js".to_string(), PathBuf::from("js/deck.js"));
        mirrored.insert("/uploads/fig.png".to_string(), PathBuf::from("uploads/fig.png"));

        // Absolute same-server URLs and query-suffixed paths name the
        // same mirrored files as their bare form and must be rewritten
        // too, or the unpacked archive still phones the live server.
        let html = format!(
            r#"<script src="{}/js/deck.js"></script><img src="/uploads/fig.png?v=2">"#,
            BASE
        );
        let out = relativize_links(&html, Path::new("abc/slide.html"), BASE, &mirrored);
        assert_eq!(
            out,
            r#"<script src="../js/deck.js"></script><img src="../uploads/fig.png">"#
        );

        // Foreign and unmirrored references stay untouched.
        let html = r#"<a href="https://elsewhere.example/page">out</a><a href="/not-mirrored">x</a>"#;
        let out = relativize_links(html, Path::new("index.html"), BASE, &mirrored);
        assert_eq!(out, html);
    }

    #[test]
    fn test_zip_directory_round_trip() {
        let staging = tempfile::tempdir().unwrap();
        fs::create_dir_all(staging.path().join("build")).unwrap();
        fs::write(staging.path().join("slide.html"), "<html></html>").unwrap();
        fs::write(staging.path().join("build/deck.css"), "body{}").unwrap();

        let out_dir = tempfile::tempdir().unwrap();
        let archive_path = out_dir.path().join("deck.zip");
        zip_directory(staging.path(), &archive_path).unwrap();

        let mut archive = zip::ZipArchive::new(File::open(&archive_path).unwrap()).unwrap();
        let names: HashSet<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.contains("slide.html"));
        assert!(names.contains("build/deck.css"));
    }
}
