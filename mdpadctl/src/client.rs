//! HTTP client for communicating with the mdpad server.

use anyhow::{Context, Result};
use mdpad_core::{api, extract, CookieJar, PadError};
use reqwest::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use reqwest::{redirect, Client, RequestBuilder, Response, StatusCode};

/// Normalize a server URL by removing trailing slashes.
fn normalize_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// How many redirect hops the manual follower will take before giving up.
const MAX_REDIRECT_HOPS: usize = 10;

/// HTTP client for the mdpad server's note and session endpoints.
///
/// Redirect following is disabled on the underlying client: the note
/// endpoints answer with a 302 whose `Location` carries the interesting
/// identifier, so callers must see the redirect before it is followed.
/// The few paths that do need the final URL go through
/// [`PadClient::follow_to_final_url`].
///
/// Cookies are managed explicitly through a [`CookieJar`] so the session
/// can be persisted between invocations. Every response's `Set-Cookie`
/// headers are absorbed back into the jar.
///
/// Calls are issued once, sequentially, with no retry and no explicit
/// timeout; a network failure surfaces immediately as
/// [`PadError::Transport`], while an unexpected HTTP status becomes
/// [`PadError::Http`].
#[derive(Debug)]
pub struct PadClient {
    client: Client,
    base_url: String,
    jar: CookieJar,
}

impl PadClient {
    /// Create a client against `server_url`, seeding it with a
    /// previously persisted cookie jar.
    pub fn new(server_url: &str, jar: CookieJar) -> Result<Self> {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .user_agent(concat!("mdpadctl/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: normalize_url(server_url),
            jar,
        })
    }

    /// Server base URL (trailing slash normalized away).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current cookie jar, including any cookies absorbed from responses.
    pub fn cookies(&self) -> &CookieJar {
        &self.jar
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request with the session cookies attached, absorbing any
    /// `Set-Cookie` headers from the response into the jar.
    async fn execute(&mut self, request: RequestBuilder) -> Result<Response> {
        let request = match self.jar.header_value() {
            Some(cookies) => request.header(COOKIE, cookies),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| PadError::Transport(e.to_string()))?;

        for value in response.headers().get_all(SET_COOKIE) {
            if let Ok(value) = value.to_str() {
                self.jar.absorb(value);
            }
        }

        Ok(response)
    }

    /// Require a success status, converting anything else into
    /// [`PadError::Http`] labelled with the endpoint.
    fn check_success(status: StatusCode, endpoint: &str) -> Result<()> {
        if status.is_success() {
            Ok(())
        } else {
            Err(PadError::Http {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
            }
            .into())
        }
    }

    /// Follow redirects by hand until a non-3xx response, returning the
    /// final effective URL.
    async fn follow_to_final_url(&mut self, start_url: String, endpoint: &str) -> Result<String> {
        let mut url = start_url;

        for _ in 0..MAX_REDIRECT_HOPS {
            let response = self.execute(self.client.get(&url)).await?;
            let status = response.status();

            if !status.is_redirection() {
                Self::check_success(status, endpoint)?;
                return Ok(url);
            }

            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| {
                    PadError::Extraction(format!("redirect from {} carried no Location", endpoint))
                })?;
            url = extract::resolve_location(&self.base_url, location);
        }

        Err(PadError::Extraction(format!("too many redirects from {}", endpoint)).into())
    }

    // =========================================================================
    // Note lifecycle
    // =========================================================================

    /// Upload markdown as a new note via `POST /new` (or `/new/<id>` to
    /// pick the identifier), returning the private note id announced in
    /// the redirect target.
    pub async fn import_note(&mut self, content: Vec<u8>, note_id: Option<&str>) -> Result<String> {
        let path = match note_id {
            Some(id) => format!("/new/{}", urlencoding::encode(id)),
            None => "/new".to_string(),
        };
        let url = self.url(&path);

        let response = self
            .execute(
                self.client
                    .post(&url)
                    .header(CONTENT_TYPE, "text/markdown")
                    .body(content),
            )
            .await?;

        let status = response.status();
        if !status.is_redirection() {
            // The server answers a create with a redirect; anything else
            // usually means the note requires authentication.
            return Err(PadError::Http {
                status: status.as_u16(),
                endpoint: "new".to_string(),
            })
            .context("Note was not created; you may need to log in first");
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                PadError::Extraction("create-note redirect carried no Location".to_string())
            })?;

        Ok(extract::note_id_from_location(&self.base_url, location)?)
    }

    /// Publish a note via `GET /<id>/publish`, following the redirect to
    /// the public page and returning the public identifier.
    pub async fn publish_note(&mut self, note_id: &str) -> Result<String> {
        let url = self.url(&format!("/{}/publish", urlencoding::encode(note_id)));
        let final_url = self.follow_to_final_url(url, "publish").await?;
        Ok(extract::public_id_from_url(&final_url)?)
    }

    /// Download the markdown source of a note (`GET /<id>/download`).
    pub async fn download_markdown(&mut self, note_id: &str) -> Result<Vec<u8>> {
        self.download(note_id, "download").await
    }

    /// Download the server-rendered PDF of a note (`GET /<id>/pdf`).
    pub async fn download_pdf(&mut self, note_id: &str) -> Result<Vec<u8>> {
        self.download(note_id, "pdf").await
    }

    async fn download(&mut self, note_id: &str, what: &str) -> Result<Vec<u8>> {
        let url = self.url(&format!("/{}/{}", urlencoding::encode(note_id), what));

        let response = self.execute(self.client.get(&url)).await?;
        Self::check_success(response.status(), what)?;

        let body = response
            .bytes()
            .await
            .map_err(|e| PadError::Transport(e.to_string()))?;
        Ok(body.to_vec())
    }

    /// Fetch the rendered public page of a published note (`GET /s/<id>`).
    pub async fn fetch_public_page(&mut self, public_id: &str) -> Result<String> {
        let url = self.url(&format!("/s/{}", urlencoding::encode(public_id)));

        let response = self.execute(self.client.get(&url)).await?;
        Self::check_success(response.status(), "s")?;

        response
            .text()
            .await
            .map_err(|e| PadError::Transport(e.to_string()).into())
    }

    /// Fetch an arbitrary same-server resource for the slide crawler.
    ///
    /// Non-2xx statuses are reported through the return value rather
    /// than as errors so the crawler can skip dead references.
    pub async fn fetch_resource(
        &mut self,
        path: &str,
    ) -> Result<(StatusCode, Option<String>, Vec<u8>)> {
        let url = self.url(path);

        let response = self.execute(self.client.get(&url)).await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let body = response
            .bytes()
            .await
            .map_err(|e| PadError::Transport(e.to_string()))?;

        Ok((status, content_type, body.to_vec()))
    }

    /// Remove a note from the account history (`DELETE /history/<id>`),
    /// echoing the server's response body verbatim.
    pub async fn delete_note(&mut self, note_id: &str) -> Result<String> {
        let url = self.url(&format!("/history/{}", urlencoding::encode(note_id)));

        let response = self.execute(self.client.delete(&url)).await?;
        response
            .text()
            .await
            .map_err(|e| PadError::Transport(e.to_string()).into())
    }

    // =========================================================================
    // Session management
    // =========================================================================

    /// Submit email credentials to `POST /login`.
    ///
    /// The server answers with a redirect and session cookies either
    /// way; whether the login actually succeeded is determined by the
    /// follow-up profile probe.
    pub async fn login_email(&mut self, email: &str, password: &str) -> Result<()> {
        let url = self.url("/login");
        self.execute(
            self.client
                .post(&url)
                .form(&[("email", email), ("password", password)]),
        )
        .await?;
        Ok(())
    }

    /// Submit LDAP credentials to `POST /auth/ldap`.
    pub async fn login_ldap(&mut self, username: &str, password: &str) -> Result<()> {
        let url = self.url("/auth/ldap");
        self.execute(
            self.client
                .post(&url)
                .form(&[("username", username), ("password", password)]),
        )
        .await?;
        Ok(())
    }

    /// Best-effort server-side logout. Failures are ignored; the caller
    /// clears the local session file regardless.
    pub async fn logout(&mut self) {
        let url = self.url("/logout");
        let _ = self.execute(self.client.get(&url)).await;
    }

    /// Fetch the profile of the logged-in user (`GET /me`).
    pub async fn profile(&mut self) -> Result<api::UserProfile> {
        let url = self.url("/me");

        let response = self.execute(self.client.get(&url)).await?;
        Self::check_success(response.status(), "me")?;

        let body = response
            .text()
            .await
            .map_err(|e| PadError::Transport(e.to_string()))?;
        let profile: api::UserProfile =
            serde_json::from_str(&body).map_err(|e| PadError::Extraction(e.to_string()))?;
        Ok(profile)
    }

    /// Probe `GET /me` with the current cookies. Authenticated iff the
    /// response parses and its `status` field equals `"ok"`.
    pub async fn is_authenticated(&mut self) -> Result<bool> {
        let url = self.url("/me");

        let response = self.execute(self.client.get(&url)).await?;
        if !response.status().is_success() {
            return Ok(false);
        }

        let body = response
            .text()
            .await
            .map_err(|e| PadError::Transport(e.to_string()))?;
        Ok(serde_json::from_str::<api::AuthStatus>(&body)
            .map(|s| s.is_ok())
            .unwrap_or(false))
    }

    /// Abort with [`PadError::AuthRequired`] unless the session probe
    /// succeeds. Authenticated handlers call this first.
    pub async fn require_auth(&mut self) -> Result<()> {
        if self.is_authenticated().await? {
            Ok(())
        } else {
            Err(PadError::AuthRequired.into())
        }
    }

    /// Fetch the account's note history (`GET /history`), in server
    /// order.
    pub async fn history(&mut self) -> Result<Vec<api::HistoryEntry>> {
        let url = self.url("/history");

        let response = self.execute(self.client.get(&url)).await?;
        Self::check_success(response.status(), "history")?;

        let body = response
            .text()
            .await
            .map_err(|e| PadError::Transport(e.to_string()))?;
        let parsed: api::HistoryResponse =
            serde_json::from_str(&body).map_err(|e| PadError::Extraction(e.to_string()))?;
        Ok(parsed.history)
    }
}
