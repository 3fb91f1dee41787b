use crate::error::{FinderError, Result};
use crate::models::RenderedPage;
use reqwest::blocking::Client;
use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const ACCEPT_LANGUAGE: &str = "sv-SE,sv;q=0.9,en;q=0.8";

// Per-call render budget passed to the rendering backend, in milliseconds.
const RENDER_TIMEOUT_MS: u64 = 30_000;

// Markers the site's anti-automation layer puts on challenge pages.
const BLOCK_MARKERS: &[&str] = &["Verify you are human", "Bekräfta att du är en människa"];

// Markers on detail pages whose listing has been taken down.
const REMOVED_MARKERS: &[&str] = &["Sidan kunde inte hittas", "annonsen har tagits bort"];

/// Rendering-backend settings, injected at construction time so tests can
/// run several fetchers with different configurations side by side.
#[derive(Debug, Clone, Default)]
pub struct RendererConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RenderResponse {
    #[serde(default)]
    html: String,
    #[serde(default)]
    error: Option<String>,
}

/// Retrieves raw markup for a URL. JavaScript-rendered pages go through the
/// configured rendering backend; JSON endpoints try a direct fetch first
/// since they are less aggressively protected. One attempt per call, no
/// retry or backoff: transient failures propagate to the caller.
#[derive(Clone)]
pub struct PageFetcher {
    client: Client,
    renderer: RendererConfig,
}

impl PageFetcher {
    pub fn new(renderer: RendererConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(Duration::from_secs(35))
            .build()?;
        Ok(PageFetcher { client, renderer })
    }

    /// Fetch a rendered page and reject bot-challenge responses.
    pub fn fetch_page(&self, url: &str) -> Result<String> {
        let page = self.render(url)?;
        check_blocked(&page.html)?;
        Ok(page.html)
    }

    /// Fetch a rendered detail page; additionally rejects pages reporting
    /// the listing as removed.
    pub fn fetch_detail_page(&self, url: &str) -> Result<String> {
        let html = self.fetch_page(url)?;
        check_removed(&html, url)?;
        Ok(html)
    }

    /// Fetch a JSON endpoint: direct request first, rendering backend as
    /// fallback. Some JSON endpoints sit behind the same anti-bot pipeline
    /// as HTML pages; when rendered, the payload ends up inside a `<pre>`
    /// block of the resulting document.
    pub fn fetch_json(&self, url: &str) -> Result<serde_json::Value> {
        match self.direct_json(url) {
            Ok(value) => return Ok(value),
            Err(e) => {
                debug!(url, error = %e, "direct JSON fetch failed, falling back to renderer");
            }
        }

        let html = self.fetch_page(url)?;
        match extract_pre_json(&html) {
            Some(value) => Ok(value),
            None => Err(FinderError::Transport(format!(
                "no JSON payload could be extracted from {}",
                url
            ))),
        }
    }

    fn direct_json(&self, url: &str) -> Result<serde_json::Value> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .header("Accept-Language", ACCEPT_LANGUAGE)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            warn!(url, %status, "direct JSON fetch returned error status");
            return Err(FinderError::Transport(format!(
                "JSON endpoint {} returned {}",
                url, status
            )));
        }

        let text = response.text()?;
        Ok(serde_json::from_str(&text)?)
    }

    fn render(&self, url: &str) -> Result<RenderedPage> {
        let base = self.renderer.base_url.as_deref().ok_or_else(|| {
            FinderError::Config(
                "renderer base URL is not set; configure it before fetching pages".to_string(),
            )
        })?;

        let endpoint = format!("{}/render", base.trim_end_matches('/'));
        debug!(url, endpoint = %endpoint, "rendering page");

        let mut request = self
            .client
            .post(&endpoint)
            .json(&json!({ "url": url, "timeout": RENDER_TIMEOUT_MS }));
        if let Some(key) = &self.renderer.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send()?;
        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            // Failure bodies are either JSON {"error": ..} or plain text.
            let message = serde_json::from_str::<RenderResponse>(&body)
                .ok()
                .and_then(|r| r.error)
                .unwrap_or(body);
            return Err(FinderError::Transport(format!(
                "rendering backend returned {}: {}",
                status,
                message.trim()
            )));
        }

        let rendered: RenderResponse = serde_json::from_str(&body)?;
        if let Some(error) = rendered.error {
            return Err(FinderError::Transport(format!(
                "rendering backend error: {}",
                error
            )));
        }
        Ok(RenderedPage {
            url: url.to_string(),
            html: rendered.html,
        })
    }
}

/// Challenge detection runs on every fetched page; the error is a distinct
/// category so callers can surface "try later" instead of a parse failure.
pub fn check_blocked(html: &str) -> Result<()> {
    for marker in BLOCK_MARKERS {
        if html.contains(marker) {
            return Err(FinderError::Blocked(format!(
                "bot verification challenge detected ({})",
                marker
            )));
        }
    }
    Ok(())
}

/// Removal detection, detail pages only.
pub fn check_removed(html: &str, url: &str) -> Result<()> {
    for marker in REMOVED_MARKERS {
        if html.contains(marker) {
            return Err(FinderError::Removed(format!(
                "{} is no longer available ({})",
                url, marker
            )));
        }
    }
    Ok(())
}

/// Pull a JSON document out of the first `<pre>` block of rendered markup.
pub fn extract_pre_json(html: &str) -> Option<serde_json::Value> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("pre").ok()?;
    for pre in document.select(&selector) {
        let text = pre.text().collect::<String>();
        if let Ok(value) = serde_json::from_str(text.trim()) {
            return Some(value);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    // Serve a single canned HTTP response on an ephemeral local port.
    fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 8192];
                let _ = stream.read(&mut buf);
                let response = format!(
                    "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_line,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{}", addr)
    }

    fn fetcher_against(base_url: String) -> PageFetcher {
        PageFetcher::new(RendererConfig {
            base_url: Some(base_url),
            api_key: None,
        })
        .unwrap()
    }

    #[test]
    fn renderer_error_status_is_a_transport_error() {
        let base = serve_once("HTTP/1.1 503 Service Unavailable", r#"{"error":"browser pool exhausted"}"#);
        let fetcher = fetcher_against(base);
        match fetcher.fetch_page("https://www.hemnet.se/bostader") {
            Err(FinderError::Transport(msg)) => {
                assert!(msg.contains("503"), "message was: {}", msg);
                assert!(msg.contains("browser pool exhausted"), "message was: {}", msg);
            }
            other => panic!("expected Transport, got {:?}", other),
        }
    }

    #[test]
    fn renderer_error_body_is_a_transport_error() {
        let base = serve_once("HTTP/1.1 200 OK", r#"{"html":"","error":"navigation timed out"}"#);
        let fetcher = fetcher_against(base);
        match fetcher.fetch_page("https://www.hemnet.se/bostader") {
            Err(FinderError::Transport(msg)) => {
                assert!(msg.contains("navigation timed out"), "message was: {}", msg);
            }
            other => panic!("expected Transport, got {:?}", other),
        }
    }

    #[test]
    fn challenge_marker_is_blocked_regardless_of_other_content() {
        let html = "<html><body><h1>Listings</h1><p>Verify you are human</p></body></html>";
        match check_blocked(html) {
            Err(FinderError::Blocked(_)) => {}
            other => panic!("expected Blocked, got {:?}", other),
        }
    }

    #[test]
    fn clean_page_passes_block_check() {
        assert!(check_blocked("<html><body>Välkommen</body></html>").is_ok());
    }

    #[test]
    fn removed_marker_is_detected_on_detail_pages() {
        let html = "<html><body>Tyvärr, annonsen har tagits bort.</body></html>";
        match check_removed(html, "https://example.se/bostad/1") {
            Err(FinderError::Removed(_)) => {}
            other => panic!("expected Removed, got {:?}", other),
        }
    }

    #[test]
    fn pre_block_json_is_extracted() {
        let html = r#"<html><body><pre>{"locations": [{"id": 1}]}</pre></body></html>"#;
        let value = extract_pre_json(html).unwrap();
        assert_eq!(value["locations"][0]["id"], 1);
    }

    #[test]
    fn non_json_pre_block_yields_none() {
        assert!(extract_pre_json("<html><pre>not json</pre></html>").is_none());
        assert!(extract_pre_json("<html><body>no pre at all</body></html>").is_none());
    }

    #[test]
    fn unconfigured_renderer_fails_fast() {
        let fetcher = PageFetcher::new(RendererConfig::default()).unwrap();
        match fetcher.fetch_page("https://www.hemnet.se/bostader") {
            Err(FinderError::Config(_)) => {}
            other => panic!("expected Config error, got {:?}", other),
        }
    }
}
