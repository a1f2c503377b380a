//! HTTP implementation of [`SourceScraper`].

use std::net::IpAddr;
use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use scraper::Html;
use tracing::debug;
use url::Url;

use docforge_shared::{DocforgeError, Result, ScrapeConfig, ScrapedSnapshot};

use crate::SourceScraper;
use crate::extract::{extract_main_text, extract_title};

/// User-Agent string for scrape requests.
const USER_AGENT: &str = concat!("docforge/", env!("CARGO_PKG_VERSION"));

/// Fetches source pages over HTTP and extracts their main content.
pub struct HttpScraper {
    client: Client,
    only_main_content: bool,
    /// Allow localhost/private IPs (for integration tests with mock servers).
    allow_localhost: bool,
}

impl HttpScraper {
    /// Create a new scraper from the `[scrape]` config section.
    pub fn new(config: &ScrapeConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DocforgeError::Scrape(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            only_main_content: config.only_main_content,
            allow_localhost: false,
        })
    }

    /// Allow scraping localhost/private IPs (for integration tests).
    #[cfg(test)]
    pub fn allow_localhost(mut self) -> Self {
        self.allow_localhost = true;
        self
    }
}

impl SourceScraper for HttpScraper {
    async fn scrape(&self, url: &str) -> Result<ScrapedSnapshot> {
        let parsed =
            Url::parse(url).map_err(|e| DocforgeError::Scrape(format!("{url}: invalid URL: {e}")))?;

        if !self.allow_localhost && is_ssrf_target(&parsed) {
            return Err(DocforgeError::Scrape(format!(
                "{url}: blocked private or non-HTTP target"
            )));
        }

        debug!(%url, "fetching source page");

        let response = self
            .client
            .get(parsed.as_str())
            .send()
            .await
            .map_err(|e| DocforgeError::Scrape(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DocforgeError::Scrape(format!("{url}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| DocforgeError::Scrape(format!("{url}: body read failed: {e}")))?;

        let doc = Html::parse_document(&body);
        let title = extract_title(&doc);
        let markdown = extract_main_text(&doc, self.only_main_content);

        if markdown.trim().is_empty() {
            return Err(DocforgeError::Scrape(format!("{url}: no extractable content")));
        }

        Ok(ScrapedSnapshot {
            url: url.to_string(),
            title,
            markdown,
            fetched_at: Utc::now(),
        })
    }
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check if a URL targets a potentially dangerous resource.
fn is_ssrf_target(url: &Url) -> bool {
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    if let Some(host) = url.host_str() {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return is_private_ip(&ip);
        }
        if host == "localhost"
            || host.ends_with(".local")
            || host.ends_with(".internal")
        {
            return true;
        }
    }

    false
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_scraper() -> HttpScraper {
        HttpScraper::new(&ScrapeConfig::default())
            .expect("build scraper")
            .allow_localhost()
    }

    #[test]
    fn ssrf_blocks_file_scheme() {
        let url = Url::parse("file:///etc/passwd").unwrap();
        assert!(is_ssrf_target(&url));
    }

    #[test]
    fn ssrf_blocks_private_targets() {
        for bad in [
            "http://192.168.1.1/admin",
            "http://10.0.0.1/",
            "http://127.0.0.1:8080/",
            "http://localhost:3000/api",
        ] {
            assert!(is_ssrf_target(&Url::parse(bad).unwrap()), "{bad}");
        }
    }

    #[test]
    fn ssrf_allows_public_hosts() {
        let url = Url::parse("https://docs.example.com/page").unwrap();
        assert!(!is_ssrf_target(&url));
    }

    #[tokio::test]
    async fn scrape_extracts_snapshot() {
        let server = wiremock::MockServer::start().await;
        let page = r#"<html><head><title>Tab</title></head><body>
            <nav><p>Menu</p></nav>
            <main>
                <h1>Release Notes</h1>
                <p>Version 2.0 ships async support.</p>
            </main>
        </body></html>"#;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/notes"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(page))
            .mount(&server)
            .await;

        let scraper = test_scraper();
        let url = format!("{}/notes", server.uri());
        let snapshot = scraper.scrape(&url).await.expect("scrape");

        assert_eq!(snapshot.url, url);
        assert_eq!(snapshot.title.as_deref(), Some("Release Notes"));
        assert!(snapshot.markdown.contains("# Release Notes"));
        assert!(snapshot.markdown.contains("async support"));
        assert!(!snapshot.markdown.contains("Menu"));
    }

    #[tokio::test]
    async fn scrape_http_error_is_scrape_error() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/gone"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let scraper = test_scraper();
        let result = scraper.scrape(&format!("{}/gone", server.uri())).await;
        match result {
            Err(DocforgeError::Scrape(msg)) => assert!(msg.contains("404")),
            other => panic!("expected scrape error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn scrape_empty_page_is_error() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/empty"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string("<html><body></body></html>"),
            )
            .mount(&server)
            .await;

        let scraper = test_scraper();
        let result = scraper.scrape(&format!("{}/empty", server.uri())).await;
        assert!(matches!(result, Err(DocforgeError::Scrape(_))));
    }
}
