use std::time::{Duration, Instant};

use reqwest::StatusCode;
use tracing::{debug, warn};
use url::Url;

use crate::error::FetchError;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Everything the collectors need from the network, already reduced to owned
/// values. `None` means the corresponding request did not complete.
#[derive(Debug, Clone, Default)]
pub struct PageSnapshot {
    pub html: Option<String>,
    pub ttfb: Option<Duration>,
    pub robots_status: Option<u16>,
    pub sitemap_status: Option<u16>,
}

#[derive(Debug)]
struct FetchedPage {
    ttfb: Duration,
    body: Option<String>,
}

pub struct Fetcher {
    client: reqwest::Client,
    probe_timeout: Duration,
}

impl Fetcher {
    pub fn new(fetch_timeout: Duration, probe_timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(fetch_timeout)
            .build()?;

        Ok(Self {
            client,
            probe_timeout,
        })
    }

    /// Fetches the homepage and probes `robots.txt` and `sitemap.xml`
    /// concurrently. Failures are logged and left as `None`.
    pub async fn snapshot(&self, website_url: &str) -> PageSnapshot {
        let (page, robots, sitemap) = tokio::join!(
            self.fetch_page(website_url),
            self.probe_root(website_url, "robots.txt"),
            self.probe_root(website_url, "sitemap.xml"),
        );

        let (html, ttfb) = match page {
            Ok(page) => (page.body, Some(page.ttfb)),
            Err(err) => {
                warn!(url = website_url, error = %err, "Homepage fetch failed");
                (None, None)
            }
        };

        PageSnapshot {
            html,
            ttfb,
            robots_status: robots.ok(),
            sitemap_status: sitemap.ok(),
        }
    }

    async fn fetch_page(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let started = Instant::now();
        let resp = self.client.get(url).send().await?;
        let ttfb = started.elapsed();
        let status = resp.status();

        let body = if status == StatusCode::OK {
            Some(resp.text().await?)
        } else {
            debug!(url, status = status.as_u16(), "Homepage returned non-200");
            None
        };

        debug!(
            url,
            status = status.as_u16(),
            ttfb_ms = ttfb.as_millis() as u64,
            "Fetched homepage"
        );

        Ok(FetchedPage { ttfb, body })
    }

    async fn probe_root(&self, website_url: &str, file: &str) -> Result<u16, FetchError> {
        let target = root_resource(website_url, file)?;
        let result = self
            .client
            .get(target.as_str())
            .timeout(self.probe_timeout)
            .send()
            .await;

        match result {
            Ok(resp) => Ok(resp.status().as_u16()),
            Err(err) => {
                debug!(url = %target, error = %err, "Probe failed");
                Err(err.into())
            }
        }
    }
}

/// Resolves `file` against the site root, ignoring any path on the audited URL.
pub fn root_resource(website_url: &str, file: &str) -> Result<Url, FetchError> {
    let base = Url::parse(website_url)?;
    Ok(base.join(&format!("/{file}"))?)
}
