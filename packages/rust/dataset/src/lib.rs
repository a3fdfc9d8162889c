//! Tender dataset download and normalization.
//!
//! The dataset is a single CSV published on open.canada.ca. This crate
//! fetches it (or reads a local copy), maps its loosely-named headers onto
//! [`ColumnRole`](tenderpilot_shared::ColumnRole)s and fills placeholders for
//! anything missing.

mod columns;
mod normalize;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use tenderpilot_shared::{BROWSER_USER_AGENT, DatasetConfig, Result, TenderPilotError};
use tracing::{debug, info, instrument};
use url::Url;

pub use columns::{detect as detect_columns, normalize_header};
pub use normalize::{normalize_row, parse_date, parse_tenders};

/// Maximum number of redirects to follow when downloading.
const MAX_REDIRECTS: usize = 5;

/// Default cap on the response body (200 MB).
pub const MAX_RESPONSE_SIZE: u64 = 200 * 1024 * 1024;

/// User-Agent string for dataset requests.
const USER_AGENT: &str = concat!("TenderPilot/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// DatasetSource
// ---------------------------------------------------------------------------

/// Where the CSV comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    /// Remote CSV over HTTP(S).
    Url(Url),
    /// Local CSV file.
    File(PathBuf),
}

impl DatasetSource {
    /// Parse a URL string into a remote source.
    pub fn url(raw: &str) -> Result<Self> {
        let url = Url::parse(raw)
            .map_err(|e| TenderPilotError::validation(format!("invalid dataset URL '{raw}': {e}")))?;
        match url.scheme() {
            "http" | "https" => Ok(Self::Url(url)),
            other => Err(TenderPilotError::validation(format!(
                "unsupported dataset URL scheme '{other}'"
            ))),
        }
    }

    /// Whether the source is a remote URL.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Url(_))
    }
}

impl fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(u) => write!(f, "{u}"),
            Self::File(p) => write!(f, "{}", p.display()),
        }
    }
}

// ---------------------------------------------------------------------------
// Fetch options
// ---------------------------------------------------------------------------

/// HTTP settings for the download.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Timeout for the whole request, in seconds.
    pub timeout_secs: u64,
    /// User-Agent header value.
    pub user_agent: String,
    /// Downloads with a larger body are rejected.
    pub max_bytes: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            user_agent: USER_AGENT.to_string(),
            max_bytes: MAX_RESPONSE_SIZE,
        }
    }
}

impl From<&DatasetConfig> for FetchOptions {
    fn from(config: &DatasetConfig) -> Self {
        let user_agent = match (&config.user_agent, config.spoof_user_agent) {
            (Some(ua), _) => ua.clone(),
            (None, true) => BROWSER_USER_AGENT.to_string(),
            (None, false) => USER_AGENT.to_string(),
        };
        Self {
            timeout_secs: config.timeout_secs,
            user_agent,
            max_bytes: MAX_RESPONSE_SIZE,
        }
    }
}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

/// Read the raw CSV text from `source`.
#[instrument(skip_all, fields(source = %source))]
pub async fn fetch_csv(source: &DatasetSource, opts: &FetchOptions) -> Result<String> {
    let body = match source {
        DatasetSource::File(path) => {
            debug!("reading local dataset");
            tokio::fs::read(path)
                .await
                .map_err(|e| TenderPilotError::io(path, e))?
        }
        DatasetSource::Url(url) => {
            let client = build_client(opts)?;
            download(&client, url, opts.max_bytes).await?
        }
    };

    let text = String::from_utf8_lossy(&body);
    let text = text.trim_start_matches('\u{feff}').to_string();
    info!(bytes = body.len(), "dataset fetched");
    Ok(text)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a reqwest client with appropriate settings.
fn build_client(opts: &FetchOptions) -> Result<Client> {
    Client::builder()
        .user_agent(opts.user_agent.as_str())
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(Duration::from_secs(opts.timeout_secs))
        .build()
        .map_err(|e| TenderPilotError::Network(format!("failed to build HTTP client: {e}")))
}

/// GET a URL, enforcing status and size limits.
///
/// `Content-Length` is only a hint: chunked responses carry none, so the
/// body is read chunk by chunk and abandoned once it passes `max_bytes`.
async fn download(client: &Client, url: &Url, max_bytes: u64) -> Result<Vec<u8>> {
    let mut response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| TenderPilotError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(TenderPilotError::Network(format!("{url}: HTTP {status}")));
    }

    let too_large = |len: u64| {
        TenderPilotError::validation(format!(
            "{url}: response too large ({len} bytes, max {max_bytes})"
        ))
    };

    if let Some(len) = response.content_length() {
        if len > max_bytes {
            return Err(too_large(len));
        }
    }

    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| TenderPilotError::Network(format!("{url}: failed to read body: {e}")))?
    {
        let total = (body.len() + chunk.len()) as u64;
        if total > max_bytes {
            return Err(too_large(total));
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = "../../../fixtures/csv/tenders.fixture.csv";

    #[test]
    fn source_from_url() {
        let src = DatasetSource::url("https://open.canada.ca/data.csv").unwrap();
        assert!(src.is_remote());
        assert!(DatasetSource::url("ftp://example.com/a.csv").is_err());
        assert!(DatasetSource::url("not a url").is_err());
    }

    #[test]
    fn fetch_options_user_agent() {
        let mut config = DatasetConfig::default();
        assert!(FetchOptions::from(&config).user_agent.starts_with("TenderPilot/"));

        config.spoof_user_agent = true;
        assert_eq!(FetchOptions::from(&config).user_agent, BROWSER_USER_AGENT);

        config.user_agent = Some("custom-agent".into());
        assert_eq!(FetchOptions::from(&config).user_agent, "custom-agent");
    }

    #[tokio::test]
    async fn fetch_local_file() {
        let src = DatasetSource::File(PathBuf::from(FIXTURE));
        let text = fetch_csv(&src, &FetchOptions::default()).await.unwrap();
        assert!(text.starts_with("referenceNumber"));
    }

    #[tokio::test]
    async fn fetch_missing_file() {
        let src = DatasetSource::File(PathBuf::from("does/not/exist.csv"));
        let err = fetch_csv(&src, &FetchOptions::default()).await.unwrap_err();
        assert!(matches!(err, TenderPilotError::Io { .. }));
    }

    #[tokio::test]
    async fn fetch_with_mock_server() {
        let server = wiremock::MockServer::start().await;
        let body = std::fs::read_to_string(FIXTURE).expect("read fixture");

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/tenders.csv"))
            .and(wiremock::matchers::header("user-agent", BROWSER_USER_AGENT))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string(format!("\u{feff}{body}")),
            )
            .mount(&server)
            .await;

        let src = DatasetSource::url(&format!("{}/tenders.csv", server.uri())).unwrap();
        let opts = FetchOptions {
            user_agent: BROWSER_USER_AGENT.into(),
            ..FetchOptions::default()
        };
        let text = fetch_csv(&src, &opts).await.unwrap();
        assert!(text.starts_with("referenceNumber"));

        let table = parse_tenders(&text, &src.to_string(), chrono::Utc::now()).unwrap();
        assert_eq!(table.len(), 5);
    }

    #[tokio::test]
    async fn fetch_http_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let src = DatasetSource::url(&format!("{}/tenders.csv", server.uri())).unwrap();
        let err = fetch_csv(&src, &FetchOptions::default()).await.unwrap_err();
        assert!(matches!(err, TenderPilotError::Network(_)));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn fetch_rejects_oversized_body() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("x".repeat(4096)))
            .mount(&server)
            .await;

        let src = DatasetSource::url(&format!("{}/tenders.csv", server.uri())).unwrap();
        let opts = FetchOptions {
            max_bytes: 1024,
            ..FetchOptions::default()
        };
        let err = fetch_csv(&src, &opts).await.unwrap_err();
        assert!(matches!(err, TenderPilotError::Validation { .. }));
        assert!(err.to_string().contains("too large"));

        // A body exactly at the limit is accepted.
        let opts = FetchOptions {
            max_bytes: 4096,
            ..FetchOptions::default()
        };
        assert_eq!(fetch_csv(&src, &opts).await.unwrap().len(), 4096);
    }
}
