//! Load pipeline: source → (snapshot cache | download) → normalized table.
//!
//! The full-table download is memoized in the local database. A snapshot
//! younger than the configured TTL is served without touching the network;
//! when a download fails, the newest snapshot (however old) is served instead.

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{info, instrument, warn};

use tenderpilot_dataset::{DatasetSource, FetchOptions, fetch_csv, parse_tenders};
use tenderpilot_shared::{AppConfig, Result, TenderTable};
use tenderpilot_storage::{Snapshot, Storage};

/// Snapshots retained per source after a successful download.
const SNAPSHOTS_KEPT: u32 = 3;

/// Inputs to [`load_tenders`].
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Where to read the CSV from.
    pub source: DatasetSource,
    /// HTTP settings.
    pub fetch: FetchOptions,
    /// Maximum age of a snapshot served without re-downloading.
    pub cache_ttl: chrono::Duration,
    /// Skip the fresh-snapshot shortcut.
    pub force_refresh: bool,
}

impl LoadOptions {
    /// Build options from config; `file` overrides the configured URL.
    pub fn from_config(
        config: &AppConfig,
        file: Option<PathBuf>,
        force_refresh: bool,
    ) -> Result<Self> {
        let source = match file {
            Some(path) => DatasetSource::File(path),
            None => DatasetSource::url(&config.dataset.url)?,
        };
        Ok(Self {
            source,
            fetch: FetchOptions::from(&config.dataset),
            cache_ttl: ttl_from_minutes(config.dataset.cache_ttl_minutes),
            force_refresh,
        })
    }
}

/// TTLs beyond what `TimeDelta` can hold saturate to "never expires".
fn ttl_from_minutes(minutes: u64) -> chrono::Duration {
    i64::try_from(minutes)
        .ok()
        .and_then(chrono::Duration::try_minutes)
        .unwrap_or(chrono::TimeDelta::MAX)
}

/// Where the returned table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    /// Freshly downloaded.
    Network,
    /// A snapshot within the TTL.
    Cache,
    /// The download failed; an expired snapshot was used.
    StaleCache,
    /// A local file.
    File,
}

impl fmt::Display for LoadOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "downloaded"),
            Self::Cache => write!(f, "cached"),
            Self::StaleCache => write!(f, "stale cache (download failed)"),
            Self::File => write!(f, "local file"),
        }
    }
}

/// Result of [`load_tenders`].
#[derive(Debug)]
pub struct LoadOutcome {
    /// The normalized table.
    pub table: TenderTable,
    /// Where it came from.
    pub origin: LoadOrigin,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting load status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the load completes.
    fn done(&self, outcome: &LoadOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _outcome: &LoadOutcome) {}
}

/// Load the tender table.
///
/// 1. Local file: read and parse, no caching
/// 2. Fresh snapshot (unless forced): parse it
/// 3. Download, store snapshot, prune old ones, parse
/// 4. Download failed: fall back to the newest snapshot, else error
#[instrument(skip_all, fields(source = %opts.source, force = opts.force_refresh))]
pub async fn load_tenders(
    opts: &LoadOptions,
    storage: Option<&Storage>,
    progress: &dyn ProgressReporter,
) -> Result<LoadOutcome> {
    let start = Instant::now();

    let (table, origin) = match &opts.source {
        DatasetSource::File(_) => {
            progress.phase("Reading local dataset");
            let text = fetch_csv(&opts.source, &opts.fetch).await?;
            progress.phase("Normalizing columns");
            let table = parse_tenders(&text, &opts.source.to_string(), Utc::now())?;
            (table, LoadOrigin::File)
        }
        DatasetSource::Url(url) => {
            let key = url.as_str();

            let fresh = match (opts.force_refresh, storage) {
                (false, Some(storage)) => newest_snapshot(storage, key)
                    .await
                    .filter(|s| s.age(Utc::now()) < opts.cache_ttl),
                _ => None,
            };

            match fresh {
                Some(snapshot) => {
                    info!(fetched_at = %snapshot.fetched_at, "serving cached snapshot");
                    progress.phase("Normalizing columns");
                    let table = parse_tenders(&snapshot.body, key, snapshot.fetched_at)?;
                    (table, LoadOrigin::Cache)
                }
                None => {
                    progress.phase("Downloading tender notices");
                    match fetch_csv(&opts.source, &opts.fetch).await {
                        Ok(text) => {
                            let fetched_at = Utc::now();
                            if let Some(storage) = storage {
                                store_snapshot(storage, key, &text, fetched_at).await;
                            }
                            progress.phase("Normalizing columns");
                            let table = parse_tenders(&text, key, fetched_at)?;
                            (table, LoadOrigin::Network)
                        }
                        Err(e) => {
                            let stale = match storage {
                                Some(storage) => newest_snapshot(storage, key).await,
                                None => None,
                            };
                            let Some(snapshot) = stale else {
                                return Err(e);
                            };
                            warn!(
                                error = %e,
                                fetched_at = %snapshot.fetched_at,
                                "download failed, serving stale snapshot"
                            );
                            progress.phase("Normalizing columns");
                            let table = parse_tenders(&snapshot.body, key, snapshot.fetched_at)?;
                            (table, LoadOrigin::StaleCache)
                        }
                    }
                }
            }
        }
    };

    let outcome = LoadOutcome {
        table,
        origin,
        elapsed: start.elapsed(),
    };

    info!(
        rows = outcome.table.len(),
        origin = %outcome.origin,
        elapsed_ms = outcome.elapsed.as_millis() as u64,
        "tender table loaded"
    );
    progress.done(&outcome);

    Ok(outcome)
}

/// Newest snapshot, treating storage errors as a miss.
async fn newest_snapshot(storage: &Storage, key: &str) -> Option<Snapshot> {
    match storage.latest_snapshot(key).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(error = %e, "snapshot lookup failed");
            None
        }
    }
}

/// Persist a download. Failures only cost the cache, so they are logged.
async fn store_snapshot(storage: &Storage, key: &str, body: &str, at: chrono::DateTime<Utc>) {
    if let Err(e) = storage.insert_snapshot(key, body, at).await {
        warn!(error = %e, "failed to store dataset snapshot");
        return;
    }
    match storage.prune_snapshots(key, SNAPSHOTS_KEPT).await {
        Ok(0) => {}
        Ok(removed) => info!(removed, "pruned old snapshots"),
        Err(e) => warn!(error = %e, "failed to prune snapshots"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const FIXTURE: &str = "../../../fixtures/csv/tenders.fixture.csv";

    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("tp_core_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn url_opts(uri: &str, force_refresh: bool) -> LoadOptions {
        LoadOptions {
            source: DatasetSource::url(&format!("{uri}/tenders.csv")).unwrap(),
            fetch: FetchOptions::default(),
            cache_ttl: chrono::Duration::minutes(60),
            force_refresh,
        }
    }

    async fn serve_fixture(server: &wiremock::MockServer, expected_calls: u64) {
        let body = std::fs::read_to_string(FIXTURE).expect("read fixture");
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/tenders.csv"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(body))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[test]
    fn options_from_config() {
        let config = AppConfig::default();
        let opts = LoadOptions::from_config(&config, None, false).unwrap();
        assert!(opts.source.is_remote());
        assert_eq!(opts.cache_ttl, chrono::Duration::minutes(60));

        let opts = LoadOptions::from_config(&config, Some(PathBuf::from(FIXTURE)), true).unwrap();
        assert!(!opts.source.is_remote());
        assert!(opts.force_refresh);
    }

    #[test]
    fn huge_cache_ttl_saturates() {
        let mut config = AppConfig::default();
        config.dataset.cache_ttl_minutes = 200_000_000_000_000;
        let opts = LoadOptions::from_config(&config, None, false).unwrap();
        assert_eq!(opts.cache_ttl, chrono::TimeDelta::MAX);

        config.dataset.cache_ttl_minutes = u64::MAX;
        let opts = LoadOptions::from_config(&config, None, false).unwrap();
        assert_eq!(opts.cache_ttl, chrono::TimeDelta::MAX);

        config.dataset.cache_ttl_minutes = 0;
        let opts = LoadOptions::from_config(&config, None, false).unwrap();
        assert_eq!(opts.cache_ttl, chrono::Duration::zero());
    }

    #[tokio::test]
    async fn loads_local_file() {
        let opts = LoadOptions {
            source: DatasetSource::File(PathBuf::from(FIXTURE)),
            fetch: FetchOptions::default(),
            cache_ttl: chrono::Duration::minutes(60),
            force_refresh: false,
        };
        let outcome = load_tenders(&opts, None, &SilentProgress).await.unwrap();
        assert_eq!(outcome.origin, LoadOrigin::File);
        assert_eq!(outcome.table.len(), 5);
    }

    #[tokio::test]
    async fn second_load_hits_snapshot() {
        let server = wiremock::MockServer::start().await;
        serve_fixture(&server, 1).await;
        let storage = test_storage().await;
        let opts = url_opts(&server.uri(), false);

        let first = load_tenders(&opts, Some(&storage), &SilentProgress).await.unwrap();
        assert_eq!(first.origin, LoadOrigin::Network);

        let second = load_tenders(&opts, Some(&storage), &SilentProgress).await.unwrap();
        assert_eq!(second.origin, LoadOrigin::Cache);
        assert_eq!(second.table.len(), first.table.len());
    }

    #[tokio::test]
    async fn force_refresh_downloads_again() {
        let server = wiremock::MockServer::start().await;
        serve_fixture(&server, 2).await;
        let storage = test_storage().await;

        load_tenders(&url_opts(&server.uri(), false), Some(&storage), &SilentProgress)
            .await
            .unwrap();
        let forced = load_tenders(&url_opts(&server.uri(), true), Some(&storage), &SilentProgress)
            .await
            .unwrap();
        assert_eq!(forced.origin, LoadOrigin::Network);
    }

    #[tokio::test]
    async fn failed_download_serves_stale_snapshot() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let storage = test_storage().await;
        let opts = url_opts(&server.uri(), false);
        let body = std::fs::read_to_string(FIXTURE).unwrap();
        let old = Utc::now() - chrono::Duration::days(2);
        storage
            .insert_snapshot(opts.source.to_string().as_str(), &body, old)
            .await
            .unwrap();

        let outcome = load_tenders(&opts, Some(&storage), &SilentProgress).await.unwrap();
        assert_eq!(outcome.origin, LoadOrigin::StaleCache);
        assert_eq!(outcome.table.len(), 5);
        assert_eq!(outcome.table.fetched_at.timestamp(), old.timestamp());
    }

    #[tokio::test]
    async fn failed_download_without_snapshot_errors() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = load_tenders(&url_opts(&server.uri(), false), None, &SilentProgress)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn expired_snapshot_is_downloaded_again() {
        let server = wiremock::MockServer::start().await;
        serve_fixture(&server, 1).await;
        let storage = test_storage().await;
        let opts = url_opts(&server.uri(), false);

        let body = std::fs::read_to_string(FIXTURE).unwrap();
        let old = Utc::now() - chrono::Duration::days(2);
        storage
            .insert_snapshot(opts.source.to_string().as_str(), &body, old)
            .await
            .unwrap();

        let outcome = load_tenders(&opts, Some(&storage), &SilentProgress).await.unwrap();
        assert_eq!(outcome.origin, LoadOrigin::Network);
        assert!(outcome.table.fetched_at > old);
    }

    #[tokio::test]
    async fn download_prunes_to_three_snapshots() {
        let server = wiremock::MockServer::start().await;
        serve_fixture(&server, 1).await;
        let storage = test_storage().await;
        let opts = url_opts(&server.uri(), true);
        let key = opts.source.to_string();

        for days in 1..=5 {
            let at = Utc::now() - chrono::Duration::days(days);
            storage
                .insert_snapshot(&key, &format!("referenceNumber\nOLD-{days}\n"), at)
                .await
                .unwrap();
        }

        let outcome = load_tenders(&opts, Some(&storage), &SilentProgress).await.unwrap();
        assert_eq!(outcome.origin, LoadOrigin::Network);

        // Six stored, three pruned by the load; pruning to three again is a no-op.
        assert_eq!(storage.prune_snapshots(&key, SNAPSHOTS_KEPT).await.unwrap(), 0);
        assert_eq!(storage.prune_snapshots(&key, 2).await.unwrap(), 1);

        let newest = storage.latest_snapshot(&key).await.unwrap().unwrap();
        assert!(newest.body.starts_with("referenceNumber"));
        assert!(!newest.body.contains("OLD-"));
    }

    #[tokio::test]
    async fn oversized_download_is_rejected() {
        let server = wiremock::MockServer::start().await;
        serve_fixture(&server, 1).await;
        let mut opts = url_opts(&server.uri(), false);
        opts.fetch.max_bytes = 64;

        let err = load_tenders(&opts, None, &SilentProgress).await.unwrap_err();
        assert!(err.to_string().contains("too large"));
    }
}
