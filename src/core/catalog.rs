//! Catalog gateway - where blocks of video items come from

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{NmtvError, Result};
use crate::types::{Channel, FetchRequest, VideoBlock, VideoItem};

/// Backend the engine pulls blocks from and reports dead items to.
///
/// Implementations bound their own latency; the engine imposes no timeouts.
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Fetch one block for `request.channel`
    async fn fetch_block(&self, request: &FetchRequest) -> Result<VideoBlock>;

    /// Tell the backend an item cannot be played
    async fn report_unavailable(&self, video_id: &str, error_code: Option<u16>) -> Result<()>;

    /// Release year for a "<artist> <song>" or title query
    async fn lookup_year(&self, title: &str) -> Result<Option<u16>>;
}

// ============================================
// HTTP backend
// ============================================

#[derive(Debug, Deserialize)]
struct YearResponse {
    year: Option<u16>,
}

/// Catalog backed by the nmtv HTTP API
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCatalog {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Build the year lookup URL
fn build_year_url(base_url: &str, title: &str) -> String {
    format!(
        "{}/video/year?title={}",
        base_url,
        urlencoding::encode(title)
    )
}

/// Decode HTML entities the catalog leaves in scraped titles
fn decode_item(mut item: VideoItem) -> VideoItem {
    let decode = |s: String| html_escape::decode_html_entities(&s).to_string();
    item.artist = item.artist.map(decode);
    item.song = item.song.map(decode);
    item.title = item.title.map(decode);
    item
}

fn ensure_success(response: &reqwest::Response, url: &str) -> Result<()> {
    if !response.status().is_success() {
        return Err(NmtvError::Network(format!(
            "HTTP {}: {}",
            response.status(),
            url
        )));
    }
    Ok(())
}

#[async_trait]
impl CatalogGateway for HttpCatalog {
    async fn fetch_block(&self, request: &FetchRequest) -> Result<VideoBlock> {
        let url = self.url(&format!("/channel/{}/next", request.channel));
        debug!(%url, prefer_custom = request.prefer_custom, "fetching block");

        let response = self.client.post(&url).json(request).send().await?;
        ensure_success(&response, &url)?;

        let mut block: VideoBlock = response.json().await?;
        if block.playlist_id.is_empty() {
            return Err(NmtvError::Catalog(format!(
                "block for {} has no playlist id",
                request.channel
            )));
        }
        block.items = block.items.into_iter().map(decode_item).collect();
        Ok(block)
    }

    async fn report_unavailable(&self, video_id: &str, error_code: Option<u16>) -> Result<()> {
        let url = self.url("/video/unavailable");
        let body = serde_json::json!({ "videoId": video_id, "errorCode": error_code });

        let response = self.client.post(&url).json(&body).send().await?;
        ensure_success(&response, &url)
    }

    async fn lookup_year(&self, title: &str) -> Result<Option<u16>> {
        let url = build_year_url(&self.base_url, title);
        let response = self.client.get(&url).send().await?;
        ensure_success(&response, &url)?;

        let parsed: YearResponse = response.json().await?;
        Ok(parsed.year)
    }
}

// ============================================
// In-memory backend
// ============================================

/// Catalog held in memory. Backs `--offline` and the test suites.
///
/// Honors `prefer_custom` when the request names user playlists it knows,
/// avoids excluded playlists while any alternative remains, and strips
/// excluded item ids unless that would leave the block empty.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    curated: HashMap<Channel, Vec<VideoBlock>>,
    user: HashMap<String, VideoBlock>,
    years: HashMap<String, u16>,
    requests: Mutex<Vec<FetchRequest>>,
    reported: Mutex<Vec<(String, Option<u16>)>>,
    failing: AtomicBool,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_curated(mut self, channel: Channel, block: VideoBlock) -> Self {
        self.curated.entry(channel).or_default().push(block);
        self
    }

    pub fn with_user_playlist(mut self, block: VideoBlock) -> Self {
        self.user.insert(block.playlist_id.clone(), block);
        self
    }

    pub fn with_year(mut self, title: &str, year: u16) -> Self {
        self.years.insert(title.to_string(), year);
        self
    }

    /// Make every call fail with a network error until switched back
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every block request seen so far
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// Every unavailable report seen so far
    pub fn reported(&self) -> Vec<(String, Option<u16>)> {
        self.reported
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    fn check_online(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NmtvError::Network("catalog offline".into()));
        }
        Ok(())
    }

    /// A small built-in lineup for running without a backend
    pub fn demo() -> Self {
        let bumpers = [("4Xrm1Akt7qY", "Station Ident"), ("-OIa6fckuYU", "Channel Ident")];
        let lineup: [(Channel, &str, &[(&str, &str, &str, f64)]); 4] = [
            (
                Channel::Rock,
                "Top Rock Of All Time",
                &[
                    ("fJ9rUzIMcZQ", "Queen", "Bohemian Rhapsody", 367.0),
                    ("eVTXPUF4Oz4", "Linkin Park", "In The End", 218.0),
                    ("hTWKbfoikeg", "Nirvana", "Smells Like Teen Spirit", 301.0),
                    ("CD-E-LDc384", "Guns N Roses", "Sweet Child O Mine", 356.0),
                    ("DhlPAj38rHc", "Metallica", "One", 446.0),
                    ("pAgnJDJN4VA", "AC/DC", "Back In Black", 255.0),
                ],
            ),
            (
                Channel::HipHop,
                "Base Classics",
                &[
                    ("rMbATaj7Il8", "Eminem", "Lose Yourself", 326.0),
                    ("fKopy74weus", "Coolio", "Gangsta's Paradise", 240.0),
                    ("UqyT8IEBkvY", "50 Cent", "In Da Club", 247.0),
                    ("_JZom_gVfuw", "Eminem", "Stan", 484.0),
                ],
            ),
            (
                Channel::Decade1990s,
                "Nineties Rotation",
                &[
                    ("hTWKbfoikeg", "Nirvana", "Smells Like Teen Spirit", 301.0),
                    ("fKopy74weus", "Coolio", "Gangsta's Paradise", 240.0),
                    ("1w7OgIMMRc4", "Eurythmics", "Sweet Dreams", 216.0),
                    ("eBG7P-K-r1Y", "Foo Fighters", "Everlong", 250.0),
                ],
            ),
            (
                Channel::Decade1980s,
                "Eighties Rotation",
                &[
                    ("Zi_XLOBDo_Y", "Michael Jackson", "Billie Jean", 294.0),
                    ("1w7OgIMMRc4", "Eurythmics", "Sweet Dreams", 216.0),
                    ("rY0WxgSXdEE", "Queen", "Another One Bites The Dust", 215.0),
                ],
            ),
        ];

        let mut catalog = Self::new();
        for (channel, label, songs) in lineup {
            let mut items = Vec::new();
            for (i, (id, artist, song, duration)) in songs.iter().enumerate() {
                if i % 2 == 0 {
                    let (bid, btitle) = bumpers[(i / 2) % bumpers.len()];
                    items.push(VideoItem {
                        id: bid.to_string(),
                        title: Some(btitle.to_string()),
                        duration: Some(8.0),
                        is_bumper: true,
                        ..Default::default()
                    });
                }
                items.push(VideoItem {
                    id: id.to_string(),
                    artist: Some(artist.to_string()),
                    song: Some(song.to_string()),
                    duration: Some(*duration),
                    ..Default::default()
                });
            }
            catalog = catalog.with_curated(
                channel,
                VideoBlock {
                    playlist_id: format!("demo-{}", channel),
                    playlist_label: label.to_string(),
                    items,
                },
            );
        }
        catalog
    }
}

/// First block whose playlist is not excluded, else the first block
fn pick_block<'a>(pool: &[&'a VideoBlock], excluded: &[String]) -> Option<&'a VideoBlock> {
    pool.iter()
        .find(|b| !excluded.contains(&b.playlist_id))
        .or_else(|| pool.first())
        .copied()
}

#[async_trait]
impl CatalogGateway for MemoryCatalog {
    async fn fetch_block(&self, request: &FetchRequest) -> Result<VideoBlock> {
        if let Ok(mut log) = self.requests.lock() {
            log.push(request.clone());
        }
        self.check_online()?;

        let user_pool: Vec<&VideoBlock> = request
            .custom_playlist_ids
            .iter()
            .filter_map(|id| self.user.get(id))
            .collect();
        let curated_pool: Vec<&VideoBlock> = self
            .curated
            .get(&request.channel)
            .map(|blocks| blocks.iter().collect())
            .unwrap_or_default();

        let chosen = if request.prefer_custom && !user_pool.is_empty() {
            pick_block(&user_pool, &request.exclude_playlist_ids)
        } else {
            pick_block(&curated_pool, &request.exclude_playlist_ids)
                .or_else(|| pick_block(&user_pool, &request.exclude_playlist_ids))
        };

        let Some(block) = chosen else {
            return Err(NmtvError::EmptyBlock(request.channel));
        };

        let fresh: Vec<VideoItem> = block
            .items
            .iter()
            .filter(|item| !request.exclude_ids.contains(&item.id))
            .cloned()
            .collect();

        Ok(VideoBlock {
            playlist_id: block.playlist_id.clone(),
            playlist_label: block.playlist_label.clone(),
            items: if fresh.is_empty() {
                block.items.clone()
            } else {
                fresh
            },
        })
    }

    async fn report_unavailable(&self, video_id: &str, error_code: Option<u16>) -> Result<()> {
        self.check_online()?;
        if let Ok(mut log) = self.reported.lock() {
            log.push((video_id.to_string(), error_code));
        }
        Ok(())
    }

    async fn lookup_year(&self, title: &str) -> Result<Option<u16>> {
        self.check_online()?;
        Ok(self.years.get(title).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(id: &str, items: &[&str]) -> VideoBlock {
        VideoBlock {
            playlist_id: id.into(),
            playlist_label: format!("{} label", id),
            items: items
                .iter()
                .map(|i| VideoItem {
                    id: i.to_string(),
                    ..Default::default()
                })
                .collect(),
        }
    }

    fn request(prefer_custom: bool, custom: &[&str]) -> FetchRequest {
        FetchRequest {
            channel: Channel::Rock,
            exclude_ids: Vec::new(),
            exclude_playlist_ids: Vec::new(),
            custom_playlist_ids: custom.iter().map(|s| s.to_string()).collect(),
            prefer_custom,
        }
    }

    #[test]
    fn test_build_year_url() {
        let url = build_year_url("http://x/api", "AC/DC Back In Black");
        assert_eq!(url, "http://x/api/video/year?title=AC%2FDC%20Back%20In%20Black");
    }

    #[test]
    fn test_decode_item_entities() {
        let item = decode_item(VideoItem {
            id: "a".into(),
            artist: Some("Guns N&#39; Roses".into()),
            title: Some("Rock &amp; Roll".into()),
            ..Default::default()
        });
        assert_eq!(item.artist.as_deref(), Some("Guns N' Roses"));
        assert_eq!(item.title.as_deref(), Some("Rock & Roll"));
    }

    #[test]
    fn test_http_catalog_trims_base() {
        let catalog = HttpCatalog::new("http://host/api/");
        assert_eq!(catalog.url("/ready"), "http://host/api/ready");
    }

    #[tokio::test]
    async fn test_memory_prefers_user_pool_when_asked() {
        let catalog = MemoryCatalog::new()
            .with_curated(Channel::Rock, block("cur", &["a"]))
            .with_user_playlist(block("PLmine", &["b"]));

        let got = catalog.fetch_block(&request(true, &["PLmine"])).await.unwrap();
        assert_eq!(got.playlist_id, "PLmine");
        let got = catalog.fetch_block(&request(false, &["PLmine"])).await.unwrap();
        assert_eq!(got.playlist_id, "cur");
        assert_eq!(catalog.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_memory_skips_excluded_items_and_playlists() {
        let catalog = MemoryCatalog::new()
            .with_curated(Channel::Rock, block("one", &["a", "b"]))
            .with_curated(Channel::Rock, block("two", &["c", "d"]));

        let mut req = request(false, &[]);
        req.exclude_playlist_ids = vec!["one".into()];
        req.exclude_ids = vec!["c".into()];
        let got = catalog.fetch_block(&req).await.unwrap();
        assert_eq!(got.playlist_id, "two");
        assert_eq!(got.items.len(), 1);
        assert_eq!(got.items[0].id, "d");
    }

    #[tokio::test]
    async fn test_memory_failing_and_unknown_channel() {
        let catalog = MemoryCatalog::new();
        let err = catalog.fetch_block(&request(false, &[])).await.unwrap_err();
        assert!(matches!(err, NmtvError::EmptyBlock(Channel::Rock)));

        catalog.set_failing(true);
        assert!(catalog.report_unavailable("x", Some(150)).await.is_err());
        assert!(catalog.reported().is_empty());
    }

    #[tokio::test]
    async fn test_demo_lineup_has_bumpers() {
        let catalog = MemoryCatalog::demo();
        let got = catalog.fetch_block(&request(false, &[])).await.unwrap();
        assert!(got.items[0].is_bumper);
        assert!(got.items.iter().any(|i| !i.is_bumper));
    }
}
