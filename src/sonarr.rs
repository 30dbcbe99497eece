//! Series library manager client.
//!
//! The manager keys its add/lookup endpoints by catalog id but its library
//! listing only by its own secondary id (`tvdbId`), so finding an existing
//! series is always lookup-then-scan.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::debug;

use crate::config::ArrSettings;
use crate::error::{RequestError, Result};

/// Phrase the manager puts in the body when a series is a duplicate.
const ALREADY_ADDED_PHRASE: &str = "already been added";
const EPISODE_SEARCH_COMMAND: &str = "EpisodeSearch";

#[async_trait]
pub trait SeriesLibrary: Send + Sync {
    /// Resolves a catalog id to the manager's lookup record (not yet in the library).
    async fn lookup_by_tmdb(&self, tmdb_id: i32) -> Result<SeriesRecord>;
    async fn find_existing_series(&self, tmdb_id: i32) -> Result<SeriesRecord>;
    /// Returns the manager's internal id of the created series.
    async fn create_series(&self, opts: &CreateSeriesOptions) -> Result<i32>;
    /// Full-record replace.
    async fn update_series(&self, record: &SeriesRecord) -> Result<()>;
    async fn list_episodes(&self, series_id: i32) -> Result<Vec<EpisodeRecord>>;
    /// Accepted means queued, not that anything was found.
    async fn trigger_episode_search(&self, episode_ids: &[i32]) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddOptions {
    pub search_for_missing_episodes: bool,
    pub monitor: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonRecord {
    pub season_number: i32,
    #[serde(default)]
    pub monitored: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A series as the manager sees it. Fields this crate does not model are
/// kept in `extra` so a full-record update does not drop them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesRecord {
    #[serde(default, skip_serializing_if = "is_unset")]
    pub id: i32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tvdb_id: i32,
    #[serde(default)]
    pub title_slug: String,
    #[serde(default)]
    pub quality_profile_id: i32,
    #[serde(default)]
    pub language_profile_id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_folder_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub monitored: bool,
    #[serde(default)]
    pub season_folder: bool,
    #[serde(default)]
    pub series_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_options: Option<AddOptions>,
    #[serde(default)]
    pub seasons: Vec<SeasonRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn is_unset(id: &i32) -> bool {
    *id == 0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeRecord {
    pub id: i32,
    pub season_number: i32,
    pub episode_number: i32,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateSeriesOptions {
    pub tmdb_id: i32,
    pub quality_profile_id: i32,
    pub root_folder: String,
    pub seasons_to_monitor: BTreeSet<i32>,
    pub add_entire_show: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CommandRequest<'a> {
    name: &'static str,
    episode_ids: &'a [i32],
}

impl SeriesRecord {
    /// Monitors every season except specials. Returns whether anything changed.
    pub fn monitor_all_seasons(&mut self) -> bool {
        let mut changed = false;
        for season in self.seasons.iter_mut().filter(|s| s.season_number > 0) {
            changed |= !season.monitored;
            season.monitored = true;
        }
        changed
    }

    /// `None` when the series has no such season; otherwise whether the flag flipped.
    /// Season 0 is found but never monitored.
    pub fn monitor_season(&mut self, season_number: i32) -> Option<bool> {
        let season = self
            .seasons
            .iter_mut()
            .find(|s| s.season_number == season_number)?;
        if season_number == 0 || season.monitored {
            return Some(false);
        }
        season.monitored = true;
        Some(true)
    }

    pub fn monitored_seasons(&self) -> BTreeSet<i32> {
        self.seasons
            .iter()
            .filter(|s| s.monitored)
            .map(|s| s.season_number)
            .collect()
    }
}

/// Turns a lookup record into a create payload for the given options.
pub fn prepare_new_series(
    mut stub: SeriesRecord,
    opts: &CreateSeriesOptions,
    language_profile_id: i32,
) -> SeriesRecord {
    for season in stub.seasons.iter_mut() {
        season.monitored = match season.season_number {
            0 => false,
            n if opts.add_entire_show => n > 0,
            n => opts.seasons_to_monitor.contains(&n),
        };
    }
    let any_monitored = stub.seasons.iter().any(|s| s.monitored);

    stub.quality_profile_id = opts.quality_profile_id;
    stub.language_profile_id = language_profile_id;
    stub.root_folder_path = Some(opts.root_folder.clone());
    stub.monitored = true;
    stub.season_folder = true;
    stub.series_type = "standard".to_string();
    stub.add_options = Some(AddOptions {
        search_for_missing_episodes: any_monitored,
        monitor: "none".to_string(),
    });
    stub
}

/// Maps a failed create response to an error.
///
/// The manager has no structured conflict code, so a duplicate is only
/// recognisable by its message text. If that wording changes upstream,
/// duplicates surface as [`RequestError::Upstream`] instead.
pub fn classify_create_failure(status: u16, body: &str) -> RequestError {
    if body.contains(ALREADY_ADDED_PHRASE) {
        RequestError::AlreadyExists
    } else {
        RequestError::upstream(status, body)
    }
}

#[derive(Debug, Clone)]
pub struct SonarrClient {
    client: Client,
    base_url: String,
    api_key: String,
    language_profile_id: i32,
}

impl SonarrClient {
    pub fn new(settings: &ArrSettings, language_profile_id: i32) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(format!("cinerequest/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: settings.url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            language_profile_id,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v3{}", self.base_url, path)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T> {
        let res = self
            .client
            .get(self.url(path))
            .header("X-Api-Key", &self.api_key)
            .send()
            .await?;
        let status = res.status();
        let text = res.text().await?;
        if status != StatusCode::OK {
            return Err(RequestError::upstream(status.as_u16(), text));
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<(StatusCode, String)> {
        let res = self
            .client
            .request(method, self.url(path))
            .header("X-Api-Key", &self.api_key)
            .json(body)
            .send()
            .await?;
        let status = res.status();
        let text = res.text().await?;
        Ok((status, text))
    }
}

#[async_trait]
impl SeriesLibrary for SonarrClient {
    async fn lookup_by_tmdb(&self, tmdb_id: i32) -> Result<SeriesRecord> {
        let results: Vec<SeriesRecord> = self
            .get_json(&format!("/series/lookup?term=tmdb:{tmdb_id}"))
            .await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| RequestError::not_found(format!("no series found for tmdb id {tmdb_id}")))
    }

    async fn find_existing_series(&self, tmdb_id: i32) -> Result<SeriesRecord> {
        let target = self.lookup_by_tmdb(tmdb_id).await?.tvdb_id;
        let library: Vec<SeriesRecord> = self.get_json("/series").await?;
        debug!(tmdb_id, tvdb_id = target, library_size = library.len(), "Scanning series library");
        library
            .into_iter()
            .find(|s| s.tvdb_id == target)
            .ok_or_else(|| {
                RequestError::not_found(format!(
                    "series with tmdb id {tmdb_id} not found in library"
                ))
            })
    }

    async fn create_series(&self, opts: &CreateSeriesOptions) -> Result<i32> {
        let stub = self.lookup_by_tmdb(opts.tmdb_id).await?;
        let payload = prepare_new_series(stub, opts, self.language_profile_id);
        let (status, text) = self.send_json(Method::POST, "/series", &payload).await?;
        if status != StatusCode::CREATED {
            return Err(classify_create_failure(status.as_u16(), &text));
        }
        let added: SeriesRecord = serde_json::from_str(&text)?;
        Ok(added.id)
    }

    async fn update_series(&self, record: &SeriesRecord) -> Result<()> {
        // The update endpoint rejects add-time options.
        let payload = SeriesRecord {
            add_options: None,
            ..record.clone()
        };
        let (status, text) = self
            .send_json(Method::PUT, &format!("/series/{}", record.id), &payload)
            .await?;
        if status != StatusCode::ACCEPTED {
            return Err(RequestError::upstream(status.as_u16(), text));
        }
        Ok(())
    }

    async fn list_episodes(&self, series_id: i32) -> Result<Vec<EpisodeRecord>> {
        self.get_json(&format!("/episode?seriesId={series_id}"))
            .await
    }

    async fn trigger_episode_search(&self, episode_ids: &[i32]) -> Result<()> {
        let command = CommandRequest {
            name: EPISODE_SEARCH_COMMAND,
            episode_ids,
        };
        let (status, text) = self.send_json(Method::POST, "/command", &command).await?;
        if status != StatusCode::CREATED {
            return Err(RequestError::upstream(status.as_u16(), text));
        }
        Ok(())
    }
}
