use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{RequestError, Result};
use crate::models::{CatalogItem, MediaKind};

const TMDB_BASE: &str = "https://api.themoviedb.org/3";

/// Read-only access to the metadata catalog.
#[async_trait]
pub trait TmdbApi: Send + Sync {
    /// Multi-type search, keeping only movies and shows.
    async fn search(&self, query: &str) -> Result<Vec<CatalogItem>>;
    async fn fetch_show(&self, id: i32) -> Result<ShowDetail>;
    async fn fetch_season(&self, id: i32, season: i32) -> Result<SeasonDetail>;
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowDetail {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub overview: String,
    pub poster_path: Option<String>,
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub number_of_seasons: Option<i32>,
    #[serde(default)]
    pub seasons: Vec<SeasonSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonSummary {
    pub season_number: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub episode_count: i32,
    pub air_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonDetail {
    pub season_number: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub episodes: Vec<EpisodeSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub id: i32,
    pub episode_number: i32,
    pub season_number: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub overview: String,
    pub air_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: i32,
    media_type: Option<String>,
    title: Option<String>,
    name: Option<String>,
    #[serde(default)]
    overview: String,
    poster_path: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
}

impl TmdbClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let user_agent = format!("cinerequest/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: TMDB_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T> {
        let sep = if path.contains('?') { '&' } else { '?' };
        let url = format!(
            "{}{path}{sep}api_key={}",
            self.base_url,
            urlencoding::encode(&self.api_key)
        );
        let res = self.client.get(&url).send().await?;
        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(RequestError::upstream(status.as_u16(), text));
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn search(&self, query: &str) -> Result<Vec<CatalogItem>> {
        let path = format!(
            "/search/multi?query={}&include_adult=false",
            urlencoding::encode(query)
        );
        let data: SearchResponse = self.get_json(&path).await?;
        Ok(filter_hits(data.results))
    }

    async fn fetch_show(&self, id: i32) -> Result<ShowDetail> {
        self.get_json(&format!("/tv/{id}?language=en-US")).await
    }

    async fn fetch_season(&self, id: i32, season: i32) -> Result<SeasonDetail> {
        self.get_json(&format!("/tv/{id}/season/{season}?language=en-US"))
            .await
    }
}

/// Drops people and any other result kind that cannot be requested.
fn filter_hits(hits: Vec<SearchHit>) -> Vec<CatalogItem> {
    hits.into_iter()
        .filter_map(|hit| {
            let kind = match hit.media_type.as_deref() {
                Some("movie") => MediaKind::Movie,
                Some("tv") => MediaKind::Series,
                _ => return None,
            };
            let (title, release_date) = match kind {
                MediaKind::Movie => (hit.title, hit.release_date),
                MediaKind::Series => (hit.name, hit.first_air_date),
            };
            Some(CatalogItem {
                id: hit.id,
                title: title.unwrap_or_default(),
                kind,
                overview: hit.overview,
                poster_path: hit.poster_path,
                release_date: release_date.filter(|d| !d.is_empty()),
            })
        })
        .collect()
}
