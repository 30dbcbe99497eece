use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{RequestError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    #[serde(rename = "tv")]
    Series,
}

impl MediaKind {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "movie" => Some(Self::Movie),
            "tv" | "series" => Some(Self::Series),
            _ => None,
        }
    }
}

/// A movie or show as returned by the metadata catalog. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: i32,
    pub title: String,
    pub kind: MediaKind,
    pub overview: String,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
}

/// Scope of a series request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    WholeShow,
    Season(i32),
    Episode { season: i32, episode: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddRequest {
    Movie { tmdb_id: i32 },
    Series { tmdb_id: i32, granularity: Granularity },
}

impl fmt::Display for AddRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Movie { tmdb_id } => write!(f, "movie {tmdb_id}"),
            Self::Series {
                tmdb_id,
                granularity: Granularity::WholeShow,
            } => write!(f, "series {tmdb_id} (full show)"),
            Self::Series {
                tmdb_id,
                granularity: Granularity::Season(n),
            } => write!(f, "series {tmdb_id} season {n}"),
            Self::Series {
                tmdb_id,
                granularity: Granularity::Episode { season, episode },
            } => write!(f, "series {tmdb_id} S{season:02}E{episode:02}"),
        }
    }
}

/// Raw request fields as submitted by a caller, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestForm {
    #[serde(rename = "type", default)]
    pub media_type: String,
    #[serde(default)]
    pub tmdb_id: String,
    #[serde(default)]
    pub request_type: Option<String>,
    #[serde(default)]
    pub season_number: Option<String>,
    #[serde(default)]
    pub episode_number: Option<String>,
}

impl TryFrom<RequestForm> for AddRequest {
    type Error = RequestError;

    fn try_from(form: RequestForm) -> Result<Self> {
        let tmdb_id = parse_number(&form.tmdb_id, "tmdb_id")?;
        if tmdb_id <= 0 {
            return Err(RequestError::invalid_input("Invalid tmdb_id"));
        }

        let kind = MediaKind::parse(&form.media_type)
            .ok_or_else(|| RequestError::invalid_input("Unsupported media type"))?;
        if kind == MediaKind::Movie {
            return Ok(Self::Movie { tmdb_id });
        }

        let season = || required_number(form.season_number.as_deref(), "season_number");
        let granularity = match form.request_type.as_deref().map(str::trim) {
            Some("full_show") | Some("whole_show") => Granularity::WholeShow,
            Some("season") => Granularity::Season(season()?),
            Some("episode") => Granularity::Episode {
                season: season()?,
                episode: required_number(form.episode_number.as_deref(), "episode_number")?,
            },
            _ => return Err(RequestError::invalid_input("Unsupported TV request type")),
        };

        Ok(Self::Series {
            tmdb_id,
            granularity,
        })
    }
}

fn required_number(value: Option<&str>, field: &str) -> Result<i32> {
    let n = parse_number(value.unwrap_or_default(), field)?;
    if n < 0 {
        return Err(RequestError::invalid_input(format!("Invalid {field}")));
    }
    Ok(n)
}

fn parse_number(value: &str, field: &str) -> Result<i32> {
    value
        .trim()
        .parse()
        .map_err(|_| RequestError::invalid_input(format!("Invalid {field}")))
}
