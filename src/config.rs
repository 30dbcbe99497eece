use anyhow::{anyhow, Context, Result};
use std::env;

const DEFAULT_QUALITY_PROFILE_ID: i32 = 7;
const DEFAULT_LANGUAGE_PROFILE_ID: i32 = 1;
const DEFAULT_PORT: u16 = 8080;

pub const REQUIRED_VARS: [&str; 7] = [
    "TMDB_API_KEY",
    "RADARR_URL",
    "RADARR_API_KEY",
    "RADARR_ROOT_FOLDER",
    "SONARR_URL",
    "SONARR_API_KEY",
    "SONARR_ROOT_FOLDER",
];

/// Connection details for one *arr instance.
#[derive(Debug, Clone)]
pub struct ArrSettings {
    pub url: String,
    pub api_key: String,
    pub root_folder: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub tmdb_api_key: String,
    pub radarr: ArrSettings,
    pub sonarr: ArrSettings,
    pub quality_profile_id: i32,
    pub language_profile_id: i32,
    pub port: u16,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds settings from any key lookup; empty values count as missing.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| anyhow!("Missing required environment variable: {}", key))
        };

        let arr = |prefix: &str| -> Result<ArrSettings> {
            Ok(ArrSettings {
                url: required(&format!("{prefix}_URL"))?
                    .trim_end_matches('/')
                    .to_string(),
                api_key: required(&format!("{prefix}_API_KEY"))?,
                root_folder: required(&format!("{prefix}_ROOT_FOLDER"))?,
            })
        };

        let quality_profile_id = match get("QUALITY_PROFILE_ID") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("QUALITY_PROFILE_ID is not a number: {v}"))?,
            None => DEFAULT_QUALITY_PROFILE_ID,
        };
        let language_profile_id = match get("LANGUAGE_PROFILE_ID") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("LANGUAGE_PROFILE_ID is not a number: {v}"))?,
            None => DEFAULT_LANGUAGE_PROFILE_ID,
        };
        let port = match get("PORT") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("PORT is not a valid port: {v}"))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            tmdb_api_key: required("TMDB_API_KEY")?,
            radarr: arr("RADARR")?,
            sonarr: arr("SONARR")?,
            quality_profile_id,
            language_profile_id,
            port,
        })
    }
}
