use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;

use crate::config::ArrSettings;
use crate::error::{RequestError, Result};

#[async_trait]
pub trait MovieLibrary: Send + Sync {
    async fn add_movie(&self, tmdb_id: i32, quality_profile_id: i32, root_folder: &str)
        -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct RadarrClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct AddOptions {
    search_for_movie: bool,
    monitor: &'static str,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct NewMovie<'a> {
    tmdb_id: i32,
    quality_profile_id: i32,
    root_folder_path: &'a str,
    monitored: bool,
    add_options: AddOptions,
    /// Skips pre-release placeholders.
    minimum_availability: &'static str,
}

fn new_movie(tmdb_id: i32, quality_profile_id: i32, root_folder: &str) -> NewMovie<'_> {
    NewMovie {
        tmdb_id,
        quality_profile_id,
        root_folder_path: root_folder,
        monitored: true,
        add_options: AddOptions {
            search_for_movie: true,
            monitor: "movieOnly",
        },
        minimum_availability: "released",
    }
}

impl RadarrClient {
    pub fn new(settings: &ArrSettings) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(format!("cinerequest/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: settings.url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
        })
    }
}

#[async_trait]
impl MovieLibrary for RadarrClient {
    async fn add_movie(
        &self,
        tmdb_id: i32,
        quality_profile_id: i32,
        root_folder: &str,
    ) -> Result<()> {
        let payload = new_movie(tmdb_id, quality_profile_id, root_folder);
        let res = self
            .client
            .post(format!(
                "{}/api/v3/movie?apikey={}",
                self.base_url,
                urlencoding::encode(&self.api_key)
            ))
            .json(&payload)
            .send()
            .await?;

        let status = res.status();
        // Duplicates come back as a plain upstream error.
        if status != StatusCode::CREATED && status != StatusCode::OK {
            let body = res.text().await?;
            return Err(RequestError::upstream(status.as_u16(), body));
        }
        Ok(())
    }
}
