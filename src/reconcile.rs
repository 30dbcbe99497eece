//! Decides create-versus-update for each request granularity and applies it.
//!
//! Remote state is fetched fresh on every call; nothing is cached and
//! concurrent requests for the same series are not serialised. A second
//! concurrent create simply lands in the already-exists repair path.

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::{RequestError, Result};
use crate::models::{AddRequest, Granularity};
use crate::radarr::MovieLibrary;
use crate::sonarr::{CreateSeriesOptions, SeriesLibrary, SeriesRecord};

/// Quality profile and root folders applied to every add.
#[derive(Debug, Clone)]
pub struct LibraryDefaults {
    pub quality_profile_id: i32,
    pub movie_root_folder: String,
    pub series_root_folder: String,
}

impl From<&Settings> for LibraryDefaults {
    fn from(settings: &Settings) -> Self {
        Self {
            quality_profile_id: settings.quality_profile_id,
            movie_root_folder: settings.radarr.root_folder.clone(),
            series_root_folder: settings.sonarr.root_folder.clone(),
        }
    }
}

#[derive(Clone)]
pub struct Reconciler {
    movies: Arc<dyn MovieLibrary>,
    series: Arc<dyn SeriesLibrary>,
    defaults: LibraryDefaults,
}

impl Reconciler {
    pub fn new(
        movies: Arc<dyn MovieLibrary>,
        series: Arc<dyn SeriesLibrary>,
        defaults: LibraryDefaults,
    ) -> Self {
        Self {
            movies,
            series,
            defaults,
        }
    }

    /// Applies the request and returns a message for the caller.
    pub async fn reconcile(&self, request: &AddRequest) -> Result<String> {
        info!("Processing request for {}", request);
        match *request {
            AddRequest::Movie { tmdb_id } => self.add_movie(tmdb_id).await,
            AddRequest::Series {
                tmdb_id,
                granularity,
            } => match granularity {
                Granularity::WholeShow => self.add_whole_show(tmdb_id).await,
                Granularity::Season(n) => self.add_season(tmdb_id, n).await,
                Granularity::Episode { season, episode } => {
                    self.request_episode(tmdb_id, season, episode).await
                }
            },
        }
    }

    async fn add_movie(&self, tmdb_id: i32) -> Result<String> {
        self.movies
            .add_movie(
                tmdb_id,
                self.defaults.quality_profile_id,
                &self.defaults.movie_root_folder,
            )
            .await?;
        info!("Movie {} submitted to library", tmdb_id);
        Ok("Movie request successfully submitted!".to_string())
    }

    async fn add_whole_show(&self, tmdb_id: i32) -> Result<String> {
        match self.create(tmdb_id, BTreeSet::new(), true).await {
            Ok(_) => {}
            Err(RequestError::AlreadyExists) => {
                warn!("Series {} exists, ensuring all seasons are monitored", tmdb_id);
                let mut record = self.series.find_existing_series(tmdb_id).await?;
                let changed = record.monitor_all_seasons();
                self.update_if_changed(&record, changed).await?;
            }
            Err(e) => return Err(e),
        }
        Ok("Request to add the full show has been submitted!".to_string())
    }

    async fn add_season(&self, tmdb_id: i32, season: i32) -> Result<String> {
        match self.create(tmdb_id, BTreeSet::from([season]), false).await {
            Ok(_) => {}
            Err(RequestError::AlreadyExists) => {
                warn!(
                    "Series {} exists, ensuring season {} is monitored",
                    tmdb_id, season
                );
                let mut record = self.series.find_existing_series(tmdb_id).await?;
                let changed = record
                    .monitor_season(season)
                    .ok_or(RequestError::SeasonNotFound(season))?;
                self.update_if_changed(&record, changed).await?;
            }
            Err(e) => return Err(e),
        }
        Ok(format!(
            "Request to add Season {} has been submitted!",
            season
        ))
    }

    async fn request_episode(&self, tmdb_id: i32, season: i32, episode: i32) -> Result<String> {
        let record = match self.series.find_existing_series(tmdb_id).await {
            Ok(mut record) => {
                info!("Series {} found, ensuring season {} is monitored", tmdb_id, season);
                // A missing season is left to the episode scan below.
                let changed = record.monitor_season(season).unwrap_or(false);
                self.update_if_changed(&record, changed).await?;
                record
            }
            Err(RequestError::NotFound(_)) => {
                info!("Series {} not in library, adding it", tmdb_id);
                let id = self.create(tmdb_id, BTreeSet::from([season]), false).await?;
                // A failure here leaves the series created but no search triggered.
                let mut record = self.series.find_existing_series(tmdb_id).await?;
                record.id = id;
                record
            }
            Err(e) => return Err(e),
        };

        let episodes = self.series.list_episodes(record.id).await?;
        let target = episodes
            .iter()
            .find(|ep| ep.season_number == season && ep.episode_number == episode)
            .ok_or(RequestError::EpisodeNotFound { season, episode })?;

        self.series.trigger_episode_search(&[target.id]).await?;
        info!(
            "Triggered search for {} S{:02}E{:02} (episode id {})",
            record.title, season, episode, target.id
        );
        Ok(format!(
            "Search for S{:02}E{:02} has been triggered!",
            season, episode
        ))
    }

    async fn create(&self, tmdb_id: i32, seasons: BTreeSet<i32>, entire: bool) -> Result<i32> {
        let opts = CreateSeriesOptions {
            tmdb_id,
            quality_profile_id: self.defaults.quality_profile_id,
            root_folder: self.defaults.series_root_folder.clone(),
            seasons_to_monitor: seasons,
            add_entire_show: entire,
        };
        let id = self.series.create_series(&opts).await?;
        info!("Created series {} (library id {})", tmdb_id, id);
        Ok(id)
    }

    async fn update_if_changed(&self, record: &SeriesRecord, changed: bool) -> Result<()> {
        if !changed {
            debug!(series_id = record.id, "Monitoring already up to date, skipping update");
            return Ok(());
        }
        info!(
            series_id = record.id,
            monitored = ?record.monitored_seasons(),
            "Updating series monitoring"
        );
        self.series.update_series(record).await
    }
}
