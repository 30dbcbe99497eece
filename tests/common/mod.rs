#![allow(dead_code)]

use cinerequest::error::{RequestError, Result};
use cinerequest::models::{CatalogItem, MediaKind};
use cinerequest::radarr::MovieLibrary;
use cinerequest::reconcile::{LibraryDefaults, Reconciler};
use cinerequest::sonarr::{
    classify_create_failure, prepare_new_series, CreateSeriesOptions, EpisodeRecord, SeasonRecord,
    SeriesLibrary, SeriesRecord,
};
use cinerequest::tmdb::{EpisodeSummary, SeasonDetail, SeasonSummary, ShowDetail, TmdbApi};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

pub const GOT_TMDB: i32 = 1399;
pub const GOT_TVDB: i32 = 121361;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Lookup(i32),
    Find(i32),
    Create(CreateSeriesOptions),
    Update(i32),
    ListEpisodes(i32),
    Search(Vec<i32>),
}

/// In-memory series manager. Lookup stubs are keyed by catalog id,
/// episodes by tvdb id; the library holds added series.
#[derive(Default)]
pub struct FakeSonarr {
    pub stubs: Mutex<HashMap<i32, SeriesRecord>>,
    pub episodes: Mutex<HashMap<i32, Vec<EpisodeRecord>>>,
    pub library: Mutex<Vec<SeriesRecord>>,
    pub calls: Mutex<Vec<Call>>,
    pub fail_update: Mutex<Option<(u16, String)>>,
    /// Consumed one per `find_existing_series` call; `None` lets that call through.
    pub find_failures: Mutex<VecDeque<Option<(u16, String)>>>,
    /// When set, create reports this id instead of the stored one.
    pub report_created_id: Mutex<Option<i32>>,
    /// Reported id -> stored id, for ids handed out via `report_created_id`.
    aliases: Mutex<HashMap<i32, i32>>,
    next_id: Mutex<i32>,
}

impl FakeSonarr {
    pub fn with_show(tmdb_id: i32, tvdb_id: i32, seasons: &[i32]) -> Self {
        let fake = Self::default();
        fake.stubs.lock().unwrap().insert(
            tmdb_id,
            SeriesRecord {
                title: "Game of Thrones".to_string(),
                tvdb_id,
                title_slug: "game-of-thrones".to_string(),
                seasons: seasons
                    .iter()
                    .map(|&n| SeasonRecord {
                        season_number: n,
                        monitored: false,
                        ..Default::default()
                    })
                    .collect(),
                ..Default::default()
            },
        );
        let episodes = seasons
            .iter()
            .filter(|&&n| n > 0)
            .flat_map(|&s| {
                (1..=10).map(move |e| EpisodeRecord {
                    id: s * 1000 + e,
                    season_number: s,
                    episode_number: e,
                    title: format!("Episode {s}x{e}"),
                })
            })
            .collect();
        fake.episodes.lock().unwrap().insert(tvdb_id, episodes);
        *fake.next_id.lock().unwrap() = 1;
        fake
    }

    pub fn got() -> Self {
        Self::with_show(GOT_TMDB, GOT_TVDB, &[0, 1, 2, 3, 4])
    }

    /// Puts the series straight into the library with the given seasons monitored.
    pub fn preload(&self, tmdb_id: i32, monitored: &[i32]) -> i32 {
        let mut record = self.stubs.lock().unwrap()[&tmdb_id].clone();
        let id = self.bump_id();
        record.id = id;
        for season in record.seasons.iter_mut() {
            season.monitored = monitored.contains(&season.season_number);
        }
        self.library.lock().unwrap().push(record);
        id
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(*c)).count()
    }

    pub fn updates(&self) -> usize {
        self.count(|c| matches!(c, Call::Update(_)))
    }

    pub fn creates(&self) -> usize {
        self.count(|c| matches!(c, Call::Create(_)))
    }

    pub fn searches(&self) -> Vec<Vec<i32>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Search(ids) => Some(ids),
                _ => None,
            })
            .collect()
    }

    pub fn monitored(&self, tvdb_id: i32) -> BTreeSet<i32> {
        self.library
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.tvdb_id == tvdb_id)
            .map(|s| s.monitored_seasons())
            .unwrap_or_default()
    }

    pub fn fail_finds(&self, outcomes: Vec<Option<(u16, &str)>>) {
        *self.find_failures.lock().unwrap() = outcomes
            .into_iter()
            .map(|o| o.map(|(status, body)| (status, body.to_string())))
            .collect();
    }

    pub fn in_library(&self, tvdb_id: i32) -> bool {
        self.library
            .lock()
            .unwrap()
            .iter()
            .any(|s| s.tvdb_id == tvdb_id)
    }

    fn bump_id(&self) -> i32 {
        let mut next = self.next_id.lock().unwrap();
        let id = *next;
        *next += 1;
        id
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn stub(&self, tmdb_id: i32) -> Result<SeriesRecord> {
        self.stubs
            .lock()
            .unwrap()
            .get(&tmdb_id)
            .cloned()
            .ok_or_else(|| RequestError::not_found(format!("no series found for tmdb id {tmdb_id}")))
    }
}

#[async_trait::async_trait]
impl SeriesLibrary for FakeSonarr {
    async fn lookup_by_tmdb(&self, tmdb_id: i32) -> Result<SeriesRecord> {
        self.record(Call::Lookup(tmdb_id));
        self.stub(tmdb_id)
    }

    async fn find_existing_series(&self, tmdb_id: i32) -> Result<SeriesRecord> {
        self.record(Call::Find(tmdb_id));
        if let Some(Some((status, body))) = self.find_failures.lock().unwrap().pop_front() {
            return Err(RequestError::upstream(status, body));
        }
        let tvdb_id = self.stub(tmdb_id)?.tvdb_id;
        self.library
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.tvdb_id == tvdb_id)
            .cloned()
            .ok_or_else(|| RequestError::not_found("series not found in library"))
    }

    async fn create_series(&self, opts: &CreateSeriesOptions) -> Result<i32> {
        self.record(Call::Create(opts.clone()));
        let stub = self.stub(opts.tmdb_id)?;
        if self
            .library
            .lock()
            .unwrap()
            .iter()
            .any(|s| s.tvdb_id == stub.tvdb_id)
        {
            return Err(classify_create_failure(
                400,
                r#"[{"propertyName":"TvdbId","errorMessage":"This series has already been added"}]"#,
            ));
        }
        let mut record = prepare_new_series(stub, opts, 1);
        let id = self.bump_id();
        record.id = id;
        record.add_options = None;
        self.library.lock().unwrap().push(record);
        match *self.report_created_id.lock().unwrap() {
            Some(reported) => {
                self.aliases.lock().unwrap().insert(reported, id);
                Ok(reported)
            }
            None => Ok(id),
        }
    }

    async fn update_series(&self, record: &SeriesRecord) -> Result<()> {
        self.record(Call::Update(record.id));
        if let Some((status, body)) = self.fail_update.lock().unwrap().clone() {
            return Err(RequestError::upstream(status, body));
        }
        let mut library = self.library.lock().unwrap();
        let slot = library
            .iter_mut()
            .find(|s| s.id == record.id)
            .ok_or_else(|| RequestError::upstream(404, "series does not exist"))?;
        *slot = SeriesRecord {
            add_options: None,
            ..record.clone()
        };
        Ok(())
    }

    async fn list_episodes(&self, series_id: i32) -> Result<Vec<EpisodeRecord>> {
        self.record(Call::ListEpisodes(series_id));
        let series_id = self
            .aliases
            .lock()
            .unwrap()
            .get(&series_id)
            .copied()
            .unwrap_or(series_id);
        let tvdb_id = self
            .library
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == series_id)
            .map(|s| s.tvdb_id)
            .ok_or_else(|| RequestError::upstream(404, "series does not exist"))?;
        Ok(self
            .episodes
            .lock()
            .unwrap()
            .get(&tvdb_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn trigger_episode_search(&self, episode_ids: &[i32]) -> Result<()> {
        self.record(Call::Search(episode_ids.to_vec()));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeRadarr {
    pub added: Mutex<Vec<(i32, i32, String)>>,
    pub reject_with: Mutex<Option<(u16, String)>>,
}

#[async_trait::async_trait]
impl MovieLibrary for FakeRadarr {
    async fn add_movie(&self, tmdb_id: i32, quality_profile_id: i32, root_folder: &str) -> Result<()> {
        if let Some((status, body)) = self.reject_with.lock().unwrap().clone() {
            return Err(RequestError::upstream(status, body));
        }
        self.added
            .lock()
            .unwrap()
            .push((tmdb_id, quality_profile_id, root_folder.to_string()));
        Ok(())
    }
}

pub struct FakeTmdb;

#[async_trait::async_trait]
impl TmdbApi for FakeTmdb {
    async fn search(&self, query: &str) -> Result<Vec<CatalogItem>> {
        if query == "boom" {
            return Err(RequestError::upstream(401, "Invalid API key"));
        }
        Ok(vec![CatalogItem {
            id: GOT_TMDB,
            title: "Game of Thrones".to_string(),
            kind: MediaKind::Series,
            overview: "Seven noble families".to_string(),
            poster_path: None,
            release_date: Some("2011-04-17".to_string()),
        }])
    }

    async fn fetch_show(&self, id: i32) -> Result<ShowDetail> {
        if id != GOT_TMDB {
            return Err(RequestError::upstream(404, "The resource you requested could not be found."));
        }
        Ok(ShowDetail {
            id,
            name: "Game of Thrones".to_string(),
            overview: String::new(),
            poster_path: None,
            first_air_date: Some("2011-04-17".to_string()),
            number_of_seasons: Some(1),
            seasons: vec![SeasonSummary {
                season_number: 1,
                name: "Season 1".to_string(),
                episode_count: 10,
                air_date: None,
            }],
        })
    }

    async fn fetch_season(&self, _id: i32, season: i32) -> Result<SeasonDetail> {
        Ok(SeasonDetail {
            season_number: season,
            name: format!("Season {season}"),
            overview: String::new(),
            episodes: vec![EpisodeSummary {
                id: 63056,
                episode_number: 1,
                season_number: season,
                name: "Winter Is Coming".to_string(),
                overview: String::new(),
                air_date: None,
            }],
        })
    }
}

pub fn defaults() -> LibraryDefaults {
    LibraryDefaults {
        quality_profile_id: 7,
        movie_root_folder: "/movies".to_string(),
        series_root_folder: "/tv".to_string(),
    }
}

pub fn reconciler(sonarr: &Arc<FakeSonarr>, radarr: &Arc<FakeRadarr>) -> Reconciler {
    Reconciler::new(radarr.clone(), sonarr.clone(), defaults())
}
