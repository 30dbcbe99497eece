//! Print what the series manager knows about a catalog id: the lookup record
//! and, if present, the library record with its monitored seasons.
//! Usage:
//!   cargo run --bin sonarr_lookup -- <tmdb_id> [--episodes]
//! Requires SONARR_URL and SONARR_API_KEY in the environment (.env supported).

use anyhow::{Context, Result};
use cinerequest::config::ArrSettings;
use cinerequest::error::RequestError;
use cinerequest::sonarr::{SeriesLibrary, SonarrClient};
use dotenvy::dotenv;
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let mut args = env::args().skip(1);
    let tmdb_id: i32 = args
        .next()
        .context("usage: sonarr_lookup <tmdb_id> [--episodes]")?
        .parse()
        .context("tmdb_id must be a number")?;
    let show_episodes = args.any(|a| a == "--episodes");

    let settings = ArrSettings {
        url: env::var("SONARR_URL").context("Missing SONARR_URL in environment")?,
        api_key: env::var("SONARR_API_KEY").context("Missing SONARR_API_KEY in environment")?,
        root_folder: env::var("SONARR_ROOT_FOLDER").unwrap_or_default(),
    };
    let sonarr = SonarrClient::new(&settings, 1)?;

    let stub = sonarr.lookup_by_tmdb(tmdb_id).await?;
    println!("lookup: '{}' tvdbId={}", stub.title, stub.tvdb_id);
    for season in &stub.seasons {
        println!("  season {:>2}", season.season_number);
    }

    let record = match sonarr.find_existing_series(tmdb_id).await {
        Ok(record) => record,
        Err(RequestError::NotFound(_)) => {
            println!("library: not added");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    println!(
        "library: id={} path={} monitored={:?}",
        record.id,
        record.path.as_deref().unwrap_or("-"),
        record.monitored_seasons()
    );

    if show_episodes {
        for ep in sonarr.list_episodes(record.id).await? {
            println!(
                "  S{:02}E{:02} id={} {}",
                ep.season_number, ep.episode_number, ep.id, ep.title
            );
        }
    }
    Ok(())
}
