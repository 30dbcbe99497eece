pub mod app;
pub mod config;
pub mod error;
pub mod models;
pub mod radarr;
pub mod reconcile;
pub mod sonarr;
pub mod tmdb;
