//! Error taxonomy shared by the library clients and the reconciler.
//!
//! Every variant is terminal for the request that produced it; nothing in
//! the crate retries.

/// Failure of a catalog, library-manager or reconciliation step.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// A lookup or listing returned nothing for the identifier.
    #[error("not found: {0}")]
    NotFound(String),

    /// The series manager reported the series as already added.
    ///
    /// Detected from the response text, see
    /// [`crate::sonarr::classify_create_failure`].
    #[error("series already exists")]
    AlreadyExists,

    /// A remote call returned a non-success status.
    #[error("upstream returned status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("could not find season {0} in existing series")]
    SeasonNotFound(i32),

    #[error("could not find S{season:02}E{episode:02} in the series episode list")]
    EpisodeNotFound { season: i32, episode: i32 },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The request never produced a status (connect, timeout, body read).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl RequestError {
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn upstream<S: Into<String>>(status: u16, body: S) -> Self {
        Self::Upstream {
            status,
            body: body.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RequestError>;
