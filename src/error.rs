use thiserror::Error;

/// Failures surfaced to the user while browsing. None of them ends the
/// session; each is reported on the status line by the transition that hit it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The page parsed fine but contained no usable title tiles.
    #[error("no titles found for this search")]
    EmptyResult,

    #[error("fetch failed: {0}")]
    FetchFailure(String),

    #[error("playback failed: {0}")]
    PlaybackFailure(String),

    #[error("history store error: {0}")]
    Store(String),
}

impl Error {
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyResult => "No titles matched that search.".to_string(),
            Self::FetchFailure(_) => {
                "Something went wrong while fetching. Please try again.".to_string()
            }
            Self::PlaybackFailure(_) => "Unable to play this video. Please try again.".to_string(),
            Self::Store(detail) => format!("Watch history could not be updated: {detail}"),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
