//! Error kinds for viewer construction and asset loading.

use thiserror::Error;

/// Everything that can go wrong in this crate that callers may want to
/// distinguish. Construction errors are fatal; load errors are reported
/// once and leave the affected model out of the scene with no retry.
#[derive(Debug, Error)]
pub enum ViewerError {
    /// A second viewer was constructed while one is still live.
    #[error("the viewer has already been initialized")]
    AlreadyInitialized,

    /// The render target element is absent from the host document.
    #[error("no render surface: element `{0}` was not found in the document")]
    MissingSurface(String),

    /// An asset fetch or decode failed. Aborts the whole load it was part of.
    #[error("failed to load `{path}`: {source}")]
    Load {
        path: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ViewerError {
    /// Shorthand used by the fetchers to wrap IO/decode failures.
    pub(crate) fn load(path: &str, source: impl Into<anyhow::Error>) -> Self {
        Self::Load {
            path: path.to_string(),
            source: source.into(),
        }
    }
}
