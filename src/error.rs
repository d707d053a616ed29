// error.rs — 错误类型
//
// Nothing in the engine is fatal. These values are produced where a failure
// happens, logged there, and dropped; only config loading and asset decoding
// hand a `Result` back to the caller.

use std::path::PathBuf;

use crate::scene::Role;

#[derive(Debug, thiserror::Error)]
pub enum CarouselError {
    #[error("scene element missing: {0}")]
    MissingElement(Role),

    #[error("playback of {source_path:?} rejected: {reason}")]
    PlaybackRejected { source_path: PathBuf, reason: String },

    #[error("invalid config {path:?}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot decode {path:?}: {reason}")]
    Decode { path: PathBuf, reason: String },
}

pub type Result<T, E = CarouselError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_element_names_the_role() {
        let err = CarouselError::MissingElement(Role::SpinContainer);
        assert_eq!(err.to_string(), "scene element missing: spin-container");
    }
}
