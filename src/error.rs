//! Error taxonomy of the mirror core.
//!
//! Stale responses are not represented here: a detail or tree message whose
//! subject id no longer matches the current state is dropped and traced at
//! debug level.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MirrorError {
    /// A serialized payload could not be decoded. The associated merge is
    /// aborted and state keeps its last good value.
    #[error("malformed payload for '{subject}': {source}")]
    DataFormat {
        subject: String,
        #[source]
        source: serde_json::Error,
    },

    /// The root tree request came back without data.
    #[error("component tree not supported for '{target}'")]
    NotSupported { target: String },

    /// The bridge stopped delivering messages.
    #[error("bridge closed: {0}")]
    BridgeClosed(String),
}

impl MirrorError {
    pub fn data_format(subject: impl Into<String>, source: serde_json::Error) -> Self {
        Self::DataFormat {
            subject: subject.into(),
            source,
        }
    }
}
