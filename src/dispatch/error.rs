//! Internal dispatch errors.
//!
//! These never leave the dispatcher as values; their rendered text becomes a
//! context tag.

use std::error::Error as StdError;
use std::fmt::Write;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The outbound request could not be built. Indicates a bug or a bad adapted path.
    #[error("build request for {url:?}: {source}")]
    BuildRequest {
        url: String,
        #[source]
        source: axum::http::Error,
    },

    /// The shared client failed to obtain a response.
    #[error("{}", chain(.0))]
    Transport(#[from] hyper_util::client::legacy::Error),
}

/// Render an error followed by its source chain, `outer: inner: root`.
fn chain(err: &dyn StdError) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let _ = write!(out, ": {cause}");
        source = cause.source();
    }
    out
}
