use std::path::PathBuf;

use thiserror::Error;

use crate::source_map::SourceMapError;

/// Boxed error handed back by a host resolver.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T> = std::result::Result<T, LoaderError>;

/// Every failure aborts the transform of the current file; nothing partial is returned.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("invalid input source map: {0}")]
    MapParse(#[from] SourceMapError),

    #[error("cannot resolve '{request}' from {}: {source}", .context.display())]
    Resolution {
        request: String,
        context: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("invalid loader options: {0}")]
    Config(String),

    #[error("cannot build a module path for '{name}' under {}", .base.display())]
    InvalidPath { name: String, base: PathBuf },
}
