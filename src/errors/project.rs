// src/errors/project.rs
//! Errors at the file and project level: loading sources and the
//! conditions that abort one file's analysis.

use std::path::PathBuf;

use thiserror::Error;

use crate::errors::SemanticError;
use crate::frontend::Span;

/// Failure reported by a `SourceProvider` while locating or parsing a file.
#[derive(Error, Debug, Clone)]
pub enum LoadError {
    #[error("module not found: {0}")]
    NotFound(String),
    #[error("failed to read {path}: {message}")]
    Io { path: PathBuf, message: String },
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid import path: {0}")]
    InvalidPath(String),
}

/// Failure reading or parsing a project manifest.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid manifest: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A condition that aborts analysis of exactly one file.
///
/// The driver turns it into a diagnostic on that file and hands dependents a
/// placeholder module instead.
#[derive(Error, Debug, Clone)]
pub enum FileFatal {
    #[error("cannot import '{path}': {reason}")]
    ImportFailed {
        path: String,
        reason: String,
        span: Span,
    },
    #[error("{0}")]
    Load(#[from] LoadError),
    #[error("internal analyzer error: {message}")]
    Internal { message: String, span: Span },
}

impl FileFatal {
    pub fn internal(message: impl Into<String>, span: Span) -> Self {
        FileFatal::Internal {
            message: message.into(),
            span,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            FileFatal::ImportFailed { span, .. } | FileFatal::Internal { span, .. } => *span,
            FileFatal::Load(_) => Span::default(),
        }
    }

    /// The diagnostic recorded against the aborted file.
    pub fn to_semantic_error(&self) -> SemanticError {
        match self {
            FileFatal::ImportFailed { path, reason, span } => SemanticError::ImportFailed {
                path: path.clone(),
                reason: reason.clone(),
                span: span.into(),
            },
            FileFatal::Load(err) => SemanticError::Internal {
                message: err.to_string(),
                span: Span::default().into(),
            },
            FileFatal::Internal { message, span } => SemanticError::Internal {
                message: message.clone(),
                span: span.into(),
            },
        }
    }
}
