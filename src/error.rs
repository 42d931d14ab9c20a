//! Error types for the collision subsystem.
//!
//! This module provides a unified error type [`CollisionError`] and a convenient [`Result`] alias.
//! Tree corruption is deliberately not represented here: it panics.

use std::fmt;

use crate::core::entry::EntryId;

/// Main error type for fallible registry and configuration operations.
#[derive(Debug)]
pub enum CollisionError {
    /// No live entry carries the given id.
    UnknownEntry(EntryId),
    /// A configuration value is out of range.
    InvalidConfig(String),
    /// A configuration document could not be parsed.
    ConfigParse(String),
    /// An I/O operation failed (config loading).
    Io(std::io::Error),
}

impl fmt::Display for CollisionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnknownEntry(id) => write!(f, "Unknown collision entry: {id}"),
            Self::InvalidConfig(msg) => write!(f, "Invalid collision config: {msg}"),
            Self::ConfigParse(msg) => write!(f, "Config parse error: {msg}"),
            Self::Io(err) => write!(f, "IO error: {err}"),
        }
    }
}

impl std::error::Error for CollisionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

/// Convenient Result type alias for collision operations.
pub type Result<T> = std::result::Result<T, CollisionError>;

impl From<std::io::Error> for CollisionError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<toml::de::Error> for CollisionError {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigParse(err.to_string())
    }
}
