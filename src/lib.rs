//! Finds subtitles for a local anime series on Anime Tosho, extracts them
//! next to the videos and renames them to match.

pub mod archive;
pub mod config;
pub mod episode;
pub mod error;
pub mod index;
pub mod library;
pub mod matcher;
pub mod metadata;
pub mod prompt;
pub mod query;
pub mod rename_engine;
pub mod resolver;
pub mod select;
pub mod tui;

pub use error::{Result, SubdlError};
