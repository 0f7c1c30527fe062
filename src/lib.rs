//! Core library for youtube-playlist-tools
pub mod config;
pub mod error;
pub mod models;
pub mod api;
pub mod report;
pub mod secrets;
pub mod token_store;
pub mod workflow;
