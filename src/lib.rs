// Library exports for MusicalArt
// Integration tests and the CLI binary both build on these modules

pub mod auth;
pub mod capabilities;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod ids;
pub mod models;
pub mod registry;
pub mod state;
pub mod storage;
