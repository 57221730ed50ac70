// Library entrypoint for the CLI binary and integration tests.
pub mod api;
pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod editor;
pub mod polling;
pub mod schemas;
pub mod shutdown;
pub mod state;
pub mod upstream;
