pub mod access;
pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod resources;

#[cfg(test)]
pub mod testing;

pub use app::{app, AppState};
