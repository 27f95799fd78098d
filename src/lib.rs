pub mod cache;
pub mod config;
pub mod detector;
pub mod dispatch;
pub mod environment;
pub mod error;
pub mod logging;
pub mod models;
pub mod watcher;

#[cfg(test)]
mod testing;
