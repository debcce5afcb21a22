pub mod auxiliary;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod logging;
pub mod matcher;
pub mod merger;
pub mod model;
pub mod plugin;
pub mod progress;
pub mod providers;
pub mod query;
pub mod record_store;
pub mod runtime;
