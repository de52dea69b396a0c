pub mod config;
pub mod database;
pub mod internal_message_consumer;
pub mod message_queue;
pub mod repository;
pub mod scheduler;
pub mod service_provider;
pub mod telemetry;

use async_trait::async_trait;

#[rustfmt::skip]
pub use {
    config::{build_config, MonitorConfig},
    service_provider::ServiceProvider,
};

/// A long running task spawned once at startup.
#[async_trait]
pub trait BackgroundService: Send + Sync {
    async fn run(&self);
}
