use std::sync::Arc;

use colored::Colorize;
use domain_billing::service::MessageQueueProducerTemplate;
use infrastructure_command::MonitoringCommand;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::infrastructure::{build_config, telemetry::initialize_telemetry, ServiceProvider};

pub fn run() {
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(x) => x,
        Err(e) => {
            return eprintln!("{}: {}", "Cannot build runtime".red(), e);
        }
    };
    runtime.block_on(async_run());
}

pub async fn async_run() {
    let config = match build_config() {
        Ok(x) => x,
        Err(e) => {
            return eprintln!("{}: {}", "Cannot build config".red(), e);
        }
    };

    let service_provider = match ServiceProvider::build(config) {
        Ok(x) => Arc::new(x),
        Err(e) => {
            return eprintln!("{}: {}", "Cannot build Service Provider".red(), e);
        }
    };
    if let Err(e) = initialize_telemetry(&service_provider.config.telemetry) {
        return eprintln!("{}: {}", "Cannot build logger".red(), e);
    };

    let handles = service_provider
        .background_services()
        .into_iter()
        .map(|x| tokio::spawn(async move { x.run().await }))
        .collect::<Vec<JoinHandle<()>>>();
    info!(
        "Monitoring {} groups every {} seconds.",
        service_provider.config.groups.len(),
        service_provider.config.scheduler.interval
    );

    if service_provider.config.scheduler.initial_pass {
        queue_initial_pass(&service_provider).await;
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Cannot listen for ctrl-c: {e}");
    }
    info!("Stopping services (ctrl-c handling).");
    for handle in handles {
        handle.abort()
    }
}

/// Bill every seeded group right away rather than at the first tick.
async fn queue_initial_pass(sp: &ServiceProvider) {
    for group in &sp.config.groups {
        let command = MonitoringCommand::RunGroup { group_id: group.id };
        if let Err(e) = sp
            .internal_message_queue_producer
            .send_object(&command, &sp.config.topics.commands)
            .await
        {
            error!("Cannot queue initial pass of group {}: {e}", group.id);
        }
    }
}
