use std::sync::Arc;

use domain_billing::model::{entity::BillingRecord, vo::InstanceStateMsg};
use infrastructure_command::MonitoringCommand;
use tracing::info;

use super::{message_queue::ConsumerReturn, ServiceProvider};

/// Ad-hoc passes; they do not take the cycle flag.
pub fn monitoring_command_consumer(content: &str, sp: Arc<ServiceProvider>) -> ConsumerReturn<'_> {
    Box::pin(async move {
        let command: MonitoringCommand = serde_json::from_str(content)?;
        match command {
            MonitoringCommand::RunGroup { group_id } => {
                let results = sp.monitoring_service.monitor_group(group_id).await?;
                let failed = results.iter().filter(|r| r.is_err()).count();
                info!("Group {group_id} monitored: {} passes, {failed} failed.", results.len());
            }
            MonitoringCommand::RunInstance { instance_id } => {
                sp.monitoring_service.monitor_instance(instance_id).await?;
            }
        }
        Ok(())
    })
}

/// Used when no ledger endpoint is configured.
pub fn billing_records_logger(content: &str, _sp: Arc<ServiceProvider>) -> ConsumerReturn<'_> {
    Box::pin(async move {
        let records: Vec<BillingRecord> = serde_json::from_str(content)?;
        for record in records {
            info!(
                "Billing record {}: {} of {} [{}, {}) total {}.",
                record.id, record.subject, record.instance, record.start, record.end, record.total
            );
        }
        Ok(())
    })
}

pub fn instance_state_logger(content: &str, _sp: Arc<ServiceProvider>) -> ConsumerReturn<'_> {
    Box::pin(async move {
        let msg: InstanceStateMsg = serde_json::from_str(content)?;
        info!("Instance {} is {:?}.", msg.instance_id, msg.state);
        Ok(())
    })
}
