use domain_billing::model::entity::{BillingPlan, Instance, InstanceMeta};
use serde::Deserialize;
use uuid::Uuid;

use super::telemetry::TelemetryConfig;

#[derive(Default, Clone, Deserialize, Debug)]
pub struct MonitorConfig {
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub platform: PlatformConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub topics: Topics,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Tracked instances, with their billing plans.
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
}

#[derive(Clone, Deserialize, Debug)]
pub struct RedisConfig {
    #[serde(default = "RedisConfig::default_urls")]
    pub urls: Vec<String>,
}

impl RedisConfig {
    fn default_urls() -> Vec<String> {
        vec!["redis://localhost:6379".to_string()]
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            urls: Self::default_urls(),
        }
    }
}

#[derive(Clone, Deserialize, Debug)]
pub struct PlatformConfig {
    #[serde(default = "PlatformConfig::default_endpoint")]
    pub endpoint: String,
    /// Request timeout in seconds.
    #[serde(default = "PlatformConfig::default_timeout")]
    pub timeout: u64,
}

impl PlatformConfig {
    fn default_endpoint() -> String {
        "http://localhost:2633".to_string()
    }
    fn default_timeout() -> u64 {
        10
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            endpoint: Self::default_endpoint(),
            timeout: Self::default_timeout(),
        }
    }
}

/// Without an endpoint, records and states stay on the internal queue and are only logged.
#[derive(Default, Clone, Deserialize, Debug)]
pub struct LedgerConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Clone, Deserialize, Debug)]
pub struct Topics {
    #[serde(default = "Topics::default_records")]
    pub records: String,
    #[serde(default = "Topics::default_states")]
    pub states: String,
    #[serde(default = "Topics::default_commands")]
    pub commands: String,
}

impl Topics {
    fn default_records() -> String {
        "billing-records".to_string()
    }
    fn default_states() -> String {
        "instance-states".to_string()
    }
    fn default_commands() -> String {
        "monitoring-commands".to_string()
    }
}

impl Default for Topics {
    fn default() -> Self {
        Self {
            records: Self::default_records(),
            states: Self::default_states(),
            commands: Self::default_commands(),
        }
    }
}

#[derive(Clone, Deserialize, Debug)]
pub struct SchedulerConfig {
    /// Seconds between two cycles.
    #[serde(default = "SchedulerConfig::default_interval")]
    pub interval: u64,
    /// Seconds a group flag is kept.
    #[serde(default = "SchedulerConfig::default_flag_ttl")]
    pub flag_ttl: u64,
    /// Queue a pass of every group at startup instead of waiting for the first cycle.
    #[serde(default = "SchedulerConfig::default_initial_pass")]
    pub initial_pass: bool,
}

impl SchedulerConfig {
    fn default_interval() -> u64 {
        60
    }
    fn default_flag_ttl() -> u64 {
        10 * 60
    }
    fn default_initial_pass() -> bool {
        true
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Self::default_interval(),
            flag_ttl: Self::default_flag_ttl(),
            initial_pass: Self::default_initial_pass(),
        }
    }
}

#[derive(Clone, Deserialize, Debug)]
pub struct GroupConfig {
    pub id: Uuid,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub instances: Vec<InstanceConfig>,
}

/// Keys are snake case since the config crate lowercases them.
#[derive(Clone, Deserialize, Debug)]
pub struct InstanceConfig {
    pub id: Uuid,
    pub vm_id: i64,
    pub created: i64,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub billing_plan: Option<BillingPlan>,
    #[serde(default)]
    pub meta: InstanceMeta,
}

impl InstanceConfig {
    pub fn into_instance(self, group_id: Uuid) -> Instance {
        Instance {
            id: self.id,
            group_id,
            vm_id: self.vm_id,
            created: self.created,
            product: self.product,
            billing_plan: self.billing_plan,
            meta: self.meta,
        }
    }
}

pub fn build_config() -> anyhow::Result<config::Config> {
    let args: Vec<String> = std::env::args().collect();
    let mut config = config::Config::builder().add_source(
        config::File::with_name("config")
            .required(false)
            .format(config::FileFormat::Yaml),
    );
    for arg in args {
        if arg.ends_with("yaml") || arg.ends_with("yml") {
            config = config.add_source(
                config::File::from(std::path::Path::new(arg.as_str()))
                    .format(config::FileFormat::Yaml)
                    .required(false),
            );
        }
    }
    config = config.add_source(
        config::Environment::with_prefix("MONITOR")
            .separator("__")
            .try_parsing(true)
            .list_separator(";")
            .with_list_parse_key("redis.urls"),
    );
    Ok(config.build()?)
}

#[cfg(test)]
mod tests {
    use domain_billing::model::entity::{BillingKind, PlanKind};
    use indoc::indoc;

    use super::*;

    fn parse(yaml: &str) -> MonitorConfig {
        config::Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse("{}");
        assert_eq!(config.scheduler.interval, 60);
        assert_eq!(config.scheduler.flag_ttl, 600);
        assert_eq!(config.topics.records, "billing-records");
        assert!(config.ledger.endpoint.is_none());
        assert!(config.groups.is_empty());
    }

    #[test]
    fn test_seeded_groups() {
        let config = parse(indoc! {r#"
            platform:
              endpoint: http://one:2633
            groups:
              - id: 6f9e3f44-3c5e-4a57-9d0e-1fb0e2a2b0aa
                title: lab
                instances:
                  - id: 0b8f5d8e-7a43-4f6e-9a36-4b1b0f1c2d3e
                    vm_id: 42
                    created: 1700000000
                    billing_plan:
                      id: 9c1d2e3f-4a5b-4c6d-8e7f-0a1b2c3d4e5f
                      kind: DYNAMIC
                      resources:
                        - key: cpu
                          period: 3600
                          price: 0.5
                          on: [RUNNING]
        "#});

        assert_eq!(config.platform.endpoint, "http://one:2633");
        let group = config.groups[0].clone();
        let instance = group.instances[0].clone().into_instance(group.id);
        assert_eq!(instance.vm_id, 42);
        assert_eq!(instance.group_id, group.id);
        let plan = instance.billing_plan.as_ref().unwrap();
        assert_eq!(plan.kind, PlanKind::Dynamic);
        assert_eq!(plan.resources[0].kind, BillingKind::Postpaid);
        assert_eq!(plan.resources[0].period, 3600);
    }
}
