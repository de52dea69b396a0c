use std::sync::Arc;

use async_trait::async_trait;
use domain_billing::{
    exception::{BillingException, BillingResult},
    model::{
        entity::{
            BillingPlan, BillingRecord, Instance, InstanceMeta, PlanKind, ResourceConf,
            VmDescriptor, WatermarkKey,
        },
        vo::{CycleReport, InstanceStateMsg, PassReport, Record},
    },
    repository::{InstanceRepo, MonitoringFlagRepo, VmRepo},
    service::{Clock, MessageQueueProducerTemplate, MonitoringService},
};
use futures::future::join_all;
use tracing::{debug, error, info, info_span, warn, Instrument};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::{
    accrual::{capacity_billing, static_billing, Accrued},
    handler::HandlerRegistry,
    lazy::Lazy,
    state::map_code,
    timeline::build_timeline,
};

/// Drives accrual passes: fetch, build the timeline, run the handlers, publish, persist.
///
/// Records are published before the advanced watermarks are persisted. A failed publish
/// leaves the watermarks untouched so the next pass replays the same windows; replayed
/// records keep their ids, which lets the ledger drop duplicates.
#[derive(TypedBuilder)]
pub struct MonitoringServiceImpl {
    instance_repo: Arc<dyn InstanceRepo>,
    vm_repo: Arc<dyn VmRepo>,
    flag_repo: Arc<dyn MonitoringFlagRepo>,
    records_producer: Arc<dyn MessageQueueProducerTemplate<Vec<BillingRecord>>>,
    state_producer: Arc<dyn MessageQueueProducerTemplate<InstanceStateMsg>>,
    clock: Arc<dyn Clock>,
    #[builder(default = HandlerRegistry::standard())]
    handlers: HandlerRegistry,
    #[builder(default = "billing-records".to_owned(), setter(into))]
    records_topic: String,
    #[builder(default = "instance-states".to_owned(), setter(into))]
    states_topic: String,
    /// Seconds a group flag outlives the cycle that set it.
    #[builder(default = 600)]
    flag_ttl: u64,
}

/// What the synchronous part of a pass hands to the publishing part.
struct Computed {
    records: Vec<BillingRecord>,
    meta: InstanceMeta,
    skipped: Vec<String>,
    state: Option<InstanceStateMsg>,
}

#[async_trait]
impl MonitoringService for MonitoringServiceImpl {
    async fn run_cycle(&self, cycle: i64) -> anyhow::Result<CycleReport> {
        let mut report = CycleReport {
            cycle,
            ..Default::default()
        };
        for group in self.instance_repo.list_groups().await? {
            let flag = format!("monitoring:{}:{cycle}", group.id);
            match self.flag_repo.try_acquire(&flag, self.flag_ttl).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!("Group {} is already monitored in cycle {cycle}.", group.id);
                    report.groups_skipped.push(group.id);
                    continue;
                }
                Err(e) => {
                    error!("Cannot set monitoring flag of group {}: {e:#}", group.id);
                    report.groups_skipped.push(group.id);
                    continue;
                }
            }
            match self.monitor_group(group.id).await {
                Ok(results) => {
                    report.passes += results.len();
                    report.failures += results
                        .iter()
                        .filter(|r| matches!(r, Err(e) if !e.is_config()))
                        .count();
                    report.groups_run.push(group.id);
                }
                Err(e) => {
                    error!("Cannot monitor group {}: {e:#}", group.id);
                    report.failures += 1;
                }
            }
        }
        info!(
            "Cycle {cycle} done: {} groups, {} passes, {} failures, {} groups skipped.",
            report.groups_run.len(),
            report.passes,
            report.failures,
            report.groups_skipped.len()
        );
        Ok(report)
    }

    async fn monitor_group(
        &self,
        group_id: Uuid,
    ) -> anyhow::Result<Vec<BillingResult<PassReport>>> {
        let instances = self.instance_repo.get_by_group(group_id).await?;
        let passes = instances.into_iter().map(|instance| {
            let span = info_span!("monitoring", group = %group_id, instance = %instance.id);
            self.pass(instance).instrument(span)
        });
        Ok(join_all(passes).await)
    }

    async fn monitor_instance(&self, instance_id: Uuid) -> BillingResult<PassReport> {
        let instance = self.instance_repo.get_by_id(instance_id).await?;
        self.pass(instance).instrument(info_span!("monitoring", instance = %instance_id)).await
    }
}

impl MonitoringServiceImpl {
    async fn pass(&self, instance: Instance) -> BillingResult<PassReport> {
        let result = self.try_pass(instance).await;
        match &result {
            Ok(report) => info!(
                "Billed {} records, skipped {:?}, persisted: {}.",
                report.records.len(),
                report.skipped,
                report.persisted
            ),
            Err(e) if e.is_config() => warn!("Skipped: {e}"),
            Err(e) => error!("Pass aborted: {e:#}"),
        }
        result
    }

    async fn try_pass(&self, instance: Instance) -> BillingResult<PassReport> {
        let now = self.clock.now();
        let plan = instance
            .billing_plan
            .as_ref()
            .ok_or(BillingException::NoBillingPlan {
                instance_id: instance.id,
            })?;

        let computed = match plan.kind {
            PlanKind::Static => self.accrue_static(&instance, plan, now),
            PlanKind::Dynamic => {
                let vm = self.vm_repo.get_vm(instance.vm_id).await.map_err(|source| {
                    BillingException::VmUnavailable {
                        instance_id: instance.id,
                        source,
                    }
                })?;
                self.accrue_dynamic(&instance, plan, &vm, now)
            }
        };
        self.publish(&instance, computed).await
    }

    fn accrue_static(&self, instance: &Instance, plan: &BillingPlan, now: i64) -> Computed {
        let mut meta = instance.meta.clone();
        let mut records = vec![];
        let mut skipped = vec![];

        let accrued = instance
            .product
            .as_deref()
            .ok_or(BillingException::NoProductSelected {
                instance_id: instance.id,
            })
            .and_then(|product| {
                let conf =
                    plan.products.get(product).ok_or_else(|| BillingException::NoSuchProduct {
                        plan_id: plan.id,
                        product: product.to_owned(),
                    })?;
                let last = meta.watermark(&WatermarkKey::Global)?.unwrap_or(instance.created);
                static_billing(instance.id, product, conf, last, now)
            });
        match accrued {
            Ok(Accrued { records: mut billed, last }) => {
                records.append(&mut billed);
                meta.set_watermark(&WatermarkKey::Global, last);
            }
            Err(e) => {
                warn!("Product of instance {} is skipped: {e}", instance.id);
                skipped.push(instance.product.clone().unwrap_or_else(|| "product".to_owned()));
            }
        }

        Computed {
            records,
            meta,
            skipped,
            state: None,
        }
    }

    fn accrue_dynamic(
        &self,
        instance: &Instance,
        plan: &BillingPlan,
        vm: &VmDescriptor,
        now: i64,
    ) -> Computed {
        let mut meta = instance.meta.clone();
        let mut records = vec![];
        let mut skipped = vec![];
        let timeline = Lazy::new(|| build_timeline(&vm.history, now));

        for conf in &plan.resources {
            let key = WatermarkKey::Resource(conf.key.clone());
            let accrued = meta.watermark(&key).and_then(|last| {
                let last = last.unwrap_or(instance.created);
                self.accrue_resource(instance.id, conf, vm, &timeline, last, now)
            });
            match accrued {
                Ok(Accrued { records: mut billed, last }) => {
                    debug!("Resource {} billed {} records up to {last}.", conf.key, billed.len());
                    records.append(&mut billed);
                    meta.set_watermark(&key, last);
                }
                Err(e) => {
                    warn!("Resource {} of instance {} is skipped: {e}", conf.key, instance.id);
                    skipped.push(conf.key.clone());
                }
            }
        }

        let state = InstanceStateMsg {
            instance_id: instance.id,
            state: map_code(&vm.state),
            meta: meta.as_map().clone(),
            observed_at: chrono::DateTime::from_timestamp(now, 0).unwrap_or_default(),
        };
        Computed {
            records,
            meta,
            skipped,
            state: Some(state),
        }
    }

    fn accrue_resource<F>(
        &self,
        instance_id: Uuid,
        conf: &ResourceConf,
        vm: &VmDescriptor,
        timeline: &Lazy<Vec<Record>, F>,
        last: i64,
        now: i64,
    ) -> BillingResult<Accrued>
    where
        F: FnOnce() -> Vec<Record>,
    {
        let handler = self.handlers.get(&conf.key).ok_or_else(|| {
            BillingException::UnknownResource {
                key: conf.key.clone(),
            }
        })?;
        let amount = Lazy::new(|| handler.amount(vm));
        capacity_billing(instance_id, conf, || *amount.get(), timeline, last, now)
    }

    async fn publish(&self, instance: &Instance, computed: Computed) -> BillingResult<PassReport> {
        let Computed {
            records,
            meta,
            skipped,
            state,
        } = computed;

        if !records.is_empty() {
            self.records_producer
                .send_object(&records, &self.records_topic)
                .await
                .map_err(|source| BillingException::Publish {
                    instance_id: instance.id,
                    what: "billing records",
                    source,
                })?;
        }
        if let Some(state) = state {
            if let Err(e) = self.state_producer.send_object(&state, &self.states_topic).await {
                warn!("Cannot publish state of instance {}: {e:#}", instance.id);
            }
        }

        let mut persisted = meta == instance.meta;
        if !persisted {
            match self.instance_repo.update_meta(instance.id, meta.clone()).await {
                Ok(()) => persisted = true,
                Err(e) => error!(
                    "Records of instance {} are published but its watermarks are not persisted: {e:#}",
                    instance.id
                ),
            }
        }

        Ok(PassReport {
            instance_id: instance.id,
            records,
            meta,
            skipped,
            persisted,
        })
    }
}
