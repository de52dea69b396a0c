use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use domain_billing::{
    exception::BillingException,
    mock::{MockInstanceRepo, MockMonitoringFlagRepo, MockVmRepo},
    model::{
        entity::{
            BillingKind, BillingPlan, BillingRecord, HistoryRecord, Instance, InstanceGroup,
            InstanceMeta, PlanKind, ProductConf, ResourceConf, VmDescriptor, WatermarkKey,
        },
        vo::{CanonicalState, InstanceStateMsg, StateCode},
    },
    service::{Clock, MessageQueueProducerTemplate, MonitoringService},
};
use mockall::predicate::eq;
use service_billing::MonitoringServiceImpl;
use uuid::Uuid;

struct FixedClock(i64);

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.0
    }
}

/// Keeps everything it is handed; fails afterwards when `fail` is set.
struct RecordingProducer<T> {
    sent: Mutex<Vec<(T, String)>>,
    fail: bool,
}

impl<T> Default for RecordingProducer<T> {
    fn default() -> Self {
        Self {
            sent: Mutex::new(vec![]),
            fail: false,
        }
    }
}

impl<T> RecordingProducer<T> {
    fn failing() -> Self {
        Self {
            sent: Mutex::new(vec![]),
            fail: true,
        }
    }

    fn sent(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.sent.lock().unwrap().iter().map(|(content, _)| content.clone()).collect()
    }
}

#[async_trait]
impl<T> MessageQueueProducerTemplate<T> for RecordingProducer<T>
where
    T: serde::Serialize + Clone + Send + Sync,
{
    async fn send_object(&self, content: &T, topic: &str) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push((content.clone(), topic.to_owned()));
        if self.fail {
            anyhow::bail!("ledger is down");
        }
        Ok(())
    }
}

struct Fixture {
    instance_repo: MockInstanceRepo,
    vm_repo: MockVmRepo,
    flag_repo: MockMonitoringFlagRepo,
    records: Arc<RecordingProducer<Vec<BillingRecord>>>,
    states: Arc<RecordingProducer<InstanceStateMsg>>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            instance_repo: MockInstanceRepo::new(),
            vm_repo: MockVmRepo::new(),
            flag_repo: MockMonitoringFlagRepo::new(),
            records: Arc::new(RecordingProducer::default()),
            states: Arc::new(RecordingProducer::default()),
        }
    }

    fn service(self, now: i64) -> MonitoringServiceImpl {
        MonitoringServiceImpl::builder()
            .instance_repo(Arc::new(self.instance_repo))
            .vm_repo(Arc::new(self.vm_repo))
            .flag_repo(Arc::new(self.flag_repo))
            .records_producer(self.records)
            .state_producer(self.states)
            .clock(Arc::new(FixedClock(now)))
            .build()
    }
}

fn running() -> StateCode {
    StateCode::new(3, 3, "RUNNING")
}

fn resource(key: &str, price: f64) -> ResourceConf {
    ResourceConf {
        key: key.to_owned(),
        kind: BillingKind::Postpaid,
        period: 60,
        price,
        on: HashSet::from([CanonicalState::Running]),
        except: false,
    }
}

fn dynamic_instance(vm_id: i64, keys: &[&str]) -> Instance {
    Instance {
        id: Uuid::new_v4(),
        group_id: Uuid::new_v4(),
        vm_id,
        created: 0,
        product: None,
        billing_plan: Some(BillingPlan {
            id: Uuid::new_v4(),
            kind: PlanKind::Dynamic,
            resources: keys.iter().map(|key| resource(key, 1.0)).collect(),
            products: HashMap::new(),
        }),
        meta: InstanceMeta::default(),
    }
}

fn static_instance(product: Option<&str>) -> Instance {
    Instance {
        id: Uuid::new_v4(),
        group_id: Uuid::new_v4(),
        vm_id: 7,
        created: 0,
        product: product.map(str::to_owned),
        billing_plan: Some(BillingPlan {
            id: Uuid::new_v4(),
            kind: PlanKind::Static,
            resources: vec![],
            products: HashMap::from([(
                "small".to_owned(),
                ProductConf {
                    kind: BillingKind::Postpaid,
                    period: 60,
                    price: 10.0,
                },
            )]),
        }),
        meta: InstanceMeta::default(),
    }
}

/// Two vCPUs, 2 GiB of memory, running since 0.
fn vm(id: i64) -> VmDescriptor {
    VmDescriptor {
        id,
        name: format!("vm-{id}"),
        state: running(),
        vcpu: 2.0,
        memory: 2048,
        public_ips: 1,
        private_ips: 0,
        history: vec![HistoryRecord {
            seq: 0,
            hostname: "node-1".to_owned(),
            start: 0,
            state: running(),
        }],
    }
}

#[tokio::test]
async fn test_static_pass_bills_product() {
    let instance = static_instance(Some("small"));
    let mut fixture = Fixture::new();
    let stored = instance.clone();
    fixture
        .instance_repo
        .expect_get_by_id()
        .with(eq(instance.id))
        .return_once(move |_| Ok(stored));
    fixture.vm_repo.expect_get_vm().never();
    fixture
        .instance_repo
        .expect_update_meta()
        .withf(|_, meta| meta.watermark(&WatermarkKey::Global).unwrap() == Some(120))
        .times(1)
        .returning(|_, _| Ok(()));
    let records = fixture.records.clone();
    let states = fixture.states.clone();
    let service = fixture.service(130);

    let report = service.monitor_instance(instance.id).await.unwrap();

    assert!(report.persisted);
    assert!(report.skipped.is_empty());
    let windows: Vec<_> = report.records.iter().map(|r| (r.start, r.end, r.total)).collect();
    assert_eq!(windows, vec![(0, 60, 10.0), (60, 120, 10.0)]);
    assert_eq!(records.sent(), vec![report.records.clone()]);
    assert!(states.sent().is_empty());
}

#[tokio::test]
async fn test_static_pass_without_product_is_skipped() {
    let instance = static_instance(None);
    let mut fixture = Fixture::new();
    let stored = instance.clone();
    fixture.instance_repo.expect_get_by_id().return_once(move |_| Ok(stored));
    fixture.instance_repo.expect_update_meta().never();
    let records = fixture.records.clone();
    let service = fixture.service(130);

    let report = service.monitor_instance(instance.id).await.unwrap();

    assert!(report.records.is_empty());
    assert_eq!(report.skipped, vec!["product".to_owned()]);
    assert!(report.persisted);
    assert!(records.sent().is_empty());
}

#[tokio::test]
async fn test_dynamic_pass_bills_every_resource() {
    let instance = dynamic_instance(1, &["cpu", "ram"]);
    let mut fixture = Fixture::new();
    let stored = instance.clone();
    fixture.instance_repo.expect_get_by_id().return_once(move |_| Ok(stored));
    fixture
        .vm_repo
        .expect_get_vm()
        .with(eq(1))
        .times(1)
        .returning(|id| Ok(vm(id)));
    fixture
        .instance_repo
        .expect_update_meta()
        .withf(|_, meta| {
            meta.watermark(&WatermarkKey::Resource("cpu".to_owned())).unwrap() == Some(120)
                && meta.watermark(&WatermarkKey::Resource("ram".to_owned())).unwrap() == Some(120)
        })
        .times(1)
        .returning(|_, _| Ok(()));
    let states = fixture.states.clone();
    let service = fixture.service(130);

    let report = service.monitor_instance(instance.id).await.unwrap();

    assert_eq!(report.records.len(), 4);
    assert!(report.records.iter().all(|r| (r.total - 2.0).abs() < 1e-9));
    let states = states.sent();
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].state, CanonicalState::Running);
    assert_eq!(states[0].meta.get("cpu_last_monitoring"), Some(&serde_json::json!(120)));
}

#[tokio::test]
async fn test_dynamic_pass_resumes_from_watermark() {
    let mut instance = dynamic_instance(1, &["cpu"]);
    instance.meta.set_watermark(&WatermarkKey::Resource("cpu".to_owned()), 60);
    let mut fixture = Fixture::new();
    let stored = instance.clone();
    fixture.instance_repo.expect_get_by_id().return_once(move |_| Ok(stored));
    fixture.vm_repo.expect_get_vm().returning(|id| Ok(vm(id)));
    fixture.instance_repo.expect_update_meta().returning(|_, _| Ok(()));
    let service = fixture.service(130);

    let report = service.monitor_instance(instance.id).await.unwrap();

    let windows: Vec<_> = report.records.iter().map(|r| (r.start, r.end)).collect();
    assert_eq!(windows, vec![(60, 120)]);
}

#[tokio::test]
async fn test_float_watermark_is_not_billed_again() {
    let mut instance = dynamic_instance(1, &["cpu"]);
    instance.meta.insert("cpu_last_monitoring", 60.0);
    let mut fixture = Fixture::new();
    let stored = instance.clone();
    fixture.instance_repo.expect_get_by_id().return_once(move |_| Ok(stored));
    fixture.vm_repo.expect_get_vm().returning(|id| Ok(vm(id)));
    fixture.instance_repo.expect_update_meta().returning(|_, _| Ok(()));
    let service = fixture.service(130);

    let report = service.monitor_instance(instance.id).await.unwrap();

    let windows: Vec<_> = report.records.iter().map(|r| (r.start, r.end)).collect();
    assert_eq!(windows, vec![(60, 120)]);
    assert!(report.skipped.is_empty());
}

#[tokio::test]
async fn test_malformed_watermark_skips_resource_and_keeps_value() {
    let mut instance = dynamic_instance(1, &["cpu", "ram"]);
    instance.meta.insert("cpu_last_monitoring", "yesterday");
    let mut fixture = Fixture::new();
    let stored = instance.clone();
    fixture.instance_repo.expect_get_by_id().return_once(move |_| Ok(stored));
    fixture.vm_repo.expect_get_vm().returning(|id| Ok(vm(id)));
    fixture
        .instance_repo
        .expect_update_meta()
        .withf(|_, meta| {
            meta.get("cpu_last_monitoring") == Some(&serde_json::json!("yesterday"))
                && meta.watermark(&WatermarkKey::Resource("ram".to_owned())).unwrap() == Some(120)
        })
        .times(1)
        .returning(|_, _| Ok(()));
    let service = fixture.service(130);

    let report = service.monitor_instance(instance.id).await.unwrap();

    assert_eq!(report.skipped, vec!["cpu".to_owned()]);
    assert!(report.records.iter().all(|r| r.end <= 120));
    assert_eq!(report.records.len(), 2);
}

#[tokio::test]
async fn test_malformed_static_watermark_skips_product() {
    let mut instance = static_instance(Some("small"));
    instance.meta.insert("last_monitoring", 60.5);
    let mut fixture = Fixture::new();
    let stored = instance.clone();
    fixture.instance_repo.expect_get_by_id().return_once(move |_| Ok(stored));
    fixture.instance_repo.expect_update_meta().never();
    let records = fixture.records.clone();
    let service = fixture.service(130);

    let report = service.monitor_instance(instance.id).await.unwrap();

    assert!(report.records.is_empty());
    assert_eq!(report.skipped, vec!["small".to_owned()]);
    assert!(report.persisted);
    assert!(records.sent().is_empty());
}

#[tokio::test]
async fn test_unknown_resource_is_skipped() {
    let instance = dynamic_instance(1, &["cpu", "gpu"]);
    let mut fixture = Fixture::new();
    let stored = instance.clone();
    fixture.instance_repo.expect_get_by_id().return_once(move |_| Ok(stored));
    fixture.vm_repo.expect_get_vm().returning(|id| Ok(vm(id)));
    fixture
        .instance_repo
        .expect_update_meta()
        .withf(|_, meta| {
            meta.watermark(&WatermarkKey::Resource("gpu".to_owned())).unwrap().is_none()
                && meta.watermark(&WatermarkKey::Resource("cpu".to_owned())).unwrap() == Some(120)
        })
        .times(1)
        .returning(|_, _| Ok(()));
    let service = fixture.service(130);

    let report = service.monitor_instance(instance.id).await.unwrap();

    assert_eq!(report.skipped, vec!["gpu".to_owned()]);
    assert_eq!(report.records.len(), 2);
}

#[tokio::test]
async fn test_vm_fetch_failure_leaves_watermarks() {
    let instance = dynamic_instance(1, &["cpu"]);
    let mut fixture = Fixture::new();
    let stored = instance.clone();
    fixture.instance_repo.expect_get_by_id().return_once(move |_| Ok(stored));
    fixture
        .vm_repo
        .expect_get_vm()
        .returning(|_| Err(anyhow::anyhow!("platform timeout")));
    fixture.instance_repo.expect_update_meta().never();
    let records = fixture.records.clone();
    let states = fixture.states.clone();
    let service = fixture.service(130);

    let err = service.monitor_instance(instance.id).await.unwrap_err();

    assert!(matches!(err, BillingException::VmUnavailable { .. }));
    assert!(!err.is_config());
    assert!(records.sent().is_empty());
    assert!(states.sent().is_empty());
}

#[tokio::test]
async fn test_publish_failure_keeps_watermarks_and_replays_same_records() {
    let instance = dynamic_instance(1, &["cpu"]);

    let mut fixture = Fixture::new();
    fixture.records = Arc::new(RecordingProducer::failing());
    let stored = instance.clone();
    fixture.instance_repo.expect_get_by_id().return_once(move |_| Ok(stored));
    fixture.vm_repo.expect_get_vm().returning(|id| Ok(vm(id)));
    fixture.instance_repo.expect_update_meta().never();
    let failed = fixture.records.clone();
    let service = fixture.service(130);

    let err = service.monitor_instance(instance.id).await.unwrap_err();
    assert!(matches!(err, BillingException::Publish { .. }));

    let mut fixture = Fixture::new();
    let stored = instance.clone();
    fixture.instance_repo.expect_get_by_id().return_once(move |_| Ok(stored));
    fixture.vm_repo.expect_get_vm().returning(|id| Ok(vm(id)));
    fixture.instance_repo.expect_update_meta().times(1).returning(|_, _| Ok(()));
    let service = fixture.service(130);

    let report = service.monitor_instance(instance.id).await.unwrap();

    let attempted: Vec<Uuid> = failed.sent().concat().iter().map(|r| r.id).collect();
    let replayed: Vec<Uuid> = report.records.iter().map(|r| r.id).collect();
    assert_eq!(attempted.len(), 2);
    assert_eq!(attempted, replayed);
}

#[tokio::test]
async fn test_meta_update_failure_is_reported() {
    let instance = dynamic_instance(1, &["cpu"]);
    let mut fixture = Fixture::new();
    let stored = instance.clone();
    fixture.instance_repo.expect_get_by_id().return_once(move |_| Ok(stored));
    fixture.vm_repo.expect_get_vm().returning(|id| Ok(vm(id)));
    fixture
        .instance_repo
        .expect_update_meta()
        .returning(|_, _| Err(anyhow::anyhow!("store is down")));
    let records = fixture.records.clone();
    let service = fixture.service(130);

    let report = service.monitor_instance(instance.id).await.unwrap();

    assert!(!report.persisted);
    assert_eq!(records.sent().len(), 1);
}

#[tokio::test]
async fn test_instance_without_plan() {
    let mut instance = dynamic_instance(1, &[]);
    instance.billing_plan = None;
    let mut fixture = Fixture::new();
    let stored = instance.clone();
    fixture.instance_repo.expect_get_by_id().return_once(move |_| Ok(stored));
    fixture.vm_repo.expect_get_vm().never();
    let service = fixture.service(130);

    let err = service.monitor_instance(instance.id).await.unwrap_err();

    assert!(matches!(err, BillingException::NoBillingPlan { .. }));
    assert!(err.is_config());
}

#[tokio::test]
async fn test_failing_instance_does_not_stop_group() {
    let group_id = Uuid::new_v4();
    let healthy = dynamic_instance(1, &["cpu"]);
    let broken = dynamic_instance(2, &["cpu"]);
    let healthy_id = healthy.id;
    let mut fixture = Fixture::new();
    fixture
        .instance_repo
        .expect_list_groups()
        .returning(move || {
            Ok(vec![InstanceGroup {
                id: group_id,
                title: "default".to_owned(),
            }])
        });
    fixture
        .instance_repo
        .expect_get_by_group()
        .with(eq(group_id))
        .return_once(move |_| Ok(vec![broken, healthy]));
    fixture
        .flag_repo
        .expect_try_acquire()
        .withf(move |key, ttl| key.to_string() == format!("monitoring:{group_id}:3") && *ttl == 600)
        .returning(|_, _| Ok(true));
    fixture.vm_repo.expect_get_vm().returning(|id| match id {
        1 => Ok(vm(id)),
        _ => Err(anyhow::anyhow!("no such vm")),
    });
    fixture
        .instance_repo
        .expect_update_meta()
        .withf(move |id, _| *id == healthy_id)
        .times(1)
        .returning(|_, _| Ok(()));
    let service = fixture.service(130);

    let report = service.run_cycle(3).await.unwrap();

    assert_eq!(report.groups_run, vec![group_id]);
    assert_eq!(report.passes, 2);
    assert_eq!(report.failures, 1);
}

#[tokio::test]
async fn test_held_group_is_skipped() {
    let held = Uuid::new_v4();
    let free = Uuid::new_v4();
    let mut fixture = Fixture::new();
    fixture.instance_repo.expect_list_groups().returning(move || {
        Ok(vec![
            InstanceGroup {
                id: held,
                title: "held".to_owned(),
            },
            InstanceGroup {
                id: free,
                title: "free".to_owned(),
            },
        ])
    });
    fixture
        .flag_repo
        .expect_try_acquire()
        .returning(move |key, _| Ok(!key.contains(&held.to_string())));
    fixture
        .instance_repo
        .expect_get_by_group()
        .with(eq(free))
        .times(1)
        .returning(|_| Ok(vec![]));
    let service = fixture.service(130);

    let report = service.run_cycle(1).await.unwrap();

    assert_eq!(report.groups_run, vec![free]);
    assert_eq!(report.groups_skipped, vec![held]);
    assert_eq!(report.passes, 0);
}

#[tokio::test]
async fn test_flag_store_error_skips_group() {
    let group_id = Uuid::new_v4();
    let mut fixture = Fixture::new();
    fixture.instance_repo.expect_list_groups().returning(move || {
        Ok(vec![InstanceGroup {
            id: group_id,
            title: "default".to_owned(),
        }])
    });
    fixture
        .flag_repo
        .expect_try_acquire()
        .returning(|_, _| Err(anyhow::anyhow!("connection refused")));
    fixture.instance_repo.expect_get_by_group().never();
    let service = fixture.service(130);

    let report = service.run_cycle(1).await.unwrap();

    assert!(report.groups_run.is_empty());
    assert_eq!(report.groups_skipped, vec![group_id]);
}
