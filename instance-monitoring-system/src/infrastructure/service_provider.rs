use std::{collections::HashMap, sync::Arc, time::Duration};

use domain_billing::{
    model::{entity::BillingRecord, vo::InstanceStateMsg},
    service::{Clock, MessageQueueProducerTemplate, MonitoringService},
};
use service_billing::{HandlerRegistry, MonitoringServiceImpl, UtcClock};

use super::{
    config::MonitorConfig,
    database::RedisClient,
    internal_message_consumer,
    message_queue::{
        ConsumerFn, HttpMessageQueueProducer, InternalMessageQueueConsumer,
        InternalMessageQueueProducer,
    },
    repository::{
        MemoryInstanceRepo, PlatformVmRepo, RedisInstanceMetaRepo, RedisMonitoringFlagRepo,
    },
    scheduler::MonitoringScheduler,
    BackgroundService,
};

/// Everything the process needs, wired once at startup.
pub struct ServiceProvider {
    pub config: MonitorConfig,
    pub monitoring_service: Arc<dyn MonitoringService>,
    pub internal_message_queue_producer: Arc<InternalMessageQueueProducer>,
    pub clock: Arc<dyn Clock>,
}

impl ServiceProvider {
    pub fn build(config: config::Config) -> anyhow::Result<Self> {
        let config: MonitorConfig = config.try_deserialize()?;
        let clock: Arc<dyn Clock> = Arc::new(UtcClock);
        let internal_message_queue_producer = Arc::new(InternalMessageQueueProducer::new());
        let http_client = Arc::new(
            reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(2))
                .timeout(Duration::from_secs(config.platform.timeout))
                .build()?,
        );
        let redis_client = Arc::new(RedisClient::open(&config.redis.urls)?);

        let records_producer: Arc<dyn MessageQueueProducerTemplate<Vec<BillingRecord>>>;
        let state_producer: Arc<dyn MessageQueueProducerTemplate<InstanceStateMsg>>;
        match &config.ledger.endpoint {
            Some(endpoint) => {
                let producer = Arc::new(
                    HttpMessageQueueProducer::builder()
                        .client(http_client.clone())
                        .endpoint(endpoint.clone())
                        .build(),
                );
                records_producer = producer.clone();
                state_producer = producer;
            }
            None => {
                records_producer = internal_message_queue_producer.clone();
                state_producer = internal_message_queue_producer.clone();
            }
        }

        let instance_repo = MemoryInstanceRepo::seed(&config.groups).with_meta_repo(Arc::new(
            RedisInstanceMetaRepo::builder().client(redis_client.clone()).build(),
        ));

        let monitoring_service = Arc::new(
            MonitoringServiceImpl::builder()
                .instance_repo(Arc::new(instance_repo))
                .vm_repo(Arc::new(
                    PlatformVmRepo::builder()
                        .client(http_client)
                        .endpoint(config.platform.endpoint.clone())
                        .build(),
                ))
                .flag_repo(Arc::new(RedisMonitoringFlagRepo::builder().client(redis_client).build()))
                .records_producer(records_producer)
                .state_producer(state_producer)
                .clock(clock.clone())
                .handlers(HandlerRegistry::standard())
                .records_topic(config.topics.records.clone())
                .states_topic(config.topics.states.clone())
                .flag_ttl(config.scheduler.flag_ttl)
                .build(),
        );

        Ok(Self {
            config,
            monitoring_service,
            internal_message_queue_producer,
            clock,
        })
    }

    /// The scheduler and the internal queue consumer.
    pub fn background_services(self: &Arc<Self>) -> Vec<Arc<dyn BackgroundService>> {
        let topics = &self.config.topics;
        let mut fn_mapper: HashMap<String, ConsumerFn<ServiceProvider>> = HashMap::new();
        fn_mapper.insert(
            topics.commands.clone(),
            internal_message_consumer::monitoring_command_consumer,
        );
        if self.config.ledger.endpoint.is_none() {
            fn_mapper.insert(
                topics.records.clone(),
                internal_message_consumer::billing_records_logger,
            );
            fn_mapper.insert(
                topics.states.clone(),
                internal_message_consumer::instance_state_logger,
            );
        }

        let scheduler: Arc<dyn BackgroundService> = Arc::new(
            MonitoringScheduler::builder()
                .service(self.monitoring_service.clone())
                .clock(self.clock.clone())
                .interval(self.config.scheduler.interval)
                .build(),
        );
        let consumer: Arc<dyn BackgroundService> = Arc::new(InternalMessageQueueConsumer::new(
            self.internal_message_queue_producer.get_receiver(),
            self.clone(),
            fn_mapper,
        ));
        vec![scheduler, consumer]
    }
}
