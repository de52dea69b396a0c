mod clock;
mod message_queue;
mod monitoring;
mod resource;

#[rustfmt::skip]
pub use {
    clock::Clock,
    message_queue::MessageQueueProducerTemplate,
    monitoring::MonitoringService,
    resource::ResourceHandler,
};
