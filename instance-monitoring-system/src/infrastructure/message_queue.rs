use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};

use async_trait::async_trait;
use domain_billing::service::MessageQueueProducerTemplate;
use tracing::{error, trace, trace_span, warn, Instrument};
use typed_builder::TypedBuilder;

use super::BackgroundService;

pub type ConsumerReturn<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;
pub type ConsumerFn<SP> = for<'a> fn(content: &'a str, sp: Arc<SP>) -> ConsumerReturn<'a>;

#[derive(Debug, Clone)]
pub struct InternalMessage {
    pub target: String,
    pub body: String,
}

/// In-process queue: messages are serialized and dispatched by topic to a consumer.
pub struct InternalMessageQueueProducer {
    receiver: flume::Receiver<InternalMessage>,
    sender: flume::Sender<InternalMessage>,
}

#[async_trait]
impl<T> MessageQueueProducerTemplate<T> for InternalMessageQueueProducer
where
    T: serde::Serialize + Send + Sync,
{
    async fn send_object(&self, content: &T, topic: &str) -> anyhow::Result<()> {
        Ok(self
            .sender
            .send_async(InternalMessage {
                target: topic.to_string(),
                body: serde_json::to_string(content)?,
            })
            .await?)
    }
}

impl Default for InternalMessageQueueProducer {
    fn default() -> Self {
        Self::new()
    }
}

impl InternalMessageQueueProducer {
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self { sender, receiver }
    }

    pub fn get_receiver(&self) -> flume::Receiver<InternalMessage> {
        self.receiver.clone()
    }
}

pub struct InternalMessageQueueConsumer<SP>
where
    SP: Send + Sync + 'static,
{
    receiver: flume::Receiver<InternalMessage>,
    service_provider: Arc<SP>,
    fn_mapper: HashMap<String, ConsumerFn<SP>>,
}

impl<SP> InternalMessageQueueConsumer<SP>
where
    SP: Send + Sync + 'static,
{
    pub fn new(
        receiver: flume::Receiver<InternalMessage>,
        service_provider: Arc<SP>,
        fn_mapper: HashMap<String, ConsumerFn<SP>>,
    ) -> Self {
        Self {
            receiver,
            service_provider,
            fn_mapper,
        }
    }

    async fn dispatch(&self, message: InternalMessage) {
        trace!("message received: {:#?}.", message);
        match self.fn_mapper.get(message.target.as_str()) {
            Some(consumer) => {
                let sp = self.service_provider.clone();
                if let Err(e) = consumer(message.body.as_str(), sp)
                    .instrument(trace_span!("internal_message_queue", topic = %message.target))
                    .await
                {
                    error!("Consumer of {} failed: {e:#}", message.target)
                }
            }
            None => warn!("No such consumer: {}.", message.target),
        }
    }
}

#[async_trait]
impl<SP> BackgroundService for InternalMessageQueueConsumer<SP>
where
    SP: Send + Sync + 'static,
{
    async fn run(&self) {
        while let Ok(message) = self.receiver.recv_async().await {
            self.dispatch(message).await;
        }
        error!("Internal message queue is closed.");
    }
}

/// Posts every message as JSON to `{endpoint}/{topic}`.
#[derive(TypedBuilder)]
pub struct HttpMessageQueueProducer {
    client: Arc<reqwest::Client>,
    #[builder(setter(into))]
    endpoint: String,
}

#[async_trait]
impl<T> MessageQueueProducerTemplate<T> for HttpMessageQueueProducer
where
    T: serde::Serialize + Send + Sync,
{
    async fn send_object(&self, content: &T, topic: &str) -> anyhow::Result<()> {
        let url = format!("{}/{topic}", self.endpoint.trim_end_matches('/'));
        self.client.post(url).json(content).send().await?.error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct Counter {
        bodies: AtomicUsize,
    }

    fn count(content: &str, sp: Arc<Counter>) -> ConsumerReturn<'_> {
        Box::pin(async move {
            let value: serde_json::Value = serde_json::from_str(content)?;
            anyhow::ensure!(value["n"] == 1, "unexpected body: {content}");
            sp.bodies.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[tokio::test]
    async fn test_dispatch_by_topic() {
        let producer = InternalMessageQueueProducer::new();
        let counter = Arc::new(Counter::default());
        let consumer = InternalMessageQueueConsumer::new(
            producer.get_receiver(),
            counter.clone(),
            HashMap::from([("counted".to_owned(), count as ConsumerFn<Counter>)]),
        );

        producer.send_object(&serde_json::json!({ "n": 1 }), "counted").await.unwrap();
        producer.send_object(&serde_json::json!({ "n": 1 }), "ignored").await.unwrap();
        producer.send_object(&serde_json::json!({ "n": 2 }), "counted").await.unwrap();
        for _ in 0..3 {
            let message = producer.get_receiver().recv_async().await.unwrap();
            consumer.dispatch(message).await;
        }

        assert_eq!(counter.bodies.load(Ordering::SeqCst), 1);
    }
}
