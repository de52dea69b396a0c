use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use domain_billing::service::{Clock, MonitoringService};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info_span, Instrument};
use typed_builder::TypedBuilder;

use super::BackgroundService;

/// Starts a monitoring cycle every `interval` seconds.
///
/// Cycles are numbered `now / interval`. Ticks of several replicas landing in the same window
/// share the number, and the group flags keep them from monitoring a group twice. A cycle is
/// spawned and not awaited: a slow cycle never delays the next tick. The first cycle starts
/// one interval after startup.
#[derive(TypedBuilder)]
pub struct MonitoringScheduler {
    service: Arc<dyn MonitoringService>,
    clock: Arc<dyn Clock>,
    interval: u64,
}

impl MonitoringScheduler {
    fn cycle(&self) -> i64 {
        self.clock.now() / self.interval.max(1) as i64
    }
}

#[async_trait]
impl BackgroundService for MonitoringScheduler {
    async fn run(&self) {
        let period = Duration::from_secs(self.interval.max(1));
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let cycle = self.cycle();
            let service = self.service.clone();
            tokio::spawn(
                async move {
                    if let Err(e) = service.run_cycle(cycle).await {
                        error!("Monitoring cycle failed: {e:#}");
                    }
                }
                .instrument(info_span!("cycle", cycle)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use domain_billing::mock::MockMonitoringService;

    use super::*;

    struct FixedClock(i64);

    impl Clock for FixedClock {
        fn now(&self) -> i64 {
            self.0
        }
    }

    #[test]
    fn test_cycle_number() {
        let scheduler = MonitoringScheduler::builder()
            .service(Arc::new(MockMonitoringService::new()))
            .clock(Arc::new(FixedClock(3_599)))
            .interval(60)
            .build();
        assert_eq!(scheduler.cycle(), 59);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_spawn_cycles() {
        let (sender, receiver) = flume::unbounded();
        let mut service = MockMonitoringService::new();
        service.expect_run_cycle().returning(move |cycle| {
            sender.send(cycle)?;
            Ok(Default::default())
        });
        let scheduler = MonitoringScheduler::builder()
            .service(Arc::new(service))
            .clock(Arc::new(FixedClock(600)))
            .interval(60)
            .build();

        let handle = tokio::spawn(async move { scheduler.run().await });
        let cycle = receiver.recv_async().await.unwrap();
        handle.abort();

        assert_eq!(cycle, 10);
    }
}
