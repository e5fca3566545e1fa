// Presentation pacing between emitted draft events.

use std::time::Duration;

use async_trait::async_trait;

/// Called after each event is emitted. Never affects what is emitted or in
/// which order.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self);
}

/// Emit as fast as the consumer reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPacing;

#[async_trait]
impl Pacer for NoPacing {
    async fn pause(&self) {}
}

/// Sleep a fixed interval after every event.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

#[async_trait]
impl Pacer for FixedDelay {
    async fn pause(&self) {
        tokio::time::sleep(self.0).await;
    }
}

/// Pacer for a configured delay; zero disables pacing.
pub fn pacer_from_millis(delay_ms: u64) -> Box<dyn Pacer> {
    if delay_ms == 0 {
        Box::new(NoPacing)
    } else {
        Box::new(FixedDelay(Duration::from_millis(delay_ms)))
    }
}
