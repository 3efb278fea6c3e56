use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stream_processor_controller::{
    Controller, ControllerConfig, EventProcessor, InMemoryLog, InMemorySnapshotStore,
    LifecycleContext, LogWriter, NoopMetrics, OpenContext, Position, Record, SnapshotScheduler,
    StateResource, StreamProcessor,
};

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

/// Recoverable state for the demo counter processor: the running total.
#[derive(Default)]
struct CounterState {
    total: i64,
}

impl StateResource for CounterState {
    fn reset(&mut self) {
        self.total = 0;
    }

    fn serialize_to(&self) -> Vec<u8> {
        self.total.to_be_bytes().to_vec()
    }

    fn restore_from(&mut self, bytes: &[u8]) -> Result<()> {
        let bytes: [u8; 8] = bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("malformed counter snapshot"))?;
        self.total = i64::from_be_bytes(bytes);
        Ok(())
    }
}

struct AddToCounter {
    amount: i64,
}

#[async_trait]
impl EventProcessor for AddToCounter {
    async fn process(&mut self, _ctx: &mut LifecycleContext) -> Result<()> {
        Ok(())
    }

    async fn execute_side_effects(&mut self) -> Result<bool> {
        Ok(true)
    }

    async fn write_event(&mut self, writer: &mut dyn LogWriter) -> Result<Position> {
        writer.append(self.amount.to_be_bytes().to_vec()).await
    }

    async fn update_state(&mut self, state: &mut dyn StateResource) -> Result<()> {
        let mut counter = CounterState::default();
        counter.restore_from(&state.serialize_to())?;
        counter.total += self.amount;
        state.restore_from(&counter.serialize_to())
    }
}

struct CounterProcessor {
    state: CounterState,
}

#[async_trait]
impl StreamProcessor for CounterProcessor {
    async fn on_open(&mut self, ctx: &OpenContext<'_>) -> Result<()> {
        tracing::info!(name = ctx.name, "counter processor opened");
        Ok(())
    }

    fn on_event(&mut self, record: &Record) -> Option<Box<dyn EventProcessor>> {
        let amount = i64::from_be_bytes(record.payload.clone().try_into().ok()?);
        Some(Box::new(AddToCounter { amount }))
    }

    fn state_resource(&self) -> &dyn StateResource {
        &self.state
    }

    fn state_resource_mut(&mut self) -> &mut dyn StateResource {
        &mut self.state
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let log = Arc::new(InMemoryLog::new());
    log.advance_commit_position(i64::MAX);
    let snapshot_store = Arc::new(InMemorySnapshotStore::new());
    let metrics = Arc::new(NoopMetrics);

    let config =
        ControllerConfig::new("demo-counter").with_snapshot_period(Duration::from_secs(5));
    let processor = Box::new(CounterProcessor {
        state: CounterState::default(),
    });

    let mut controller =
        Controller::new(config, Arc::clone(&log), snapshot_store, metrics, processor)?;

    // Seed a couple of source records for the demo to react to.
    for (position, amount) in [(0i64, 1i64), (1, 2), (2, 3)] {
        log.seed(Record::new(
            position,
            "source",
            -1,
            amount.to_be_bytes().to_vec(),
        ));
    }

    controller.open().await?;
    controller.run_until_idle().await?;
    tracing::info!(
        last_processed = controller.last_successfully_processed_position(),
        "demo run complete"
    );

    Ok(())
}
