//! S2 (crash before snapshot → reprocessing rebuilds state deterministically,
//! without re-running side-effects or writes) and S5 (reopening an already
//! opened controller is rejected).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use stream_processor_controller::{
    ByProducer, Controller, ControllerConfig, EventProcessor, InMemoryLog, InMemorySnapshotStore,
    LifecycleContext, LogWriter, NoopMetrics, Phase, Position, Record, StateResource,
    StreamProcessor,
};

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

    fn restore_from(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.total = i64::from_be_bytes(bytes.try_into()?);
        Ok(())
    }
}

#[derive(Default, Clone)]
struct Counters {
    side_effects: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
}

struct AddToCounter {
    amount: i64,
    counters: Counters,
}

#[async_trait]
impl EventProcessor for AddToCounter {
    async fn process(&mut self, _ctx: &mut LifecycleContext) -> anyhow::Result<()> {
        Ok(())
    }

    async fn execute_side_effects(&mut self) -> anyhow::Result<bool> {
        self.counters.side_effects.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn write_event(&mut self, writer: &mut dyn LogWriter) -> anyhow::Result<Position> {
        self.counters.writes.fetch_add(1, Ordering::SeqCst);
        writer.append(self.amount.to_be_bytes().to_vec()).await
    }

    async fn update_state(&mut self, state: &mut dyn StateResource) -> anyhow::Result<()> {
        let mut counter = CounterState::default();
        counter.restore_from(&state.serialize_to())?;
        counter.total += self.amount;
        state.restore_from(&counter.serialize_to())
    }
}

struct CounterProcessor {
    state: CounterState,
    counters: Counters,
}

#[async_trait]
impl StreamProcessor for CounterProcessor {
    fn on_event(&mut self, record: &Record) -> Option<Box<dyn EventProcessor>> {
        let amount = i64::from_be_bytes(record.payload.clone().try_into().ok()?);
        Some(Box::new(AddToCounter {
            amount,
            counters: self.counters.clone(),
        }))
    }

    fn state_resource(&self) -> &dyn StateResource {
        &self.state
    }

    fn state_resource_mut(&mut self) -> &mut dyn StateResource {
        &mut self.state
    }
}

fn source_only_filter() -> ByProducer {
    ByProducer {
        producer_id: "source".into(),
    }
}

#[tokio::test]
async fn s2_reprocessing_after_crash_rebuilds_state_without_side_effects_or_writes() {
    let log = Arc::new(InMemoryLog::new());
    log.seed(Record::new(0, "source", -1, 1i64.to_be_bytes().to_vec()));
    log.seed(Record::new(1, "source", -1, 2i64.to_be_bytes().to_vec()));
    log.seed(Record::new(2, "source", -1, 3i64.to_be_bytes().to_vec()));

    // Controller A: a live run that writes its own output records into the
    // same log but crashes (is simply dropped) before any snapshot.
    {
        let config = ControllerConfig::new("demo-counter").with_event_filter(source_only_filter());
        let processor = Box::new(CounterProcessor {
            state: CounterState::default(),
            counters: Counters::default(),
        });
        let mut controller = Controller::new(
            config,
            Arc::clone(&log),
            Arc::new(InMemorySnapshotStore::new()),
            Arc::new(NoopMetrics),
            processor,
        )
        .unwrap();
        controller.open().await.unwrap();
        controller.run_until_idle().await.unwrap();
        assert_eq!(controller.last_successfully_processed_position(), 2);
        // controller dropped here: no snapshot was ever written.
    }

    // Controller B: fresh process, same log, no snapshot to recover from.
    let counters_b = Counters::default();
    let config = ControllerConfig::new("demo-counter").with_event_filter(source_only_filter());
    let processor = Box::new(CounterProcessor {
        state: CounterState::default(),
        counters: counters_b.clone(),
    });
    let mut controller = Controller::new(
        config,
        Arc::clone(&log),
        Arc::new(InMemorySnapshotStore::new()),
        Arc::new(NoopMetrics),
        processor,
    )
    .unwrap();

    controller.open().await.unwrap();

    // By the time `open` returns, reprocessing has already happened and the
    // controller is `Running`; state must match controller A's without any
    // side-effects or writes having run.
    assert_eq!(controller.phase(), Phase::Running);
    assert_eq!(controller.last_successfully_processed_position(), 2);
    assert_eq!(counters_b.side_effects.load(Ordering::SeqCst), 0);
    assert_eq!(counters_b.writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn s5_reopening_an_opened_controller_is_rejected() {
    let log = Arc::new(InMemoryLog::new());
    log.seed(Record::new(0, "source", -1, 1i64.to_be_bytes().to_vec()));

    let config = ControllerConfig::new("demo-counter").with_event_filter(source_only_filter());
    let processor = Box::new(CounterProcessor {
        state: CounterState::default(),
        counters: Counters::default(),
    });
    let mut controller = Controller::new(
        config,
        log,
        Arc::new(InMemorySnapshotStore::new()),
        Arc::new(NoopMetrics),
        processor,
    )
    .unwrap();

    controller.open().await.unwrap();
    let second_open = controller.open().await;
    assert!(second_open.is_err());
    assert_eq!(controller.phase(), Phase::Running);
}
