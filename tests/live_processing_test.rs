//! S1 (clean live run), S3 (transient retry then success), S7 (read-only
//! processor), S8 (bounded retry exhaustion).

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

/// Shared call counters so tests can assert how many times each phase ran.
#[derive(Default, Clone)]
struct Counters {
    side_effects: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
}

struct AddToCounter {
    amount: i64,
    counters: Counters,
    /// Number of leading `execute_side_effects` calls that report transient
    /// failure before succeeding.
    fail_side_effects_times: usize,
    read_only: bool,
}

#[async_trait]
impl EventProcessor for AddToCounter {
    async fn process(&mut self, _ctx: &mut LifecycleContext) -> anyhow::Result<()> {
        Ok(())
    }

    async fn execute_side_effects(&mut self) -> anyhow::Result<bool> {
        let attempt = self.counters.side_effects.fetch_add(1, Ordering::SeqCst);
        Ok(attempt >= self.fail_side_effects_times)
    }

    async fn write_event(&mut self, writer: &mut dyn LogWriter) -> anyhow::Result<Position> {
        assert!(!self.read_only, "write_event must not run for a read-only processor");
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
    fail_side_effects_times: usize,
    read_only: bool,
}

#[async_trait]
impl StreamProcessor for CounterProcessor {
    fn on_event(&mut self, record: &Record) -> Option<Box<dyn EventProcessor>> {
        let amount = i64::from_be_bytes(record.payload.clone().try_into().ok()?);
        Some(Box::new(AddToCounter {
            amount,
            counters: self.counters.clone(),
            fail_side_effects_times: self.fail_side_effects_times,
            read_only: self.read_only,
        }))
    }

    fn state_resource(&self) -> &dyn StateResource {
        &self.state
    }

    fn state_resource_mut(&mut self) -> &mut dyn StateResource {
        &mut self.state
    }
}

fn seed_source_records(log: &InMemoryLog, amounts: &[i64]) {
    for (position, amount) in amounts.iter().enumerate() {
        log.seed(Record::new(
            position as Position,
            "source",
            -1,
            amount.to_be_bytes().to_vec(),
        ));
    }
}

#[tokio::test]
async fn s1_clean_live_run_processes_every_source_record_once() {
    let log = Arc::new(InMemoryLog::new());
    seed_source_records(&log, &[1, 2, 3]);

    let config = ControllerConfig::new("demo-counter").with_event_filter(ByProducer {
        producer_id: "source".into(),
    });
    let processor = Box::new(CounterProcessor {
        state: CounterState::default(),
        counters: Counters::default(),
        fail_side_effects_times: 0,
        read_only: false,
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

    assert_eq!(controller.phase(), Phase::Running);
    assert_eq!(controller.last_successfully_processed_position(), 2);
    assert_eq!(controller.last_written_position(), 5);
}

#[tokio::test]
async fn s3_transient_side_effect_failure_is_retried_until_success() {
    let log = Arc::new(InMemoryLog::new());
    seed_source_records(&log, &[10]);

    let counters = Counters::default();
    let config = ControllerConfig::new("demo-counter").with_event_filter(ByProducer {
        producer_id: "source".into(),
    });
    let processor = Box::new(CounterProcessor {
        state: CounterState::default(),
        counters: counters.clone(),
        fail_side_effects_times: 2,
        read_only: false,
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

    assert!(!controller.is_failed());
    assert_eq!(controller.last_successfully_processed_position(), 0);
    assert_eq!(counters.side_effects.load(Ordering::SeqCst), 3);
    assert_eq!(counters.writes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn s7_read_only_processor_never_writes_and_skips_reprocessing_scan() {
    let log = Arc::new(InMemoryLog::new());
    seed_source_records(&log, &[5, 6]);

    let counters = Counters::default();
    let config = ControllerConfig::new("demo-counter")
        .read_only()
        .with_event_filter(ByProducer {
            producer_id: "source".into(),
        });
    let processor = Box::new(CounterProcessor {
        state: CounterState::default(),
        counters: counters.clone(),
        fail_side_effects_times: 0,
        read_only: true,
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

    assert_eq!(controller.last_successfully_processed_position(), 1);
    assert_eq!(controller.last_written_position(), -1);
    assert_eq!(counters.writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn s8_bounded_retries_fail_the_controller_once_exhausted() {
    let log = Arc::new(InMemoryLog::new());
    seed_source_records(&log, &[1]);

    let config = ControllerConfig::new("demo-counter")
        .with_max_phase_retries(2)
        .with_event_filter(ByProducer {
            producer_id: "source".into(),
        });
    let processor = Box::new(CounterProcessor {
        state: CounterState::default(),
        counters: Counters::default(),
        fail_side_effects_times: usize::MAX,
        read_only: false,
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
    let result = controller.run_until_idle().await;

    assert!(result.is_err());
    assert!(controller.is_failed());
    let failure = controller.failure().unwrap();
    assert_eq!(failure.label, "retries_exhausted");
    assert_eq!(failure.phase, "side_effects");
}
