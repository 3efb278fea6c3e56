//! The log contract: an ordered, durable, replicated append-only store.
//!
//! This module only defines the seam a real commit-log / replication engine
//! would implement (see §6 of the design doc) plus an in-memory double used
//! by this crate's own tests and by host applications exercising the
//! controller before wiring up real durability.

use async_trait::async_trait;
use tokio::sync::watch;

/// Position of a record in the log. Strictly increasing, never negative for
/// a record that actually exists. `-1` is used as a sentinel for "none".
pub type Position = i64;

/// Identity stamped on every record written by a controller.
pub type ProducerId = String;

/// An immutable entry in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub position: Position,
    pub producer_id: ProducerId,
    /// Position of the input record that causally produced this one; `-1` if none.
    pub source_record_position: Position,
    pub payload: Vec<u8>,
}

impl Record {
    #[must_use]
    pub fn new(
        position: Position,
        producer_id: impl Into<ProducerId>,
        source_record_position: Position,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            position,
            producer_id: producer_id.into(),
            source_record_position,
            payload,
        }
    }
}

/// Ordered, seekable read side of the log.
#[async_trait]
pub trait LogReader: Send {
    /// Seek so the next call to `next` returns the record at `position` (if any).
    /// Returns `false` if `position` is not (yet) present.
    async fn seek(&mut self, position: Position) -> anyhow::Result<bool>;

    /// Whether a next record is currently available without blocking.
    fn has_next(&self) -> bool;

    /// Read and advance past the next record. Callers must check `has_next`
    /// (or otherwise know a record is available) before calling this.
    async fn next(&mut self) -> anyhow::Result<Record>;
}

/// Fluent, single-use writer handed to `EventProcessor::write_event`.
#[async_trait]
pub trait LogWriter: Send {
    /// Stamp the producer id that will be attached to the next append.
    fn producer_id(&mut self, id: ProducerId) -> &mut dyn LogWriter;

    /// Stamp the causal source position that will be attached to the next append.
    fn source_record_position(&mut self, position: Position) -> &mut dyn LogWriter;

    /// Append `payload`, returning the assigned position, or a negative
    /// transient code if the append could not be durably accepted right now.
    async fn append(&mut self, payload: Vec<u8>) -> anyhow::Result<Position>;
}

/// The full log contract consumed by the controller: readable, writable, and
/// able to report / be watched for commit-position advancement.
#[async_trait]
pub trait Log: Send + Sync {
    type Reader: LogReader;
    type Writer: LogWriter;

    async fn open_reader(&self) -> anyhow::Result<Self::Reader>;
    async fn open_writer(&self) -> anyhow::Result<Self::Writer>;

    /// Highest position guaranteed durable/replicated.
    fn commit_position(&self) -> Position;

    /// A channel that updates whenever `commit_position` advances. The
    /// controller treats every change notification as a signal to attempt
    /// one more read iteration, never as a value to branch on directly.
    fn watch_commit_position(&self) -> watch::Receiver<Position>;
}

// ---------------------------------------------------------------------
// In-memory double, used by this crate's own tests.
// ---------------------------------------------------------------------

use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Shared {
    records: Vec<Record>,
}

/// A trivial in-process log backed by a `Vec<Record>`, with a `watch` channel
/// standing in for the durability/replication layer's commit-position pubsub.
pub struct InMemoryLog {
    shared: Arc<Mutex<Shared>>,
    commit_tx: watch::Sender<Position>,
    commit_rx: watch::Receiver<Position>,
}

impl InMemoryLog {
    #[must_use]
    pub fn new() -> Self {
        let (commit_tx, commit_rx) = watch::channel(-1);
        Self {
            shared: Arc::new(Mutex::new(Shared::default())),
            commit_tx,
            commit_rx,
        }
    }

    /// Append directly to the log (bypassing a writer / producer stamping),
    /// for test setup such as seeding pre-crash history.
    #[allow(clippy::unwrap_used)]
    pub fn seed(&self, record: Record) {
        let mut shared = self.shared.lock().unwrap();
        shared.records.push(record);
    }

    /// Advance the commit position, simulating replication catching up.
    pub fn advance_commit_position(&self, position: Position) {
        let _ = self.commit_tx.send_if_modified(|current| {
            if position > *current {
                *current = position;
                true
            } else {
                false
            }
        });
    }

    #[allow(clippy::unwrap_used)]
    fn len(&self) -> usize {
        self.shared.lock().unwrap().records.len()
    }
}

impl Default for InMemoryLog {
    fn default() -> Self {
        Self::new()
    }
}

pub struct InMemoryLogReader {
    shared: Arc<Mutex<Shared>>,
    cursor: usize,
}

#[async_trait]
impl LogReader for InMemoryLogReader {
    async fn seek(&mut self, position: Position) -> anyhow::Result<bool> {
        #[allow(clippy::unwrap_used)]
        let shared = self.shared.lock().unwrap();
        match shared.records.iter().position(|r| r.position == position) {
            Some(idx) => {
                self.cursor = idx;
                Ok(true)
            }
            None => {
                // Position not present yet; park the cursor at the first
                // record whose position is greater, so a later seek/next
                // sequence behaves sanely once it appears.
                let idx = shared
                    .records
                    .iter()
                    .position(|r| r.position > position)
                    .unwrap_or(shared.records.len());
                self.cursor = idx;
                Ok(false)
            }
        }
    }

    fn has_next(&self) -> bool {
        #[allow(clippy::unwrap_used)]
        let shared = self.shared.lock().unwrap();
        self.cursor < shared.records.len()
    }

    async fn next(&mut self) -> anyhow::Result<Record> {
        #[allow(clippy::unwrap_used)]
        let shared = self.shared.lock().unwrap();
        let record = shared
            .records
            .get(self.cursor)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no more records"))?;
        drop(shared);
        self.cursor += 1;
        Ok(record)
    }
}

pub struct InMemoryLogWriter {
    shared: Arc<Mutex<Shared>>,
    producer_id: ProducerId,
    source_record_position: Position,
}

#[async_trait]
impl LogWriter for InMemoryLogWriter {
    fn producer_id(&mut self, id: ProducerId) -> &mut dyn LogWriter {
        self.producer_id = id;
        self
    }

    fn source_record_position(&mut self, position: Position) -> &mut dyn LogWriter {
        self.source_record_position = position;
        self
    }

    async fn append(&mut self, payload: Vec<u8>) -> anyhow::Result<Position> {
        #[allow(clippy::unwrap_used)]
        let mut shared = self.shared.lock().unwrap();
        let position = shared.records.len() as Position;
        shared.records.push(Record::new(
            position,
            self.producer_id.clone(),
            self.source_record_position,
            payload,
        ));
        Ok(position)
    }
}

#[async_trait]
impl Log for InMemoryLog {
    type Reader = InMemoryLogReader;
    type Writer = InMemoryLogWriter;

    async fn open_reader(&self) -> anyhow::Result<Self::Reader> {
        Ok(InMemoryLogReader {
            shared: Arc::clone(&self.shared),
            cursor: 0,
        })
    }

    async fn open_writer(&self) -> anyhow::Result<Self::Writer> {
        Ok(InMemoryLogWriter {
            shared: Arc::clone(&self.shared),
            producer_id: ProducerId::new(),
            source_record_position: -1,
        })
    }

    fn commit_position(&self) -> Position {
        *self.commit_rx.borrow()
    }

    fn watch_commit_position(&self) -> watch::Receiver<Position> {
        self.commit_rx.clone()
    }
}
