//! A reusable event-loop controller that drives a user-supplied
//! [`StreamProcessor`] over a durable, ordered log: deterministic
//! recovery-then-reprocessing on startup, then live running through a
//! process → side-effects → write → update-state lifecycle per record, with
//! periodic, safety-gated snapshotting so restart never has to replay the
//! whole log.
//!
//! Host applications bring their own [`Log`] and [`SnapshotStore`]
//! implementations (the in-memory and file-backed ones here are test
//! doubles, not production storage) and their own [`StreamProcessor`].
//! Everything else — the four-phase contract, the recovery/reprocessing
//! bound, the snapshot safety gate, retry/yield semantics, metrics, and
//! structured logging — is this crate's job.

pub mod config;
pub mod controller;
pub mod error;
pub mod filter;
pub mod log;
pub mod metrics;
pub mod processor;
pub mod scheduler;
pub mod snapshot;

pub use config::{ConfigError, ControllerConfig, SchedulingHint};
pub use controller::{Controller, ControllerCommand, ControllerHandle, FailureInfo, Phase};
pub use error::{ControllerError, ControllerResult};
pub use filter::{always, by_producer, AcceptAll, AndFilter, ByProducer, EventFilter, FnFilter, NotFilter};
pub use log::{InMemoryLog, InMemoryLogReader, InMemoryLogWriter, Log, LogReader, LogWriter, Position, ProducerId, Record};
pub use metrics::{MetricsSink, NoopMetrics, PrometheusMetrics};
pub use processor::{BoxFuture, EventProcessor, LifecycleContext, OpenContext, ProcessingMode, StateResource, StreamProcessor};
pub use scheduler::{evaluate_snapshot, SnapshotDecision, SnapshotScheduler};
pub use snapshot::{FileSnapshotStore, InMemorySnapshotStore, Snapshot, SnapshotStore, SnapshotWriter};
