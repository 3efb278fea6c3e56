//! Pure, side-effect-free predicates over log records.
//!
//! An `EventFilter` must be deterministic: the controller invokes it
//! identically during reprocessing and during live running, and a filter
//! that depended on external state would silently break replay correctness.

use crate::log::{ProducerId, Record};

/// A deterministic predicate deciding whether a record is handed to the
/// user processor at all.
pub trait EventFilter: Send + Sync {
    fn accept(&self, record: &Record) -> bool;

    /// Combine with another filter: both must accept.
    fn and(self, other: impl EventFilter + 'static) -> AndFilter
    where
        Self: Sized + 'static,
    {
        AndFilter {
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    /// Negate this filter.
    fn not(self) -> NotFilter
    where
        Self: Sized + 'static,
    {
        NotFilter {
            inner: Box::new(self),
        }
    }
}

/// Accepts every record. The default when no filter is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl EventFilter for AcceptAll {
    fn accept(&self, _record: &Record) -> bool {
        true
    }
}

/// `AcceptAll`, spelled the way a filter-composition call site reads.
#[must_use]
pub fn always() -> AcceptAll {
    AcceptAll
}

/// Accepts only records written by a specific producer. Primarily useful
/// composed with other filters; the controller does not need this on its
/// own since reprocessing already bounds by `source_record_position`.
#[derive(Debug, Clone)]
pub struct ByProducer {
    pub producer_id: ProducerId,
}

impl EventFilter for ByProducer {
    fn accept(&self, record: &Record) -> bool {
        record.producer_id == self.producer_id
    }
}

/// `ByProducer`, spelled the way a filter-composition call site reads.
#[must_use]
pub fn by_producer(producer_id: impl Into<ProducerId>) -> ByProducer {
    ByProducer {
        producer_id: producer_id.into(),
    }
}

/// Conjunction of two filters.
pub struct AndFilter {
    left: Box<dyn EventFilter>,
    right: Box<dyn EventFilter>,
}

impl EventFilter for AndFilter {
    fn accept(&self, record: &Record) -> bool {
        self.left.accept(record) && self.right.accept(record)
    }
}

/// Negation of a filter.
pub struct NotFilter {
    inner: Box<dyn EventFilter>,
}

impl EventFilter for NotFilter {
    fn accept(&self, record: &Record) -> bool {
        !self.inner.accept(record)
    }
}

/// A filter built from a plain closure, for ad-hoc predicates in tests and
/// simple processors that don't want to name a type.
pub struct FnFilter<F>(pub F)
where
    F: Fn(&Record) -> bool + Send + Sync;

impl<F> EventFilter for FnFilter<F>
where
    F: Fn(&Record) -> bool + Send + Sync,
{
    fn accept(&self, record: &Record) -> bool {
        (self.0)(record)
    }
}
