//! Settle-all fan-out.
//!
//! Every branch runs to completion and reports its own outcome. A failure or a
//! panic in one branch never cancels or affects the others.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::Instant;

use super::types::{SourceReport, SourceStatus};
use crate::metrics::SOURCE_OUTCOMES;
use crate::sources::{SourceError, SourceId};

/// What happened to one branch.
#[derive(Debug)]
pub enum Settled<T> {
    Ok(T),
    Failed(SourceError),
    Panicked(String),
}

/// One branch's outcome.
#[derive(Debug)]
pub struct SourceOutcome<T> {
    pub source: SourceId,
    pub settled: Settled<T>,
    pub elapsed: Duration,
}

impl<T> SourceOutcome<T> {
    pub fn status(&self) -> SourceStatus {
        match self.settled {
            Settled::Ok(_) => SourceStatus::Ok,
            Settled::Failed(_) => SourceStatus::Failed,
            Settled::Panicked(_) => SourceStatus::Panicked,
        }
    }

    /// The value, or `None` for failed and panicked branches.
    pub fn into_value(self) -> Option<T> {
        match self.settled {
            Settled::Ok(value) => Some(value),
            _ => None,
        }
    }

    /// Report line, with `count` applied to successful values.
    pub fn report(&self, count: impl Fn(&T) -> usize) -> SourceReport {
        let (results, error) = match &self.settled {
            Settled::Ok(value) => (count(value), None),
            Settled::Failed(e) => (0, Some(e.to_string())),
            Settled::Panicked(msg) => (0, Some(format!("panicked: {}", msg))),
        };
        SourceReport {
            source: self.source,
            status: self.status(),
            results,
            elapsed_ms: self.elapsed.as_millis() as u64,
            error,
        }
    }
}

/// Run all branches concurrently and collect every outcome, in input order.
pub async fn settle_all<T, F>(branches: Vec<(SourceId, F)>) -> Vec<SourceOutcome<T>>
where
    F: Future<Output = Result<T, SourceError>>,
{
    let futures = branches.into_iter().map(|(source, fut)| async move {
        let start = Instant::now();
        let settled = match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(Ok(value)) => Settled::Ok(value),
            Ok(Err(e)) => Settled::Failed(e),
            Err(payload) => Settled::Panicked(panic_message(payload.as_ref())),
        };
        let outcome = SourceOutcome {
            source,
            settled,
            elapsed: start.elapsed(),
        };
        SOURCE_OUTCOMES
            .with_label_values(&[source.as_str(), outcome.status().as_str()])
            .inc();
        outcome
    });
    futures::future::join_all(futures).await
}

/// Text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
