//! Pulling stage sequences to completion
//!
//! Every stage yields `Result<T, Failure>`. Failures are logged with their
//! stage, kind and subject and recorded into the [`RunReport`]; the batch
//! always continues.

use dbtmeta_core::{Failure, RunReport};
use tracing::warn;

/// Log a failure and record it in the report
pub fn record(report: &mut RunReport, failure: Failure) {
    warn!(
        stage = %failure.stage,
        kind = %failure.kind,
        subject = %failure.subject,
        "{}",
        failure.message
    );
    report.record_failure(failure);
}

/// Drive `items` to completion, handing each success to `sink` as it is pulled
///
/// A sink error is recorded like any other failure. Returns the number of
/// items the sink accepted.
pub fn forward<T, I, F>(items: I, report: &mut RunReport, mut sink: F) -> usize
where
    I: IntoIterator<Item = Result<T, Failure>>,
    F: FnMut(T) -> Result<(), Failure>,
{
    let mut accepted = 0;
    for item in items {
        match item.and_then(&mut sink) {
            Ok(()) => accepted += 1,
            Err(failure) => record(report, failure),
        }
    }
    accepted
}

/// Drive `items` to completion and collect the successful ones
pub fn drain<T, I>(items: I, report: &mut RunReport) -> Vec<T>
where
    I: IntoIterator<Item = Result<T, Failure>>,
{
    let mut collected = Vec::new();
    forward(items, report, |item| {
        collected.push(item);
        Ok(())
    });
    collected
}
