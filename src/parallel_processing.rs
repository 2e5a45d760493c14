// WHY: Fixed-size worker pool over independent units with order-restoring collection
// Results are slotted by dispatch index; one unit's failure stays in its own slot

use std::any::Any;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::dictionary::Lexicon;
use crate::normalizer::normalize;
use crate::report::UnknownWordSink;
use crate::resegmenter::resegment;
use crate::unit::{CleanedUnit, RawRow, Unit, UnitError, UnitOutcome};

/// Configuration for the unit scheduler
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Units processed concurrently; independent of batch size
    pub workers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().max(1),
        }
    }
}

/// Normalizer + resegmenter bound to a shared lexicon and report sink
#[derive(Clone)]
pub struct Engine {
    lexicon: Arc<dyn Lexicon>,
    sink: Arc<dyn UnknownWordSink>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(
        lexicon: Arc<dyn Lexicon>,
        sink: Arc<dyn UnknownWordSink>,
        config: EngineConfig,
    ) -> Self {
        Self { lexicon, sink, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Clean one unit synchronously, flushing its report entries in one batch
    pub fn clean_unit(&self, unit: Unit) -> CleanedUnit {
        let tokens = normalize(&unit.text);
        let result = resegment(&tokens, self.lexicon.as_ref());
        self.sink.append(&result.reports);

        debug!(
            "Cleaned unit {} (line {}): {} tokens, {} unknown",
            unit.id,
            unit.line,
            tokens.len(),
            result.reports.len()
        );

        CleanedUnit {
            line: unit.line,
            id: unit.id,
            text: result.text,
            passthrough: unit.passthrough,
            tokens: tokens.len(),
            unknown_words: result.reports.len(),
        }
    }

    /// Validate and clean one raw row
    pub fn clean_row(&self, row: RawRow) -> UnitOutcome {
        let unit = Unit::try_from(row)?;
        Ok(self.clean_unit(unit))
    }

    /// Clean every unit on the worker pool; results follow input order
    pub async fn process_all(&self, units: Vec<Unit>) -> Vec<UnitOutcome> {
        let lines: Vec<usize> = units.iter().map(|unit| unit.line).collect();
        let engine = self.clone();
        let outcomes = run_ordered(units, self.config.workers, move |unit| Ok(engine.clean_unit(unit))).await;
        let outcomes = locate_failures(outcomes, &lines);
        log_batch(&outcomes);
        outcomes
    }

    /// Like [`Engine::process_all`], validating each row inside its worker
    pub async fn process_rows(&self, rows: Vec<RawRow>) -> Vec<UnitOutcome> {
        let lines: Vec<usize> = rows.iter().map(|row| row.line).collect();
        let engine = self.clone();
        let outcomes = run_ordered(rows, self.config.workers, move |row| engine.clean_row(row)).await;
        let outcomes = locate_failures(outcomes, &lines);
        log_batch(&outcomes);
        outcomes
    }
}

/// Run `work` over `items` with at most `workers` in flight.
///
/// Each item is tagged with its index on dispatch and its result is placed
/// back into that slot, so the output order always matches the input order
/// whatever order the workers finish in. A panicking item becomes
/// [`UnitError::Worker`] in its own slot and leaves the others untouched.
pub async fn run_ordered<T, R, F>(items: Vec<T>, workers: usize, work: F) -> Vec<Result<R, UnitError>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Result<R, UnitError> + Send + Sync + 'static,
{
    let total = items.len();
    let work = Arc::new(work);
    let mut slots: Vec<Option<Result<R, UnitError>>> = (0..total).map(|_| None).collect();

    let mut completed = stream::iter(items.into_iter().enumerate())
        .map(|(index, item)| {
            let work = Arc::clone(&work);
            async move {
                let outcome = match tokio::task::spawn_blocking(move || work(item)).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        let reason = if e.is_panic() {
                            panic_message(e.into_panic())
                        } else {
                            e.to_string()
                        };
                        Err(UnitError::Worker {
                            index,
                            line: None,
                            reason,
                        })
                    }
                };
                (index, outcome)
            }
        })
        .buffer_unordered(workers.max(1));

    while let Some((index, outcome)) = completed.next().await {
        slots[index] = Some(outcome);
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.unwrap_or_else(|| {
                Err(UnitError::Worker {
                    index,
                    line: None,
                    reason: "no result collected".to_string(),
                })
            })
        })
        .collect()
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}

/// Attach source line numbers to worker failures, which only know their batch index
fn locate_failures(mut outcomes: Vec<UnitOutcome>, lines: &[usize]) -> Vec<UnitOutcome> {
    for outcome in &mut outcomes {
        if let Err(UnitError::Worker { index, line, .. }) = outcome {
            *line = lines.get(*index).copied();
        }
    }
    outcomes
}

fn log_batch(outcomes: &[UnitOutcome]) {
    let mut failed = 0usize;
    for outcome in outcomes {
        if let Err(e) = outcome {
            failed += 1;
            warn!("{}", e);
        }
    }
    info!(
        "Batch complete: {} units, {} succeeded, {} failed",
        outcomes.len(),
        outcomes.len() - failed,
        failed
    );
}
