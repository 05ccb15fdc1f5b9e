//! Candidate-level search execution: sequential or pooled.
//!
//! Each candidate's search is blocking CPU-bound work with no shared state,
//! so candidates fan out over a bounded pool of worker threads. Results are
//! collected over a channel and re-ordered to the original candidate order.
//!
//! Per-candidate timeouts are enforced at the collector: a worker announces
//! when it starts a candidate, and a candidate whose result has not arrived
//! by `start + timeout` is recorded as a `Timeout` failure. CPU-bound work
//! cannot be cancelled from outside in safe Rust, so the worker thread is
//! left detached to finish; its late result is discarded with a warning.

use std::collections::{HashMap, VecDeque};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::{CandidateOutcome, InitializedModel, SearchResult};
use crate::config::SearchSettings;
use crate::registry::SearchFactory;
use crate::tuning::SearchExecutionError;

/// How `search_all` runs its candidates.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionOptions {
    /// Worker thread count. `1` runs candidates inline and sequentially
    /// (unless a timeout forces the collector machinery).
    pub workers: usize,
    /// Per-candidate wall-clock budget, measured from the moment a worker
    /// starts the candidate. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            workers: 1,
            timeout: None,
        }
    }
}

impl ExecutionOptions {
    /// Sequential, no timeout.
    pub fn sequential() -> Self {
        Self::default()
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Run one candidate through the configured search procedure.
///
/// The procedure is bound to an unfitted copy of the candidate's estimator;
/// the original instance travels into the `SearchResult` untouched.
pub(crate) fn run_candidate(
    factory: SearchFactory,
    settings: SearchSettings,
    candidate: InitializedModel,
    features: &[Vec<f64>],
    target: &[f64],
) -> Result<SearchResult, SearchExecutionError> {
    let InitializedModel {
        serial,
        model,
        grid,
        display_name,
    } = candidate;

    let mut procedure = factory(model.fresh(), grid, settings);
    info!(
        serial = %serial,
        model = %display_name,
        procedure = procedure.name(),
        "candidate search started"
    );
    let best = procedure.run(features, target)?;
    info!(serial = %serial, score = best.score, "candidate search finished");

    Ok(SearchResult {
        serial,
        model,
        best_model: best.model,
        best_params: best.params,
        best_score: best.score,
    })
}

enum WorkerMsg {
    Started { index: usize, at: Instant },
    Finished {
        index: usize,
        result: Result<SearchResult, SearchExecutionError>,
    },
}

/// Run every candidate, reporting one outcome each, in original order.
pub(crate) fn search_all(
    factory: SearchFactory,
    settings: SearchSettings,
    candidates: Vec<InitializedModel>,
    features: &[Vec<f64>],
    target: &[f64],
    options: ExecutionOptions,
) -> Vec<CandidateOutcome> {
    if candidates.is_empty() {
        return Vec::new();
    }

    if options.workers <= 1 && options.timeout.is_none() {
        return candidates
            .into_iter()
            .map(|candidate| {
                let serial = candidate.serial.clone();
                let display_name = candidate.display_name.clone();
                CandidateOutcome {
                    serial,
                    display_name,
                    outcome: run_candidate(factory, settings, candidate, features, target),
                }
            })
            .collect();
    }

    pooled(factory, settings, candidates, features, target, options)
}

fn pooled(
    factory: SearchFactory,
    settings: SearchSettings,
    candidates: Vec<InitializedModel>,
    features: &[Vec<f64>],
    target: &[f64],
    options: ExecutionOptions,
) -> Vec<CandidateOutcome> {
    let n = candidates.len();
    let workers = options.workers.max(1).min(n);

    // Workers are detached (a timed-out candidate may outlive collection),
    // so training data crosses threads as owned Arcs.
    let features: Arc<Vec<Vec<f64>>> = Arc::new(features.to_vec());
    let target: Arc<Vec<f64>> = Arc::new(target.to_vec());

    let labels: Vec<(String, String)> = candidates
        .iter()
        .map(|c| (c.serial.clone(), c.display_name.clone()))
        .collect();

    let queue: Arc<Mutex<VecDeque<(usize, InitializedModel)>>> =
        Arc::new(Mutex::new(candidates.into_iter().enumerate().collect()));
    let (tx, rx) = mpsc::channel::<WorkerMsg>();

    for _ in 0..workers {
        let queue = Arc::clone(&queue);
        let tx = tx.clone();
        let features = Arc::clone(&features);
        let target = Arc::clone(&target);
        thread::spawn(move || loop {
            let job = queue.lock().ok().and_then(|mut q| q.pop_front());
            let Some((index, candidate)) = job else { break };
            if tx
                .send(WorkerMsg::Started {
                    index,
                    at: Instant::now(),
                })
                .is_err()
            {
                break;
            }
            let result = run_candidate(factory, settings, candidate, &features, &target);
            if tx.send(WorkerMsg::Finished { index, result }).is_err() {
                break;
            }
        });
    }
    drop(tx);

    collect(rx, n, &labels, options.timeout)
}

fn collect(
    rx: mpsc::Receiver<WorkerMsg>,
    n: usize,
    labels: &[(String, String)],
    timeout: Option<Duration>,
) -> Vec<CandidateOutcome> {
    let mut outcomes: Vec<Option<Result<SearchResult, SearchExecutionError>>> =
        (0..n).map(|_| None).collect();
    let mut deadlines: HashMap<usize, Instant> = HashMap::new();
    let mut resolved = 0;

    while resolved < n {
        let message = match deadlines.values().min().copied() {
            Some(deadline) => {
                let now = Instant::now();
                if deadline <= now {
                    None
                } else {
                    match rx.recv_timeout(deadline - now) {
                        Ok(m) => Some(m),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            }
            None => match rx.recv() {
                Ok(m) => Some(m),
                Err(_) => break,
            },
        };

        match message {
            Some(WorkerMsg::Started { index, at }) => {
                if let Some(t) = timeout {
                    deadlines.insert(index, at + t);
                }
            }
            Some(WorkerMsg::Finished { index, result }) => {
                deadlines.remove(&index);
                if outcomes[index].is_none() {
                    outcomes[index] = Some(result);
                    resolved += 1;
                } else {
                    warn!(
                        serial = %labels[index].0,
                        "discarding result that arrived after its deadline"
                    );
                }
            }
            None => {
                // A deadline passed without a result: expire what's overdue
                let now = Instant::now();
                let overdue: Vec<usize> = deadlines
                    .iter()
                    .filter(|(_, d)| **d <= now)
                    .map(|(i, _)| *i)
                    .collect();
                for index in overdue {
                    deadlines.remove(&index);
                    if outcomes[index].is_none() {
                        let budget = timeout.unwrap_or_default();
                        warn!(
                            serial = %labels[index].0,
                            model = %labels[index].1,
                            timeout_secs = budget.as_secs_f64(),
                            "candidate search timed out"
                        );
                        outcomes[index] = Some(Err(SearchExecutionError::Timeout(budget)));
                        resolved += 1;
                    }
                }
            }
        }
    }

    outcomes
        .into_iter()
        .enumerate()
        .map(|(index, outcome)| {
            let (serial, display_name) = labels[index].clone();
            CandidateOutcome {
                serial,
                display_name,
                // A worker died without reporting (channel closed early)
                outcome: outcome.unwrap_or(Err(SearchExecutionError::WorkerLost)),
            }
        })
        .collect()
}
