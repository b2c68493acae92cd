//! `SearchController`: the persistent worker thread and on-demand timer
//! thread that let the UCI front end accept `stop`/`ponderhit`/`quit`
//! while a search is running, generalizing the teacher's
//! spawn-per-`go` thread (`uci.rs::run_uci_loop`, `engine.rs::SimpleEngine`)
//! into the long-lived handshake `original_source/src/searchmanagement.cpp`
//! describes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::position::Position;
use crate::search::{SearchOutcome, SearchWorker};
use crate::sync::Handshake;
use crate::tt::TranspositionTable;
use crate::types::NO_MOVE;
use crate::uci_info::{Info, UciEvent};

/// Per-search parameters copied into the controller by [`SearchController::new_search`].
#[derive(Clone, Default)]
pub struct SearchLimits {
    pub max_depth: Option<u32>,
    pub max_nodes: Option<u64>,
    /// Fixed wall-clock time budget for this search (`movetime`, or the
    /// clock-derived budget computed by [`compute_time_budget`]).
    pub budget: Option<Duration>,
    /// Whether the timer should flip `abort` on timeout. False for
    /// `go infinite`, `go nodes`, and `go ponder` until `ponderhit`.
    pub manage_time: bool,
}

/// The search-time budget formula of spec.md §4.G, grounded numerically
/// on `original_source/src/searchmanagement.cpp`'s `new_ponder_search`.
#[must_use]
pub fn compute_time_budget(time_left: Duration, increment: Duration, moves_to_go: u32) -> Duration {
    let time_left_ms = time_left.as_millis() as f64;
    let max_ms = (time_left_ms * 0.95 - 1000.0).max(1.0);
    let moves = moves_to_go.max(1) as f64;
    let inc_ms = increment.as_millis() as f64;
    let budget_ms = ((max_ms + (moves - 1.0) * inc_ms) / moves).min(max_ms).max(1.0);
    Duration::from_millis(budget_ms as u64)
}

const DEFAULT_INFINITE_DEPTH: u32 = 128;

struct Job {
    position: Position,
    limits: SearchLimits,
}

/// `uci`'s handle onto the worker: owns the shared transposition table
/// and drives the four-phase handshake. All methods are meant to be
/// called from a single controller/front-end thread.
pub struct SearchController {
    handshake: Arc<Handshake>,
    tt: Arc<Mutex<TranspositionTable>>,
    job: Arc<Mutex<Option<Job>>>,
    outcome: Arc<Mutex<SearchOutcome>>,
    shutdown: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    /// True from `new_search`+`start()` until the result has been
    /// collected by `stop()` or `wait_for_finished()`; gates whether
    /// those calls need to drain the handshake at all.
    search_in_flight: bool,
}

impl SearchController {
    #[must_use]
    pub fn new(tt: Arc<Mutex<TranspositionTable>>, info_tx: Sender<UciEvent>) -> Self {
        let handshake = Handshake::new();
        let job: Arc<Mutex<Option<Job>>> = Arc::new(Mutex::new(None));
        let outcome = Arc::new(Mutex::new(empty_outcome()));
        let shutdown = Arc::new(AtomicBool::new(false));

        let worker_handshake = handshake.clone();
        let worker_tt = tt.clone();
        let worker_job = job.clone();
        let worker_outcome = outcome.clone();
        let worker_shutdown = shutdown.clone();

        let worker = std::thread::spawn(move || {
            run_worker(
                worker_handshake,
                worker_tt,
                worker_job,
                worker_outcome,
                worker_shutdown,
                info_tx,
            );
        });

        SearchController {
            handshake,
            tt,
            job,
            outcome,
            shutdown,
            worker: Some(worker),
            search_in_flight: false,
        }
    }

    #[must_use]
    pub fn tt(&self) -> &Arc<Mutex<TranspositionTable>> {
        &self.tt
    }

    /// Copies `position` and `limits` into the controller. Must not be
    /// called while the worker is still actively searching — that is a
    /// protocol violation per spec.md §7, so it is a `debug_assert!` here
    /// (and a logged no-op in release, matching the teacher's "clean
    /// rejection in release" allowance). Checked against
    /// `handshake.running` rather than `search_in_flight`, since the
    /// latter is only updated when `stop()`/`wait_for_finished()` are
    /// called and a search that completed naturally (its `bestmove`
    /// reported by the worker itself) never touches it.
    pub fn new_search(&mut self, position: Position, limits: SearchLimits) {
        let running = self.handshake.running.load(Ordering::SeqCst);
        debug_assert!(!running, "new_search called while a previous search is still in flight");
        if running {
            #[cfg(feature = "logging")]
            log::warn!("new_search ignored: a search is already in flight");
            return;
        }
        *self.job.lock() = Some(Job { position, limits });
    }

    /// Releases `wakeup`, then blocks until the worker has begun
    /// iterating.
    pub fn start(&mut self) {
        self.search_in_flight = true;
        self.handshake.start();
    }

    /// Sets `abort` and, if the worker is still running, waits for it to
    /// unwind. Returns the best result obtained so far.
    pub fn stop(&mut self) -> SearchOutcome {
        self.handshake.stop();
        self.collect_if_in_flight()
    }

    /// Enables time management for an in-progress ponder search (the
    /// timer was started without `manage_time`, so it never aborts on
    /// its own); if the first iteration already completed, the worker's
    /// next loop check picks up the new state immediately.
    pub fn ponderhit(&self) {
        self.handshake.timer_stopped.store(false, Ordering::SeqCst);
    }

    /// Blocks until the current search's `finished-ack`, for batch/bench
    /// drivers that want to run a search to natural completion.
    pub fn wait_for_finished(&mut self) -> SearchOutcome {
        self.handshake.wait_for_finished();
        self.collect_if_in_flight()
    }

    fn collect_if_in_flight(&mut self) -> SearchOutcome {
        if self.search_in_flight {
            self.search_in_flight = false;
            let guard = self.outcome.lock();
            clone_outcome(&guard)
        } else {
            let guard = self.outcome.lock();
            clone_outcome(&guard)
        }
    }

    /// `stop()`, signals shutdown, releases `wakeup` once more so the
    /// idle worker wakes and exits, then joins it.
    pub fn quit(mut self) {
        if self.search_in_flight {
            let _ = self.stop();
        }
        self.shutdown.store(true, Ordering::SeqCst);
        self.handshake.release_wakeup_for_shutdown();
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

fn empty_outcome() -> SearchOutcome {
    SearchOutcome {
        best_move: NO_MOVE,
        ponder_move: None,
        depth_reached: 0,
        nodes: 0,
    }
}

fn clone_outcome(outcome: &SearchOutcome) -> SearchOutcome {
    SearchOutcome {
        best_move: outcome.best_move,
        ponder_move: outcome.ponder_move,
        depth_reached: outcome.depth_reached,
        nodes: outcome.nodes,
    }
}

fn run_worker(
    handshake: Arc<Handshake>,
    tt: Arc<Mutex<TranspositionTable>>,
    job: Arc<Mutex<Option<Job>>>,
    outcome: Arc<Mutex<SearchOutcome>>,
    shutdown: Arc<AtomicBool>,
    info_tx: Sender<UciEvent>,
) {
    loop {
        handshake.worker_wait_for_wakeup();
        if shutdown.load(Ordering::SeqCst) {
            return;
        }
        handshake.worker_signal_running();

        let Job { position, limits } = job
            .lock()
            .take()
            .expect("start() always stores a job before releasing wakeup");

        let timer = limits
            .budget
            .map(|budget| crate::timer::DeadlineTimer::spawn(budget, handshake.clone(), limits.manage_time));

        let mut worker = SearchWorker::new(position, tt.clone(), handshake.clone(), limits.max_nodes);
        let max_depth = limits.max_depth.unwrap_or(DEFAULT_INFINITE_DEPTH);

        let mut last_sent = Instant::now()
            .checked_sub(Duration::from_secs(1))
            .unwrap_or_else(Instant::now);
        let result = worker.iterative_deepening(max_depth, |report| {
            let is_boundary = report.currmove.is_none();
            if is_boundary || last_sent.elapsed() >= Duration::from_secs(1) {
                let _ = info_tx.send(UciEvent::Progress(Info::from_report(report)));
                last_sent = Instant::now();
            }
        });

        if let Some(timer) = timer {
            timer.stop();
        }

        let best = result.best_move;
        let ponder = result.ponder_move;
        *outcome.lock() = result;
        // Sent before `worker_finish()` so the printer thread (which owns
        // the receiving end) can emit `bestmove` without the front-end
        // thread ever having to block on this search's completion.
        let _ = info_tx.send(UciEvent::BestMove { best, ponder });
        handshake.worker_finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_time_budget_divides_by_moves_to_go() {
        let budget = compute_time_budget(Duration::from_secs(30), Duration::ZERO, 30);
        // max = 30000*0.95 - 1000 = 27500; budget = 27500/30 ~= 916ms
        assert!(budget.as_millis() > 900 && budget.as_millis() < 950);
    }

    #[test]
    fn compute_time_budget_never_exceeds_max() {
        let budget = compute_time_budget(Duration::from_millis(2000), Duration::from_millis(500), 1);
        // max = 2000*0.95-1000 = 900; budget formula would overshoot without the min() clamp
        assert!(budget.as_millis() <= 900);
    }

    #[test]
    fn start_stop_round_trip_returns_a_move() {
        let tt = Arc::new(Mutex::new(TranspositionTable::new_mb(1)));
        let (tx, _rx) = crate::uci_info::channel();
        let mut controller = SearchController::new(tt, tx);
        controller.new_search(
            Position::startpos(),
            SearchLimits {
                max_depth: Some(4),
                max_nodes: None,
                budget: None,
                manage_time: false,
            },
        );
        controller.start();
        let outcome = controller.wait_for_finished();
        assert_ne!(outcome.best_move, NO_MOVE);
        controller.quit();
    }

    #[test]
    fn stop_on_infinite_search_returns_promptly() {
        let tt = Arc::new(Mutex::new(TranspositionTable::new_mb(1)));
        let (tx, _rx) = crate::uci_info::channel();
        let mut controller = SearchController::new(tt, tx);
        controller.new_search(
            Position::startpos(),
            SearchLimits {
                max_depth: None,
                max_nodes: None,
                budget: None,
                manage_time: false,
            },
        );
        controller.start();
        std::thread::sleep(Duration::from_millis(30));
        let outcome = controller.stop();
        assert_ne!(outcome.best_move, NO_MOVE);
        controller.quit();
    }
}
