use crate::engine::{DiscoveryEngine, EngineState};
use crate::engines::allocator::ExplorationEvent;
use crate::engines::generation::GenerationStats;
use crate::error::{CurveLabError, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

/// Which search strategy each step runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExploreMode {
    Generations,
    Allocation,
    /// Generation on even steps, allocation on odd ones
    Alternating,
}

/// Progress update from the explorer thread
#[derive(Debug, Clone, PartialEq)]
pub enum ExplorerUpdate {
    Generation { step: u64, stats: Vec<GenerationStats> },
    Allocation { step: u64, event: ExplorationEvent },
    StepFailed { step: u64, error: String },
    Finished { steps: u64, cancelled: bool },
}

#[derive(Default)]
struct PauseGate {
    paused: Mutex<bool>,
    wake: Condvar,
}

impl PauseGate {
    fn lock(&self) -> MutexGuard<'_, bool> {
        match self.paused.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn set(&self, paused: bool) {
        *self.lock() = paused;
        self.wake.notify_all();
    }

    /// Block while paused. Returns early once `cancel` is raised.
    fn wait(&self, cancel: &AtomicBool) {
        let mut paused = self.lock();
        while *paused && !cancel.load(Ordering::SeqCst) {
            paused = match self.wake.wait(paused) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }
}

/// Background auto-explore loop.
///
/// Cancellation and pausing take effect between steps, never inside an evaluation.
/// State lives behind a shared mutex, so pausing, resuming or cancelling never
/// loses accumulated populations or branches.
pub struct AutoExplorer {
    handle: Option<JoinHandle<u64>>,
    progress_rx: Receiver<ExplorerUpdate>,
    cancel_flag: Arc<AtomicBool>,
    gate: Arc<PauseGate>,
    state: Arc<Mutex<EngineState>>,
}

impl AutoExplorer {
    /// Start exploring in a background thread. Runs until cancelled, or for
    /// `max_steps` steps when given.
    pub fn start(
        engine: Arc<DiscoveryEngine>,
        state: Arc<Mutex<EngineState>>,
        mode: ExploreMode,
        max_steps: Option<u64>,
        seed: u64,
    ) -> Result<Self> {
        let (progress_tx, progress_rx) = channel();
        let cancel_flag = Arc::new(AtomicBool::new(false));
        let gate = Arc::new(PauseGate::default());

        let thread_cancel = Arc::clone(&cancel_flag);
        let thread_gate = Arc::clone(&gate);
        let thread_state = Arc::clone(&state);

        let handle = thread::Builder::new()
            .name("curvelab-explorer".to_string())
            .spawn(move || {
                Self::run(
                    engine,
                    thread_state,
                    mode,
                    max_steps,
                    seed,
                    progress_tx,
                    thread_cancel,
                    thread_gate,
                )
            })?;

        log::info!("auto-explore started in {:?} mode", mode);

        Ok(Self {
            handle: Some(handle),
            progress_rx,
            cancel_flag,
            gate,
            state,
        })
    }

    /// Poll for progress updates (non-blocking)
    pub fn poll_progress(&self) -> Option<ExplorerUpdate> {
        self.progress_rx.try_recv().ok()
    }

    pub fn state(&self) -> Arc<Mutex<EngineState>> {
        Arc::clone(&self.state)
    }

    pub fn pause(&self) {
        self.gate.set(true);
    }

    pub fn resume(&self) {
        self.gate.set(false);
    }

    pub fn is_paused(&self) -> bool {
        *self.gate.lock()
    }

    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
        self.gate.wake.notify_all();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Wait for the loop to end and return the number of completed steps.
    pub fn join(mut self) -> Result<u64> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| CurveLabError::Evaluation("explorer thread panicked".to_string())),
            None => Ok(0),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn run(
        engine: Arc<DiscoveryEngine>,
        state: Arc<Mutex<EngineState>>,
        mode: ExploreMode,
        max_steps: Option<u64>,
        seed: u64,
        progress_tx: Sender<ExplorerUpdate>,
        cancel_flag: Arc<AtomicBool>,
        gate: Arc<PauseGate>,
    ) -> u64 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut steps = 0u64;

        loop {
            gate.wait(&cancel_flag);
            if cancel_flag.load(Ordering::SeqCst) || max_steps.is_some_and(|max| steps >= max) {
                break;
            }

            let current = match state.lock() {
                Ok(guard) => guard.clone(),
                Err(poisoned) => poisoned.into_inner().clone(),
            };

            let allocate = match mode {
                ExploreMode::Generations => false,
                ExploreMode::Allocation => true,
                ExploreMode::Alternating => steps % 2 == 1,
            };

            let (next, update) = if allocate {
                match engine.allocation_step(&current, &mut rng) {
                    Ok((next, event)) => (Some(next), ExplorerUpdate::Allocation { step: steps, event }),
                    Err(e) => {
                        log::warn!("allocation step {} failed: {}", steps, e);
                        (None, ExplorerUpdate::StepFailed { step: steps, error: e.to_string() })
                    }
                }
            } else {
                let (next, stats) = engine.generation_step(&current, &mut rng);
                (Some(next), ExplorerUpdate::Generation { step: steps, stats })
            };

            if let Some(next) = next {
                match state.lock() {
                    Ok(mut guard) => *guard = next,
                    Err(poisoned) => *poisoned.into_inner() = next,
                }
            }
            let _ = progress_tx.send(update);
            steps += 1;
        }

        let cancelled = cancel_flag.load(Ordering::SeqCst);
        log::info!("auto-explore stopped after {} steps (cancelled: {})", steps, cancelled);
        let _ = progress_tx.send(ExplorerUpdate::Finished { steps, cancelled });
        steps
    }
}

impl Drop for AutoExplorer {
    fn drop(&mut self) {
        self.cancel();
    }
}
