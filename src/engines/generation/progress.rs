use super::evolution_engine::{GenerationStats, ProgressCallback};
use crate::types::RegimeKind;
use std::sync::mpsc::Sender;

/// Writes progress to the `log` facade
pub struct LogProgressCallback;

impl ProgressCallback for LogProgressCallback {
    fn on_generation_start(&mut self, regime: RegimeKind, generation: u64) {
        log::debug!("{} generation {} starting", regime, generation);
    }

    fn on_generation_complete(&mut self, stats: &GenerationStats) {
        log::info!(
            "{} generation {} complete. best {:.5}, mean {:.5}, champion {:.5}, front {}",
            stats.regime,
            stats.generation,
            stats.best_score,
            stats.mean_score,
            stats.champion_score,
            stats.front_size
        );
    }

    fn on_candidate_evaluated(&mut self, evaluated: usize, total: usize) {
        log::trace!("evaluated {}/{} candidates", evaluated, total);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressMessage {
    GenerationStart { regime: RegimeKind, generation: u64 },
    GenerationComplete(GenerationStats),
    CandidatesEvaluated { evaluated: usize, total: usize },
}

/// Forwards progress to another thread
pub struct ChannelProgressCallback {
    sender: Sender<ProgressMessage>,
}

impl ChannelProgressCallback {
    pub fn new(sender: Sender<ProgressMessage>) -> Self {
        Self { sender }
    }
}

impl ProgressCallback for ChannelProgressCallback {
    fn on_generation_start(&mut self, regime: RegimeKind, generation: u64) {
        let _ = self
            .sender
            .send(ProgressMessage::GenerationStart { regime, generation });
    }

    fn on_generation_complete(&mut self, stats: &GenerationStats) {
        let _ = self
            .sender
            .send(ProgressMessage::GenerationComplete(stats.clone()));
    }

    fn on_candidate_evaluated(&mut self, evaluated: usize, total: usize) {
        let _ = self
            .sender
            .send(ProgressMessage::CandidatesEvaluated { evaluated, total });
    }
}
