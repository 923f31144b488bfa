use super::record::CandidateRecord;
use crate::error::Result;
use crate::types::{Candidate, CandidateSource, RegimeKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard};

/// One `ingest_candidates` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestNote {
    /// Archive length before the batch was appended
    pub offset: usize,
    pub count: usize,
    pub note: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveSummary {
    pub total: usize,
    pub by_source: BTreeMap<String, usize>,
    pub best_by_regime: BTreeMap<RegimeKind, f64>,
    pub best_score: Option<f64>,
}

/// Append-only ledger of every evaluated candidate.
///
/// Entries are never modified after insertion. Appends take a short write lock;
/// readers get cheap `Arc` handles.
#[derive(Debug, Default)]
pub struct Archive {
    entries: RwLock<Vec<Arc<Candidate>>>,
    notes: RwLock<Vec<IngestNote>>,
}

impl Archive {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Arc<Candidate>>> {
        match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// The single write path into the archive. Returns the number appended.
    pub fn ingest_candidates(&self, candidates: Vec<Candidate>, note: Option<&str>) -> usize {
        let count = candidates.len();
        if count == 0 {
            return 0;
        }

        let offset = {
            let mut entries = match self.entries.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let offset = entries.len();
            entries.extend(candidates.into_iter().map(Arc::new));
            offset
        };

        let mut notes = match self.notes.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        notes.push(IngestNote {
            offset,
            count,
            note: note.map(str::to_string),
            timestamp: Utc::now(),
        });

        match note {
            Some(note) => log::info!("archived {} candidates ({})", count, note),
            None => log::info!("archived {} candidates", count),
        }
        count
    }

    pub fn notes(&self) -> Vec<IngestNote> {
        match self.notes.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn snapshot(&self) -> Vec<Arc<Candidate>> {
        self.read().clone()
    }

    pub fn get(&self, id: &str) -> Option<Arc<Candidate>> {
        self.read().iter().find(|c| c.id == id).cloned()
    }

    pub fn by_source(&self, source: CandidateSource) -> Vec<Arc<Candidate>> {
        self.read()
            .iter()
            .filter(|c| c.provenance.source == source)
            .cloned()
            .collect()
    }

    pub fn best_for_regime(&self, regime: RegimeKind) -> Option<Arc<Candidate>> {
        self.read()
            .iter()
            .filter(|c| c.regime.kind == regime)
            .min_by(|a, b| a.score.total_cmp(&b.score))
            .cloned()
    }

    /// Lowest-scoring `n` candidates, best first.
    pub fn top_n(&self, n: usize) -> Vec<Arc<Candidate>> {
        let mut all = self.snapshot();
        all.sort_by(|a, b| a.score.total_cmp(&b.score));
        all.truncate(n);
        all
    }

    pub fn summary(&self) -> ArchiveSummary {
        let entries = self.read();
        let mut by_source = BTreeMap::new();
        let mut best_by_regime: BTreeMap<RegimeKind, f64> = BTreeMap::new();

        for candidate in entries.iter() {
            let key = match candidate.provenance.source {
                CandidateSource::Evolutionary => "evolutionary",
                CandidateSource::Allocator => "allocator",
                CandidateSource::HandAuthored => "hand_authored",
            };
            *by_source.entry(key.to_string()).or_insert(0) += 1;
            best_by_regime
                .entry(candidate.regime.kind)
                .and_modify(|s| *s = s.min(candidate.score))
                .or_insert(candidate.score);
        }

        ArchiveSummary {
            total: entries.len(),
            best_score: best_by_regime.values().copied().min_by(f64::total_cmp),
            by_source,
            best_by_regime,
        }
    }

    pub fn records(&self) -> Vec<CandidateRecord> {
        self.read().iter().map(|c| CandidateRecord::from(c.as_ref())).collect()
    }

    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.records())?)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.export_json()?)?;
        Ok(())
    }

    /// Rebuild an archive from exported records, in order.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let records: Vec<CandidateRecord> = serde_json::from_str(&contents)?;
        let candidates = records
            .iter()
            .map(CandidateRecord::to_candidate)
            .collect::<Result<Vec<_>>>()?;

        let archive = Self::new();
        archive.ingest_candidates(candidates, Some("loaded from export"));
        Ok(archive)
    }
}
