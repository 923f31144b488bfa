pub mod mechanism;
pub mod record;
pub mod store;

pub use mechanism::{
    candidate_to_mechanism, mechanism_from_json, mechanism_to_candidate, mechanism_to_json, Mechanism,
};
pub use record::{CandidateRecord, EvaluationSettings};
pub use store::{Archive, ArchiveSummary, IngestNote};
