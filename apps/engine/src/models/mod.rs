pub mod candidate;
pub mod fit;
pub mod job;
pub mod outputs;

pub use candidate::{CandidateProfile, ExperienceEntry};
pub use fit::FitAnalysis;
pub use job::ParsedJobDescription;
pub use outputs::{DraftArtifact, GeneratedOutputs, ValidationResult};
