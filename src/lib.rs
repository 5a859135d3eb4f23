//! # patfam - Patent Family Resolution & Predictive Filing Inference
//!
//! patfam turns heterogeneous patent observations from multiple sources into
//! resolved patent families, then predicts unpublished national-phase
//! filings inside the statutory PCT window and projects patent-cliff
//! expiration timelines.
//!
//! ## Core Concepts
//!
//! - **PatentRecord**: One source-tagged observation of a publication
//! - **PatentFamily**: The transitive closure of records sharing priority or
//!   PCT linkage, with one priority date and one canonical applicant
//! - **InferredEvent**: A confidence-scored prediction that a family has an
//!   unpublished filing in a target jurisdiction
//! - **ApplicantProfile**: Long-term memory of how often an applicant's PCT
//!   families actually enter the target jurisdiction
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use patfam::{EngineConfig, InMemoryProfileStore, RawRecord, RecordSource, SearchPipeline};
//!
//! let store = Arc::new(InMemoryProfileStore::new());
//! let pipeline = SearchPipeline::new(EngineConfig::default(), store)?;
//!
//! let raw = vec![RawRecord::from_pairs(
//!     RecordSource::PctRegistry,
//!     [
//!         ("wo_number", "WO2016170102"),
//!         ("country", "WO"),
//!         ("priority_date", "2016-03-10"),
//!         ("applicant", "Orion Corporation"),
//!     ],
//! )];
//!
//! let outcome = pipeline.run(&raw);
//! for event in &outcome.report.inferred_events {
//!     println!("{}: {} ({})", event.target_jurisdiction, event.confidence_score, event.confidence_tier);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cliff;
pub mod config;
pub mod error;
pub mod family;
pub mod inference;
pub mod merge;
pub mod normalize;
pub mod pipeline;
pub mod profile;
pub mod record;
pub mod resolver;
pub mod store;

// Re-export primary types at crate root for convenience
pub use cliff::{CliffAnalyzer, CliffEntry, CliffKind, CliffReport, CliffSummary, RiskBucket};
pub use config::{
    CliffConfig, DeadlineTable, EngineConfig, FamilyBreadthSteps, FilingPatternCutoffs,
    InferenceConfig, MarketWeights, NormalizerConfig, ScoringWeights, TierThresholds,
    TimelineSteps,
};
pub use error::{PatfamError, PatfamResult, ValidationError};
pub use family::{FamilyId, PatentFamily};
pub use inference::{
    ConfidenceAssessment, ConfidenceTier, DeadlineStatus, EventId, FilingState, FilingWindow,
    InferenceEngine, InferredEvent, ScoreBasis, SkipReason,
};
pub use merge::{ConflictAnnotation, ReconciledFamily};
pub use normalize::{DataQualityEvent, NormalizedBatch, Normalizer, QualityIssue};
pub use pipeline::{LearningUpdate, SearchOutcome, SearchPipeline, SearchReport};
pub use profile::{canonicalize_applicant, ApplicantProfile, FilingPattern, Outcome};
pub use record::{PatentRecord, RawRecord, RecordKey, RecordSource};
pub use resolver::{resolve, ResolutionOutput, ResolvedFamily};
pub use store::{
    InMemoryProfileStore, JsonProfileStore, ProfileSnapshot, ProfileStore, StoreError,
};
