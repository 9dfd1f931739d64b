// src/lib.rs
// Public library surface for the CLI and integration tests.

pub mod books;
pub mod cache;
pub mod config;
pub mod corpus;
pub mod eligibility;
pub mod error;
pub mod harmony;
pub mod metrics;
pub mod mining;
pub mod quiz;
pub mod reference;
pub mod resolver;
pub mod review;
pub mod sampler;
pub mod scoring;
pub mod weights;
pub mod xref;

// ---- Re-exports for stable public API ----
pub use crate::corpus::Corpus;
pub use crate::eligibility::{build_eligible_pool, EligiblePool, ScopeSettings};
pub use crate::error::{Result, ReviewError};
pub use crate::reference::{parse_reference, ParseMode, ReferenceParser, VerseRef};
pub use crate::resolver::BookResolver;
pub use crate::scoring::{score, CrossBookPolicy, Rating, ScoreResult, ScoringConfig};
pub use crate::weights::sample_verse;
