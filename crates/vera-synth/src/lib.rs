//! # Vera-Synth
//!
//! Synthetic data engine that replaces an expiring session's survey responses
//! with a statistically similar, non-identifying dataset.
//!
//! ## Pipeline
//!
//! ```text
//! decrypted responses
//!     ↓ NumericTable::from_records
//! [Correlation Extractor]  → target correlations (|r| > 0.3)
//!     ↓
//! [Marginal Synthesizer]   → N rows per column, sampled from a Gaussian KDE
//!     ↓
//! [Correlation Adjuster]   → iterative linear nudges toward the targets,
//!                            noise on spurious pairs, best snapshot kept
//!     ↓
//! [Bounds Enforcer]        → clip into the observed [min, max]
//!     ↓
//! SynthesisArtifact (table + filename + original/synthetic correlations)
//! ```
//!
//! Each run is single-threaded and owns its tables; failures are recovered at
//! the column or pair level, and anything else surfaces as "no artifact" from
//! the [`SynthesisOrchestrator`].

pub mod adjuster;
pub mod artifact;
pub mod bounds;
pub mod correlation;
pub mod marginal;
pub mod orchestrator;
pub mod stats;

pub use adjuster::*;
pub use artifact::*;
pub use bounds::*;
pub use correlation::*;
pub use marginal::*;
pub use orchestrator::*;
