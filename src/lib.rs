//! # Authlex
//!
//! A library for scoring free-form text against a fixed taxonomy of
//! authoritarian-language indicators, with an optional small feed-forward
//! classifier refined on user-labeled examples.
//!
//! ## Features
//!
//! - Deterministic keyword/context indicator scoring
//! - Lexicon-based sentiment tie-break boost
//! - Sentence-level training-example extraction
//! - Fixed-width bag-of-words vectorization
//! - Trainable softmax classifier with a fallback architecture
//! - Injectable best-effort artifact persistence

pub mod classifier;
pub mod context;
pub mod error;
pub mod indicator;
pub mod labeler;
pub mod scorer;
pub mod sentiment;
pub mod storage;
pub mod vectorizer;

pub mod prelude {
    pub use crate::classifier::{Prediction, TrainOptions, TrainingReport};
    pub use crate::context::AnalysisContext;
    pub use crate::error::{AuthlexError, Result};
    pub use crate::indicator::{AnalysisResult, Indicator, MatchDetail, INDICATORS};
    pub use crate::labeler::{ExampleLabeler, LabeledExample};
    pub use crate::scorer::IndicatorScorer;
    pub use crate::storage::{ArtifactStore, FileArtifactStore};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
