//! Hierarchy Builders
//!
//! Pure constructors for each layer of the memory hierarchy. None of these
//! touch storage; the service persists what they return.
//!
//! ```text
//! utterance ──► OriginalProcessor ──► Original
//!                                        │ (1..n)
//!                EpisodeProcessor ◄──────┘
//!                       │
//!                       ▼
//!                   Episode ──► SemanticProcessor ──► Semantic
//!                                                        │
//!                                ThemeResolver ◄─────────┘
//!                                       │
//!                                       ▼
//!                              Theme (matched or new)
//! ```

pub mod coherence;
pub mod processors;
pub mod theme;

pub use coherence::{CoherenceEstimator, FixedCoherence, LexicalCoherence, estimator_for};
pub use processors::{EpisodeProcessor, OriginalProcessor, SemanticProcessor};
pub use theme::{ResolvedTheme, ThemeResolver};
