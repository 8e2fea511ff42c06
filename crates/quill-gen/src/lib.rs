// SPDX-License-Identifier: MIT
//! # quill-gen: the generation core for quill
//!
//! - **[`lifecycle`]**: the idle/generating/success/error state machine
//! - **[`pacing`]**: the char queue that turns network bursts into steady typing
//! - **[`prompt`]**: choosing and composing the model prompt
//! - **[`source`]**: the `TextSource` trait, the Gemini client and the simulated fallback
//! - **[`orchestrator`]**: ties the above to one document, one stream at a time
//! - **[`config`]** / **[`error`]**: settings and failure types

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod orchestrator;
pub mod pacing;
pub mod prompt;
pub mod source;

pub use config::GenerationConfig;
pub use error::SourceError;
pub use lifecycle::{GenerationContext, LifecycleState, Transition};
pub use orchestrator::Orchestrator;
