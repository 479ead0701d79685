//! Embedding providers and synchronization for partdb.
//!
//! Provides the [`EmbeddingProvider`] capability (an OpenAI client and a
//! deterministic offline embedder), the configuration loader, and the
//! [`Synchronizer`] that brings stored embeddings back in line with part
//! descriptions.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod local;
pub mod openai;
pub mod provider;
pub mod resilience;
pub mod sync;

pub use config::{Config, ProviderKind};
pub use error::{ProviderError, ProviderResult, SyncError};
pub use local::LocalProvider;
pub use openai::OpenAiProvider;
pub use provider::EmbeddingProvider;
pub use sync::{BatchFailure, SyncReport, Synchronizer};
