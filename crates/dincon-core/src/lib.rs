//! dincon-core: plumbing behind the dincon CLI
//!
//! Provides:
//! - User config and session token storage (~/.dincon)
//! - Optional settings.toml for the chat endpoint
//! - OpenAI-compatible chat completion client
//! - Project manifest and plan files
//! - Git subprocess adapter

pub mod chat;
pub mod config;
pub mod error;
pub mod git;
pub mod io;
pub mod plan;
pub mod project;
pub mod settings;

pub use chat::{ChatClient, ChatCompletion};
pub use config::{ConfigStore, UserConfig};
pub use error::DinconError;
pub use git::{CommitOutcome, Git};
pub use plan::{Plan, Step, StepType};
pub use project::{Project, ProjectManifest};
pub use settings::{AuthSettings, LlmSettings, Settings};
