//! Core types shared by every stage of the update pipeline.
//!
//! Currently this is the error taxonomy: [`UpdateError`] for the library and
//! [`ErrorContext`] / [`user_friendly_error`] for presenting failures in the CLI.

pub mod error;

pub use error::{ErrorContext, InstallStage, Result, UpdateError, user_friendly_error};
