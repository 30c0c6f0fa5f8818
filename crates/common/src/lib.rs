//! Common types shared across the scribe crates.
//!
//! This crate holds the workspace error type, the template inputs that carry
//! the user's topic into every agent and task, and the credential set that
//! decides whether a pipeline can run at all.

pub mod credentials;
pub mod error;
pub mod inputs;

pub use credentials::{Credentials, MissingCredential, ModelChoice, Readiness};
pub use error::{Result, ScribeError};
pub use inputs::{Inputs, interpolate};
