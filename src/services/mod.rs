//! Business logic services.
//!
//! This module contains the client for the upstream completion API.

pub mod completion_service;

pub use completion_service::{Completion, CompletionClient};
