//! # NLM-FB Common Library
//!
//! Shared code for the experiment service and the offline analysis tools:
//! - Database bootstrap and record models
//! - Stimulus loading
//! - Configuration loading
//! - Participant access keys and admin credential hashing
//! - Timestamp helpers

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod keys;
pub mod stimuli;
pub mod time;

pub use error::{Error, Result};
pub use stimuli::{StimulusItem, StimulusSet};
