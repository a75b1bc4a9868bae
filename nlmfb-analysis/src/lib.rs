//! # NLM-FB Analysis
//!
//! Offline tools run by hand around the experiment:
//! - Derive the human-readable passage, question and answer for each stimulus
//! - Score candidate answers with a text-completion model (log odds)
//! - Summarise model accuracy from scored files
//! - Draw balanced item lists for a pilot

pub mod accuracy;
pub mod completion_client;
pub mod error;
pub mod humanize;
pub mod log_odds;
pub mod pilot;
pub mod table;

pub use error::{AnalysisError, AnalysisResult};
pub use table::Table;

/// Answers the model spells as two tokens; scored as the pair
pub const COMPOUND_WORDS: [&str; 2] = ["cupboard", "toolbox"];

pub fn is_compound_word(word: &str) -> bool {
    COMPOUND_WORDS.contains(&word)
}
