//! Template Filler Common Library
//!
//! CLIとテストで共有される型と、I/Oを持たない照合ロジック

pub mod types;
pub mod error;
pub mod aggregate;
pub mod similarity;
pub mod rules;
pub mod prompts;
pub mod parser;

pub use types::{CellRef, FieldTable, FieldValue, MatchCandidate, MatchSource, Placeholder, PlaceholderState};
pub use error::{Error, Result};
pub use aggregate::{aggregate_table, merge_tables, parse_number, SourceSchema, SourceTable};
pub use similarity::{best_match, similarity, SimilarityMatch};
pub use rules::{PlausibilityRule, RuleKind, RuleSet};
pub use prompts::{build_match_prompt, NO_MATCH_SENTINEL, SYSTEM_PROMPT};
pub use parser::parse_match_response;
