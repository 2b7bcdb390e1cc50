//! Listing markup → review candidates.

mod adapter;
mod strategy;

pub use adapter::{ExtractionAdapter, ExtractionProfile, FragmentError, NO_TITLE, parse_rating};
pub use strategy::{FieldPlan, FieldStrategy, collapse_ws, compile_selector, element_text};
