//! Core data structures: event tables and sample metadata.

pub mod event_table;
pub mod metadata;

pub use event_table::EventTable;
pub use metadata::{parse_filename, MetadataField, NamingConvention, Rule, RuleAction, RuleSet, SampleMetadata};
