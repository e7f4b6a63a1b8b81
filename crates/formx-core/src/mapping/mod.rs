//! Schema mapping: rule tables and the tiered engine.

pub mod engine;
pub mod rules;

pub use engine::{MappingEngine, MappingReport};
pub use rules::{IdentifierRule, LabelRule, MappingRules};
