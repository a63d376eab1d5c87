// src/core/mod.rs
mod engine;
mod parser;
mod syntax;

// Symbol model the call graph queries
mod model;

// Call-tree tracing
mod call_graph;

// Language-specific parsers
mod languages;

pub use parser::SolutionLoader;
pub use model::SemanticModel;

pub use call_graph::{CallChainEngine, OutputFormat};

// Export the main engine
pub use engine::{Engine, TraceOptions};
