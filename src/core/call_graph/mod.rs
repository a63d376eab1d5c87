// src/core/call_graph/mod.rs
//! Call-tree tracing for c4trace
//!
//! Starting from entry-point methods, every interesting outbound call is
//! resolved to its concrete target: same-class calls, calls through fields
//! typed as model classes or interfaces (fanned out to every implementor), and
//! request objects routed through a dispatcher to their handler. The walk is
//! depth-first and bounded only by a depth ceiling.

mod signature;
mod request_index;
mod call_classifier;
mod implementation_resolver;
mod entry_point_detector;
mod call_chain_tracer;
mod tree_renderer;
mod call_chain_engine;

pub use signature::CanonicalSignature;
pub use request_index::RequestHandlerIndex;
pub use call_classifier::CallClassifier;
pub use entry_point_detector::{EntryPoint, EntryPointDetector};
pub use call_chain_tracer::{CallChainTracer, TraceNode};
pub use tree_renderer::{OutputFormat, TreeRenderer};
pub use call_chain_engine::CallChainEngine;
