// src/core/call_graph/tree_renderer.rs
use std::str::FromStr;

use crate::error::{TracerError, Result};
use super::call_chain_tracer::{Outcome, TraceNode};

const BRANCH: &str = "\u{2514}\u{2500}\u{2500}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = TracerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(TracerError::Config(format!("Unknown output format: {}", other))),
        }
    }
}

/// Turns trace trees into the indented text tree or JSON
pub struct TreeRenderer;

impl TreeRenderer {
    pub fn render(traces: &[TraceNode], format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Text => Ok(Self::render_text(traces)),
            OutputFormat::Json => Self::render_json(traces),
        }
    }

    /// One line per visited method or leaf marker, children one tab deeper
    pub fn render_text(traces: &[TraceNode]) -> String {
        let mut out = String::new();
        for trace in traces {
            write_node(&mut out, trace);
        }
        out
    }

    pub fn render_json(traces: &[TraceNode]) -> Result<String> {
        let mut json = serde_json::to_string_pretty(traces)?;
        json.push('\n');
        Ok(json)
    }
}

fn write_node(out: &mut String, node: &TraceNode) {
    out.push_str(&format!(
        "{}{}{}.{}() -> {}\n",
        tabs(node.depth),
        BRANCH,
        node.method.owner.full_name,
        node.method.name,
        node.method.signature
    ));

    let indent = tabs(node.depth + 1);
    for child in &node.children {
        match child {
            Outcome::ResolvedCall(child) => write_node(out, child),
            Outcome::NoImplementationsFound { interface, member } => {
                out.push_str(&format!("{}{}{}.{}() -> (no implementing classes found)\n", indent, BRANCH, interface, member));
            }
            Outcome::DepthLimitReached => {
                out.push_str(&format!("{}{}<Limit>\n", indent, BRANCH));
            }
            Outcome::NoInterestingCalls => {
                out.push_str(&format!("{}{}<Empty>\n", indent, BRANCH));
            }
        }
    }
}

fn tabs(count: usize) -> String {
    "\t".repeat(count)
}
