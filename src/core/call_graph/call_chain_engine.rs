// src/core/call_graph/call_chain_engine.rs
use tracing::{debug, info};

use crate::config::AnalysisConfig;
use crate::error::Result;
use super::super::model::SemanticModel;
use super::{
    CallChainTracer, CallClassifier, EntryPoint, EntryPointDetector, OutputFormat,
    RequestHandlerIndex, TraceNode, TreeRenderer,
};

/// Orchestrates index building, entry detection, tracing and rendering
pub struct CallChainEngine {
    config: AnalysisConfig,
    entry_point_detector: EntryPointDetector,
}

/// Output of one run
#[derive(Debug, Clone)]
pub struct TraceReport {
    /// Output in the requested format, complete or not at all
    pub rendered: String,
    pub stats: TraceStatistics,
}

#[derive(Debug, Clone, Default)]
pub struct TraceStatistics {
    pub requests_indexed: usize,
    pub entry_points_found: usize,
    pub nodes_visited: usize,
    pub limits_hit: usize,
    pub analysis_time_ms: u128,
}

impl CallChainEngine {
    pub fn new(config: AnalysisConfig) -> Self {
        let entry_point_detector = EntryPointDetector::new(&config.entry_attributes);
        Self {
            config,
            entry_point_detector,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    pub fn handlers(&self, model: &SemanticModel) -> RequestHandlerIndex {
        RequestHandlerIndex::build(model, &self.config)
    }

    /// Explicit selectors when given, attributed methods otherwise
    pub fn entry_points(&self, model: &SemanticModel, selectors: &[String]) -> Result<Vec<EntryPoint>> {
        if selectors.is_empty() {
            Ok(self.entry_point_detector.detect(model))
        } else {
            self.entry_point_detector.select(model, selectors)
        }
    }

    /// Trace every entry point and render the trees.
    ///
    /// Any lookup failure aborts the whole run before anything is rendered.
    pub fn run(&self, model: &SemanticModel, selectors: &[String], format: OutputFormat) -> Result<TraceReport> {
        let start_time = std::time::Instant::now();
        let model_stats = model.stats();
        info!(
            "🕸️ Model: {} modules, {} types, {} methods",
            model_stats.modules, model_stats.types, model_stats.methods
        );

        let index = self.handlers(model);

        info!("🚪 Detecting entry points...");
        let entry_points = self.entry_points(model, selectors)?;
        info!("Found {} entry points", entry_points.len());

        info!("🔗 Tracing call chains (max depth: {})...", self.config.max_depth);
        let tracer = CallChainTracer::new(model, &index, CallClassifier::new(&self.config), self.config.max_depth);
        let mut traces = Vec::with_capacity(entry_points.len());
        for entry in &entry_points {
            let trace = tracer.trace(&entry.method)?;
            debug!("{}: {} nodes", entry.method.qualified_name(), trace.node_count());
            traces.push(trace);
        }

        let rendered = TreeRenderer::render(&traces, format)?;

        let stats = TraceStatistics {
            requests_indexed: index.len(),
            entry_points_found: entry_points.len(),
            nodes_visited: traces.iter().map(TraceNode::node_count).sum(),
            limits_hit: traces.iter().map(TraceNode::limit_count).sum(),
            analysis_time_ms: start_time.elapsed().as_millis(),
        };

        Ok(TraceReport { rendered, stats })
    }
}

impl Default for CallChainEngine {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHOP: &str = r#"
namespace Shop
{
    public interface IService { void Do(int x); }
    public class B : IService { public void Do(int x) { } }
    public class C : IService { public void Do(int x) { } }

    public class A
    {
        private readonly IService _svc;

        [C4Component("A", "Runs")]
        public void Run() { Helper(); }

        private void Helper() { _svc.Do(1); }
    }
}
"#;

    #[test]
    fn test_run_renders_attributed_entry_points() {
        let model = SemanticModel::from_sources(&[("Shop", SHOP)]).unwrap();
        let report = CallChainEngine::default().run(&model, &[], OutputFormat::Text).unwrap();

        let expected = "\
└──Shop.A.Run() -> Run()
\t└──Shop.A.Helper() -> Helper()
\t\t└──Shop.B.Do() -> Do(int)
\t\t\t└──<Empty>
\t\t└──Shop.C.Do() -> Do(int)
\t\t\t└──<Empty>
";
        assert_eq!(report.rendered, expected);
        assert_eq!(report.stats.entry_points_found, 1);
        assert_eq!(report.stats.nodes_visited, 4);
        assert_eq!(report.stats.limits_hit, 0);
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let model = SemanticModel::from_sources(&[("Shop", SHOP)]).unwrap();
        let engine = CallChainEngine::default();

        let first = engine.run(&model, &[], OutputFormat::Text).unwrap();
        let second = engine.run(&model, &[], OutputFormat::Text).unwrap();
        assert_eq!(first.rendered, second.rendered);
    }

    #[test]
    fn test_max_depth_override() {
        let model = SemanticModel::from_sources(&[("Shop", SHOP)]).unwrap();
        let engine = CallChainEngine::default().with_max_depth(2);

        let report = engine.run(&model, &["A.Run".to_string()], OutputFormat::Text).unwrap();
        let expected = "\
└──Shop.A.Run() -> Run()
\t└──Shop.A.Helper() -> Helper()
\t\t└──<Limit>
\t\t└──<Limit>
";
        assert_eq!(report.rendered, expected);
        assert_eq!(report.stats.limits_hit, 2);
    }
}
