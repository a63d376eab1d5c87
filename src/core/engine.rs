// src/core/engine.rs
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::Config;
use super::{CallChainEngine, OutputFormat, SemanticModel, SolutionLoader};

/// Options of the `trace` command
#[derive(Debug, Clone, Default)]
pub struct TraceOptions {
    pub source: Option<PathBuf>,
    /// `Type.Method` selectors replacing attribute detection
    pub entries: Vec<String>,
    pub max_depth: Option<usize>,
    pub format: Option<String>,
    pub output: Option<PathBuf>,
}

/// Main orchestration engine: configuration, solution loading and tracing
pub struct Engine {
    config: Config,
    loader: SolutionLoader,
}

impl Engine {
    /// Create a new engine from a config file, a default location, or defaults
    pub async fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load_or_default(config_path).context("Failed to load configuration")?;
        Self::with_config(config)
    }

    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Invalid configuration")?;
        debug!("Loaded configuration: {:?}", config);

        let loader = SolutionLoader::new(&config.parsing, &config.project.exclude_modules)?;

        Ok(Self { config, loader })
    }

    /// Trace the solution and write the trees to stdout or a file
    pub async fn trace(&self, options: TraceOptions) -> Result<()> {
        let rendered = self.render_trace(&options).await?;
        write_output(options.output.as_deref(), &rendered)
    }

    /// Trace the solution and return the rendered output
    pub async fn render_trace(&self, options: &TraceOptions) -> Result<String> {
        let format: OutputFormat = options.format.as_deref()
            .unwrap_or(&self.config.output.format)
            .parse()?;
        let model = self.load_model(options.source.as_deref()).await?;

        let mut engine = CallChainEngine::new(self.config.analysis.clone());
        if let Some(max_depth) = options.max_depth {
            anyhow::ensure!(max_depth > 0, "--max-depth must be at least 1");
            engine = engine.with_max_depth(max_depth);
        }

        let report = engine.run(&model, &options.entries, format).context("Call tracing failed")?;
        let stats = &report.stats;
        info!(
            "✅ Traced {} entry points: {} nodes, {} depth limits, {} requests indexed in {}ms",
            stats.entry_points_found, stats.nodes_visited, stats.limits_hit, stats.requests_indexed, stats.analysis_time_ms
        );
        Ok(report.rendered)
    }

    /// `request -> handler` lines sorted by request name
    pub async fn handlers(&self, source: Option<PathBuf>) -> Result<()> {
        let model = self.load_model(source.as_deref()).await?;
        let index = CallChainEngine::new(self.config.analysis.clone()).handlers(&model);
        if index.is_empty() {
            warn!("No request handlers found");
        }

        let mut out = String::new();
        for (request, handler) in index.iter() {
            out.push_str(&format!("{} -> {}\n", request, handler.full_name));
        }
        write_output(None, &out)
    }

    /// One `Type.Method() -> signature` line per detected entry point
    pub async fn entries(&self, source: Option<PathBuf>) -> Result<()> {
        let model = self.load_model(source.as_deref()).await?;
        let entry_points = CallChainEngine::new(self.config.analysis.clone()).entry_points(&model, &[])?;

        let mut out = String::new();
        for entry in &entry_points {
            out.push_str(&format!("{}() -> {}\n", entry.method.qualified_name(), entry.method.signature));
        }
        write_output(None, &out)
    }

    /// Write a default configuration file
    pub async fn init(&self, path: Option<PathBuf>, force: bool) -> Result<()> {
        let target_dir = match path {
            Some(path) => path,
            None => std::env::current_dir().context("Failed to read the current directory")?,
        };
        let config_path = target_dir.join(Config::candidate_files()[0]);

        if config_path.exists() && !force {
            anyhow::bail!("{} already exists (use --force to overwrite)", config_path.display());
        }

        std::fs::create_dir_all(&target_dir)
            .with_context(|| format!("Failed to create {}", target_dir.display()))?;
        Config::default().save(&config_path)?;

        info!("✅ Wrote {}", config_path.display());
        Ok(())
    }

    async fn load_model(&self, source: Option<&Path>) -> Result<SemanticModel> {
        let source_dir = source.unwrap_or(&self.config.project.source_dir);
        info!("🔍 Tracing {} ({})", self.config.project.name, source_dir.display());

        let projects = self.loader.load(source_dir).await
            .with_context(|| format!("Failed to load solution from {}", source_dir.display()))?;
        Ok(SemanticModel::build(projects))
    }
}

fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Output written to {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;
    use predicates::prelude::*;

    fn solution() -> TempDir {
        let temp = TempDir::new().unwrap();
        temp.child("Shop.Api/Shop.Api.csproj").touch().unwrap();
        temp.child("Shop.Api/OrdersController.cs")
            .write_str(
                r#"
using Shop.Core;

namespace Shop.Api
{
    public class OrdersController
    {
        private readonly IOrderService _orders;
        private readonly IQueryService _queries;

        [C4Component("Orders", "Order API")]
        public void Place(int id)
        {
            _orders.Place(id);
            _queries.Ask(new GetOrder());
        }
    }
}
"#,
            )
            .unwrap();
        temp.child("Shop.Core/Shop.Core.csproj").touch().unwrap();
        temp.child("Shop.Core/Orders.cs")
            .write_str(
                r#"
namespace Shop.Core
{
    public interface IOrderService { void Place(int id); }
    public class GetOrder : IQuery<string> { }

    public class OrderService : IOrderService
    {
        private readonly IAudit _audit;
        public void Place(int id) { _audit.Write(id); }
    }

    public interface IAudit { void Write(int id); }
}
"#,
            )
            .unwrap();
        temp
    }

    fn engine() -> Engine {
        Engine::with_config(Config::default()).unwrap()
    }

    #[tokio::test]
    async fn test_trace_renders_text_tree() {
        let temp = solution();
        let options = TraceOptions {
            source: Some(temp.path().to_path_buf()),
            ..TraceOptions::default()
        };
        let rendered = engine().render_trace(&options).await.unwrap();

        let expected = "\
└──Shop.Api.OrdersController.Place() -> Place(int)
\t└──Shop.Core.OrderService.Place() -> Place(int)
\t\t└──Shop.Core.IAudit.Write() -> (no implementing classes found)
\t└──<Empty>
";
        assert_eq!(rendered, expected);
    }

    #[tokio::test]
    async fn test_trace_json_output_to_file() {
        let temp = solution();
        let output = temp.child("trace.json");
        let options = TraceOptions {
            source: Some(temp.path().to_path_buf()),
            format: Some("json".to_string()),
            output: Some(output.path().to_path_buf()),
            ..TraceOptions::default()
        };
        engine().trace(options).await.unwrap();

        output.assert(predicate::str::contains("\"outcome\": \"no_implementations_found\""));
        output.assert(predicate::str::contains("\"signature\": \"Place(int)\""));
    }

    #[tokio::test]
    async fn test_unknown_entry_selector_fails_without_output() {
        let temp = solution();
        let output = temp.child("trace.txt");
        let options = TraceOptions {
            source: Some(temp.path().to_path_buf()),
            entries: vec!["OrdersController.Cancel".to_string()],
            output: Some(output.path().to_path_buf()),
            ..TraceOptions::default()
        };

        let err = engine().trace(options).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Method Cancel was not found in type Shop.Api.OrdersController"));
        output.assert(predicate::path::missing());
    }

    #[tokio::test]
    async fn test_init_refuses_to_overwrite() {
        let temp = TempDir::new().unwrap();
        let engine = engine();

        engine.init(Some(temp.path().to_path_buf()), false).await.unwrap();
        temp.child("C4Trace.toml").assert(predicate::str::contains("[analysis]"));

        assert!(engine.init(Some(temp.path().to_path_buf()), false).await.is_err());
        assert!(engine.init(Some(temp.path().to_path_buf()), true).await.is_ok());
    }
}
