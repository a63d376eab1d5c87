use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{TracerError, Result};

/// Default depth ceiling of a trace
pub const DEFAULT_MAX_DEPTH: usize = 15;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Source code parsing configuration
    pub parsing: ParsingConfig,

    /// Call resolution and traversal settings
    pub analysis: AnalysisConfig,

    /// Output settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Root of the solution to analyze
    pub source_dir: PathBuf,

    /// Regex patterns; modules whose name matches any of them are not loaded
    pub exclude_modules: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingConfig {
    /// Source language of the solution
    pub language: String,

    /// File extensions to parse
    pub file_extensions: Vec<String>,

    /// Maximum file size to parse (in bytes)
    pub max_file_size: usize,

    /// Directory names never descended into (build output and the like)
    pub ignore_dirs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Depth at which a branch is cut with a `<Limit>` leaf
    pub max_depth: usize,

    /// Attributes marking a method as a trace root
    pub entry_attributes: Vec<String>,

    /// Short names of the request dispatcher abstractions
    pub dispatcher_types: Vec<String>,

    /// Base type short names marking a class as a request
    pub request_markers: Vec<String>,

    /// Generic base type names marking a class as a request handler
    pub handler_markers: Vec<String>,

    /// Method every handler exposes to the dispatcher
    pub dispatch_method: String,

    /// Trailing parameter type of the dispatch method
    pub cancellation_type: String,

    /// Field types under these namespace prefixes are never followed
    pub excluded_namespaces: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format (text, json)
    pub format: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "Unnamed Solution".to_string(),
            source_dir: PathBuf::from("."),
            exclude_modules: vec!["(?i)tests".to_string()],
        }
    }
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            language: "csharp".to_string(),
            file_extensions: vec!["cs".to_string()],
            max_file_size: 1024 * 1024, // 1MB
            ignore_dirs: vec!["bin".to_string(), "obj".to_string(), ".git".to_string()],
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            entry_attributes: vec!["C4Component".to_string()],
            dispatcher_types: vec!["IQueryService".to_string(), "ICommandProcessor".to_string()],
            request_markers: vec!["IQuery".to_string(), "ICommand".to_string()],
            handler_markers: vec!["IQueryHandler".to_string(), "ICommandHandler".to_string()],
            dispatch_method: "HandleAsync".to_string(),
            cancellation_type: "CancellationToken".to_string(),
            excluded_namespaces: Vec::new(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| TracerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TracerError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Ok(Self::default())
                }
            }
            None => {
                // Try common config file locations
                for candidate in Self::candidate_files() {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn candidate_files() -> [&'static str; 3] {
        ["C4Trace.toml", "c4trace.toml", ".c4trace.toml"]
    }

    /// Reject settings the tracer cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.analysis.max_depth == 0 {
            return Err(TracerError::Config("analysis.max_depth must be at least 1".to_string()));
        }

        for pattern in &self.project.exclude_modules {
            regex::Regex::new(pattern)?;
        }

        match self.output.format.as_str() {
            "text" | "json" => Ok(()),
            other => Err(TracerError::Config(format!("Unknown output format: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
[analysis]
max_depth = 4
excluded_namespaces = ["Shop.Caching"]
"#,
        )
        .unwrap();

        assert_eq!(config.analysis.max_depth, 4);
        assert_eq!(config.analysis.excluded_namespaces, vec!["Shop.Caching".to_string()]);
        assert_eq!(config.analysis.dispatch_method, "HandleAsync");
        assert_eq!(config.parsing.language, "csharp");
        assert_eq!(config.output.format, "text");
    }

    #[test]
    fn test_save_and_load_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c4trace.toml");

        let mut config = Config::default();
        config.project.name = "Shop".to_string();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.project.name, "Shop");
        assert_eq!(loaded.analysis.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_validate_rejects_zero_depth_and_bad_patterns() {
        let mut config = Config::default();
        config.analysis.max_depth = 0;
        assert!(matches!(config.validate(), Err(TracerError::Config(_))));

        let mut config = Config::default();
        config.project.exclude_modules = vec!["(unclosed".to_string()];
        assert!(matches!(config.validate(), Err(TracerError::Pattern(_))));

        let mut config = Config::default();
        config.output.format = "yaml".to_string();
        assert!(config.validate().is_err());
    }
}
