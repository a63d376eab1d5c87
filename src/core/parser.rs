use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use ignore::WalkBuilder;
use regex::Regex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::ParsingConfig;
use crate::error::{TracerError, Result};
use super::languages::create_parser;
use super::syntax::SourceUnit;

const PROJECT_EXTENSION: &str = "csproj";

/// One module of the solution with its parsed source files
#[derive(Debug, Clone)]
pub struct ParsedProject {
    pub name: String,
    /// Directory holding the project file
    pub root: PathBuf,
    /// Sorted by path
    pub files: Vec<SourceUnit>,
}

/// Discovers the modules of a solution directory and parses them in parallel
pub struct SolutionLoader {
    config: ParsingConfig,
    exclude_modules: Vec<Regex>,
}

impl SolutionLoader {
    pub fn new(config: &ParsingConfig, exclude_modules: &[String]) -> Result<Self> {
        // Fail early on an unknown language rather than inside a worker
        let parser = create_parser(&config.language)?;
        for ext in &config.file_extensions {
            if !parser.file_extensions().contains(&ext.as_str()) {
                warn!("The {} parser does not handle .{} files", parser.language_name(), ext);
            }
        }

        let exclude_modules = exclude_modules.iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            config: config.clone(),
            exclude_modules,
        })
    }

    /// Load every non-excluded module under `root`, sorted by module name
    pub async fn load<P: AsRef<Path>>(&self, root: P) -> Result<Vec<ParsedProject>> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(TracerError::FileSystem(format!("Source directory not found: {}", root.display())));
        }

        info!("📖 Loading solution from {}", root.display());

        let modules = self.discover_modules(root);
        debug!("Found {} project files", modules.len());

        let fallback = root.canonicalize()
            .ok()
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "root".to_string());

        let mut grouped: BTreeMap<String, (PathBuf, Vec<PathBuf>)> = BTreeMap::new();
        for file in self.collect_sources(root)? {
            let (name, module_root) = modules.iter()
                .filter(|(_, dir)| file.starts_with(dir))
                .max_by_key(|(_, dir)| dir.components().count())
                .map(|(name, dir)| (name.clone(), dir.clone()))
                .unwrap_or_else(|| (fallback.clone(), root.to_path_buf()));

            grouped.entry(name).or_insert_with(|| (module_root, Vec::new())).1.push(file);
        }

        let mut workers = JoinSet::new();
        for (name, (module_root, mut files)) in grouped {
            if self.is_excluded(&name) {
                info!("Skipping excluded module {}", name);
                continue;
            }
            files.sort();

            let language = self.config.language.clone();
            workers.spawn_blocking(move || parse_module(&language, name, module_root, files));
        }

        let mut projects = Vec::new();
        while let Some(joined) = workers.join_next().await {
            let project = joined.map_err(|e| TracerError::Parser(format!("Module worker failed: {}", e)))??;
            debug!("Parsed module {} at {} ({} files)", project.name, project.root.display(), project.files.len());
            projects.push(project);
        }
        projects.sort_by(|a, b| a.name.cmp(&b.name));

        let file_count: usize = projects.iter().map(|p| p.files.len()).sum();
        info!("Loaded {} modules, {} source files", projects.len(), file_count);

        Ok(projects)
    }

    /// `(project name, project directory)` for every project file
    fn discover_modules(&self, root: &Path) -> Vec<(String, PathBuf)> {
        WalkDir::new(root)
            .into_iter()
            .filter_entry(|e| !self.is_ignored_dir(e.path().strip_prefix(root).unwrap_or(e.path())))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some(PROJECT_EXTENSION))
            .filter_map(|e| {
                let name = e.path().file_stem()?.to_string_lossy().to_string();
                let dir = e.path().parent()?.to_path_buf();
                Some((name, dir))
            })
            .collect()
    }

    /// Source files under `root`, honoring `.gitignore` and the size limit
    fn collect_sources(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let walker = WalkBuilder::new(root)
            .hidden(false)
            .git_ignore(true)
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| TracerError::FileSystem(e.to_string()))?;
            let path = entry.path();

            if !path.is_file() || !self.has_source_extension(path) {
                continue;
            }
            let relative = path.strip_prefix(root).unwrap_or(path);
            if relative.parent().map_or(false, |p| self.is_ignored_dir(p)) {
                continue;
            }

            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            if size > self.config.max_file_size as u64 {
                warn!("Skipping {} ({} bytes exceeds the size limit)", path.display(), size);
                continue;
            }

            files.push(path.to_path_buf());
        }

        Ok(files)
    }

    fn has_source_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| self.config.file_extensions.iter().any(|e| e == ext))
    }

    /// True when any component of the path is an ignored directory name
    fn is_ignored_dir(&self, path: &Path) -> bool {
        path.components().any(|c| {
            let name = c.as_os_str().to_string_lossy();
            self.config.ignore_dirs.iter().any(|d| *d == name)
        })
    }

    fn is_excluded(&self, module: &str) -> bool {
        self.exclude_modules.iter().any(|r| r.is_match(module))
    }
}

/// Parse one module's files on a blocking worker
fn parse_module(language: &str, name: String, root: PathBuf, files: Vec<PathBuf>) -> Result<ParsedProject> {
    let mut parser = create_parser(language)?;
    let mut units = Vec::with_capacity(files.len());

    for path in files {
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Skipping unreadable file {}: {}", path.display(), e);
                continue;
            }
        };
        units.push(parser.parse(&content, &path)?);
    }

    Ok(ParsedProject {
        name,
        root,
        files: units,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;

    fn loader() -> SolutionLoader {
        let config = ParsingConfig::default();
        SolutionLoader::new(&config, &["(?i)tests".to_string()]).unwrap()
    }

    fn solution() -> TempDir {
        let temp = TempDir::new().unwrap();
        temp.child("src/Shop.Orders/Shop.Orders.csproj").touch().unwrap();
        temp.child("src/Shop.Orders/Services/OrderService.cs")
            .write_str("namespace Shop.Orders { public class OrderService { } }")
            .unwrap();
        temp.child("src/Shop.Orders/Api/OrdersController.cs")
            .write_str("namespace Shop.Orders { public class OrdersController { } }")
            .unwrap();
        temp.child("src/Shop.Orders/obj/Generated.cs")
            .write_str("namespace Shop.Orders { public class Generated { } }")
            .unwrap();
        temp.child("src/Billing/Billing.csproj").touch().unwrap();
        temp.child("src/Billing/Invoice.cs")
            .write_str("namespace Billing { public class Invoice { } }")
            .unwrap();
        temp.child("tests/Shop.Orders.Tests/Shop.Orders.Tests.csproj").touch().unwrap();
        temp.child("tests/Shop.Orders.Tests/OrderServiceTests.cs")
            .write_str("namespace Shop.Orders.Tests { public class OrderServiceTests { } }")
            .unwrap();
        temp
    }

    #[tokio::test]
    async fn test_loads_modules_in_name_order() {
        let temp = solution();
        let projects = loader().load(temp.path()).await.unwrap();

        let names: Vec<&str> = projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Billing", "Shop.Orders"]);

        let orders = &projects[1];
        let files: Vec<String> = orders.files.iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(files, vec!["OrdersController.cs", "OrderService.cs"]);
        assert_eq!(orders.files[1].types[0].full_name(), "Shop.Orders.OrderService");
        assert!(orders.root.ends_with("src/Shop.Orders"));
    }

    #[tokio::test]
    async fn test_loose_files_form_a_root_module() {
        let temp = TempDir::new().unwrap();
        temp.child("Loose.cs").write_str("class Loose { }").unwrap();

        let projects = loader().load(temp.path()).await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].files[0].types[0].name, "Loose");
    }

    #[tokio::test]
    async fn test_oversized_files_are_skipped() {
        let temp = TempDir::new().unwrap();
        temp.child("App/App.csproj").touch().unwrap();
        temp.child("App/Small.cs").write_str("class Small { }").unwrap();
        temp.child("App/Big.cs").write_str(&"// padding\n".repeat(64)).unwrap();

        let config = ParsingConfig {
            max_file_size: 100,
            ..ParsingConfig::default()
        };
        let projects = SolutionLoader::new(&config, &[]).unwrap().load(temp.path()).await.unwrap();
        assert_eq!(projects[0].files.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_directory_is_an_error() {
        let temp = TempDir::new().unwrap();
        let err = loader().load(temp.path().join("nope")).await.unwrap_err();
        assert!(matches!(err, TracerError::FileSystem(_)));
    }
}
