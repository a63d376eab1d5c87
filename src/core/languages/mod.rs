//! Language-specific parsers for source languages
//!
//! Each language gets its own module implementing [`LanguageParser`], turning
//! source text into the syntax IR the semantic model is built from.

mod csharp;

pub use csharp::CSharpParser;

use crate::error::{TracerError, Result};
use super::syntax::SourceUnit;

/// Trait that all language parsers must implement
pub trait LanguageParser: Send {
    /// Parse source code and extract its type declarations
    fn parse(&mut self, content: &str, file_path: &std::path::Path) -> Result<SourceUnit>;

    /// Get the file extensions this parser handles
    fn file_extensions(&self) -> &[&str];

    /// Get the language name
    fn language_name(&self) -> &str;
}

/// Create the parser registered for a language name
pub fn create_parser(language: &str) -> Result<Box<dyn LanguageParser>> {
    match language {
        "csharp" | "c#" | "cs" => Ok(Box::new(CSharpParser::new()?)),
        other => Err(TracerError::Config(format!("Unsupported language: {}", other))),
    }
}
