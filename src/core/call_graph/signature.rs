// src/core/call_graph/signature.rs
use std::fmt;
use serde::{Deserialize, Serialize};

use crate::error::{TracerError, Result};
use super::super::model::{MethodRef, SourceModel, TypeRef};

/// Type name used in a signature when an argument's type cannot be inferred
pub const UNKNOWN_TYPE: &str = "unknown";

/// Normalized `name(type1,type2,...)` key matching call sites to declarations.
///
/// Equality is ordinal string equality: no overload resolution, generic
/// variance or optional parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalSignature(String);

impl CanonicalSignature {
    pub fn new<S: AsRef<str>>(name: &str, types: &[S]) -> Self {
        let types: Vec<&str> = types.iter().map(AsRef::as_ref).collect();
        Self(format!("{}({})", name, types.join(",")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Find the method of `container` whose signature matches exactly.
///
/// The first match in declaration order wins. A miss means the model and the
/// traversal disagree, so it is an error rather than a trace outcome.
pub fn find_method(model: &dyn SourceModel, container: &TypeRef, signature: &CanonicalSignature) -> Result<MethodRef> {
    model.declared_methods(container)
        .into_iter()
        .find(|m| &m.signature == signature)
        .ok_or_else(|| TracerError::MissingMethod {
            signature: signature.to_string(),
            owner: container.full_name.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::super::model::SemanticModel;

    #[test]
    fn test_signature_key_format() {
        let sig = CanonicalSignature::new("Save", &["Shop.Order", "int"]);
        assert_eq!(sig.as_str(), "Save(Shop.Order,int)");
        assert_eq!(CanonicalSignature::new::<&str>("Run", &[]).to_string(), "Run()");
    }

    #[test]
    fn test_signature_equality_is_order_sensitive() {
        let a = CanonicalSignature::new("foo", &["int", "string"]);
        let b = CanonicalSignature::new("foo", &["string", "int"]);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_find_method_picks_exact_overload() {
        let model = SemanticModel::from_sources(&[(
            "App",
            r#"
namespace App
{
    public class Printer
    {
        public void Print(int value) { }
        public void Print(string value) { }
        public void Print(string value, int copies) { }
    }
}
"#,
        )])
        .unwrap();
        let printer = model.find_type("App.Printer").unwrap();

        let found = find_method(&model, &printer, &CanonicalSignature::new("Print", &["string"])).unwrap();
        assert_eq!(found.parameter_types, vec!["string".to_string()]);

        let err = find_method(&model, &printer, &CanonicalSignature::new("Print", &["int", "string"])).unwrap_err();
        assert_eq!(err.to_string(), "Method Print(int,string) was not found in type App.Printer");
    }
}
