// src/core/call_graph/entry_point_detector.rs
use std::collections::HashSet;
use serde::Serialize;
use tracing::debug;

use crate::error::{TracerError, Result};
use super::super::model::{MethodRef, SourceModel};

/// A method the trace starts from
#[derive(Debug, Clone, Serialize)]
pub struct EntryPoint {
    pub method: MethodRef,
    /// Attribute that marked the method; `None` for explicit selectors
    pub attribute: Option<String>,
}

/// Finds trace roots by attribute, or by explicit `Type.Method` selectors
pub struct EntryPointDetector {
    /// Normalized attribute names
    attributes: HashSet<String>,
}

impl EntryPointDetector {
    pub fn new(attributes: &[String]) -> Self {
        Self {
            attributes: attributes.iter().map(|a| normalize_attribute(a)).collect(),
        }
    }

    /// Every method carrying one of the entry attributes, in model order
    pub fn detect(&self, model: &dyn SourceModel) -> Vec<EntryPoint> {
        let mut entry_points = Vec::new();
        let mut seen_types = HashSet::new();

        for declared in model.declared_types() {
            // Partial parts share a key; same-named types in other modules do not
            let key = (declared.type_ref.module.clone(), declared.type_ref.full_name.clone());
            if !seen_types.insert(key) {
                continue;
            }

            for method in model.declared_methods(&declared.type_ref) {
                let Some(body) = model.method_body(&method) else {
                    continue;
                };
                let attribute = body.attributes.iter().find(|a| self.attributes.contains(&normalize_attribute(a)));
                if let Some(attribute) = attribute {
                    debug!("Entry point: {} [{}]", method.qualified_name(), attribute);
                    entry_points.push(EntryPoint {
                        attribute: Some(attribute.clone()),
                        method,
                    });
                }
            }
        }

        entry_points
    }

    /// Resolve `Type.Method` selectors; every overload of the method is selected
    pub fn select(&self, model: &dyn SourceModel, selectors: &[String]) -> Result<Vec<EntryPoint>> {
        let mut entry_points = Vec::new();

        for selector in selectors {
            let (type_name, method_name) = selector.rsplit_once('.')
                .ok_or_else(|| TracerError::Config(format!("Entry selector must be Type.Method: {}", selector)))?;

            let owner = model.find_type(type_name)
                .ok_or_else(|| TracerError::MissingType(type_name.to_string()))?;

            let methods: Vec<MethodRef> = model.declared_methods(&owner)
                .into_iter()
                .filter(|m| m.name == method_name)
                .collect();
            if methods.is_empty() {
                return Err(TracerError::MissingMethod {
                    signature: method_name.to_string(),
                    owner: owner.full_name,
                });
            }

            entry_points.extend(methods.into_iter().map(|method| EntryPoint { method, attribute: None }));
        }

        Ok(entry_points)
    }
}

/// `Shop.C4ComponentAttribute` -> `C4Component`
fn normalize_attribute(name: &str) -> String {
    let short = name.rsplit('.').next().unwrap_or(name);
    short.strip_suffix("Attribute").unwrap_or(short).to_string()
}
