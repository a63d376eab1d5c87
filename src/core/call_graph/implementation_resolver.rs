// src/core/call_graph/implementation_resolver.rs
use std::collections::HashSet;
use tracing::debug;

use super::super::model::{SourceModel, TypeKind, TypeRef};

/// Finds the classes behind an interface across every loaded module
pub struct ImplementationResolver;

impl ImplementationResolver {
    /// Every concrete model class whose interface closure contains
    /// `interface`, compared by full display name, in module scan order
    pub fn implementors(model: &dyn SourceModel, interface: &TypeRef) -> Vec<TypeRef> {
        let declared = model.declared_types();
        let mut seen: HashSet<String> = declared.iter()
            .filter(|d| d.decl.has_modifier("abstract"))
            .map(|d| d.type_ref.full_name.clone())
            .collect();
        let mut found = Vec::new();

        for declared in declared {
            let class = declared.type_ref;
            if class.kind != TypeKind::Class || seen.contains(&class.full_name) {
                continue;
            }
            let implements = model.all_interfaces(&class)
                .iter()
                .any(|i| i.full_name == interface.full_name);
            if implements {
                seen.insert(class.full_name.clone());
                found.push(class);
            }
        }

        debug!("{} has {} implementors", interface, found.len());
        found
    }
}
