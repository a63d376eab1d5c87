// src/core/call_graph/request_index.rs
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::config::AnalysisConfig;
use super::super::model::{SourceModel, TypeKind, TypeRef};
use super::super::syntax::TypeDecl;

const ACCESS_MODIFIERS: &[&str] = &["public", "internal", "protected"];

/// Request short name -> handler type, built once before any traversal
#[derive(Debug, Clone, Default)]
pub struct RequestHandlerIndex {
    handlers: BTreeMap<String, TypeRef>,
}

impl RequestHandlerIndex {
    /// Scan the model for requests and pair each with its first handler in
    /// module scan order. Requests without a handler are left out.
    pub fn build(model: &dyn SourceModel, config: &AnalysisConfig) -> Self {
        let types = model.declared_types();
        let classes: Vec<&TypeRef> = types.iter()
            .filter(|t| t.type_ref.kind == TypeKind::Class)
            .map(|t| &t.type_ref)
            .collect();

        let mut handlers = BTreeMap::new();
        let mut requests = 0usize;

        for declared in &types {
            if !is_request_shape(&declared.type_ref, declared.decl) {
                continue;
            }
            let request = declared.type_ref.short_name();
            if handlers.contains_key(request) {
                continue;
            }
            let is_request = model.base_types(&declared.type_ref)
                .iter()
                .any(|b| config.request_markers.iter().any(|m| b.short_name() == m));
            if !is_request {
                continue;
            }
            requests += 1;

            let handler = classes.iter().find(|class| {
                model.base_types(class).iter().any(|base| {
                    config.handler_markers.iter().any(|m| model.is_generic_instantiation_of(base, m))
                        && base.type_arguments.iter().any(|a| a.short_name() == request)
                })
            });

            match handler {
                Some(handler) => {
                    debug!("Request {} is handled by {}", request, handler.full_name);
                    handlers.insert(request.to_string(), (*handler).clone());
                }
                None => debug!("Request {} has no handler", request),
            }
        }

        info!("Indexed {} handlers for {} request types", handlers.len(), requests);

        Self { handlers }
    }

    pub fn get(&self, request: &str) -> Option<&TypeRef> {
        self.handlers.get(request)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Entries sorted by request short name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypeRef)> {
        self.handlers.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Non-private classes only; nested types without an access modifier are private too
fn is_request_shape(ty: &TypeRef, decl: &TypeDecl) -> bool {
    if ty.kind != TypeKind::Class || decl.has_modifier("private") {
        return false;
    }
    if !decl.is_nested() {
        return true;
    }
    ACCESS_MODIFIERS.iter().any(|m| decl.has_modifier(m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::super::model::SemanticModel;

    const CQRS: &str = r#"
namespace Cqrs
{
    public interface IQuery<TResult> { }
    public interface ICommand { }
    public interface IQueryHandler<TQuery, TResult> { }
    public interface ICommandHandler<TCommand> { }
}
"#;

    const CATALOG: &str = r#"
using Cqrs;

namespace Shop.Catalog
{
    public class GetProduct : IQuery<Product> { }
    public record RenameProduct(string Name) : ICommand;
    public struct PeekProduct : IQuery<Product> { }
    public class Orphan : ICommand { }
    public class Product { }

    public class Outer
    {
        private class HiddenQuery : IQuery<Product> { }
        class DefaultHidden : IQuery<Product> { }
        public class VisibleQuery : IQuery<Product> { }
    }

    public class GetProductHandler : IQueryHandler<GetProduct, Product> { }
    public class SecondGetProductHandler : IQueryHandler<GetProduct, Product> { }
    public class RenameProductHandler : ICommandHandler<RenameProduct> { }
    public class PeekHandler : IQueryHandler<PeekProduct, Product> { }
    public class HiddenHandler : IQueryHandler<Outer.HiddenQuery, Product> { }
    public class VisibleHandler : IQueryHandler<Outer.VisibleQuery, Product> { }
}
"#;

    fn index() -> RequestHandlerIndex {
        let model = SemanticModel::from_sources(&[("Cqrs", CQRS), ("Shop.Catalog", CATALOG)]).unwrap();
        RequestHandlerIndex::build(&model, &AnalysisConfig::default())
    }

    #[test]
    fn test_first_handler_wins() {
        let index = index();
        assert_eq!(index.get("GetProduct").unwrap().full_name, "Shop.Catalog.GetProductHandler");
        assert_eq!(index.get("RenameProduct").unwrap().full_name, "Shop.Catalog.RenameProductHandler");
    }

    #[test]
    fn test_non_requests_are_absent() {
        let index = index();
        // value type
        assert!(index.get("PeekProduct").is_none());
        // no handler
        assert!(index.get("Orphan").is_none());
        // private nested, explicit and implicit
        assert!(index.get("HiddenQuery").is_none());
        assert!(index.get("DefaultHidden").is_none());
        assert!(index.get("Product").is_none());

        assert_eq!(index.get("VisibleQuery").unwrap().short_name(), "VisibleHandler");
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_iteration_is_sorted_by_request() {
        let index = index();
        let requests: Vec<&str> = index.iter().map(|(r, _)| r).collect();
        assert_eq!(requests, vec!["GetProduct", "RenameProduct", "VisibleQuery"]);
    }

    const ROUTING: &str = r#"
using Cqrs;

namespace Shop.Routing
{
    public class Ping : ICommand { }
    public class Pong : ICommand { }
    public class Multi : ICommandHandler<Ping>, ICommandHandler<Pong> { }

    public class GetOrder : IQuery<int> { }
    public class GetOrderLines : IQuery<int> { }
    public class LinesHandler : IQueryHandler<GetOrderLines, int> { }

    public class Outer
    {
        private protected class Sealed : ICommand { }
    }
    public class SealedHandler : ICommandHandler<Outer.Sealed> { }
}

namespace Shop.Routing.East
{
    public class Sync : ICommand { }
    public class EastSyncHandler : ICommandHandler<Sync> { }
}

namespace Shop.Routing.West
{
    public class Sync : ICommand { }
    public class WestSyncHandler : ICommandHandler<Sync> { }
}
"#;

    fn routing() -> RequestHandlerIndex {
        let model = SemanticModel::from_sources(&[("Cqrs", CQRS), ("Shop.Routing", ROUTING)]).unwrap();
        RequestHandlerIndex::build(&model, &AnalysisConfig::default())
    }

    #[test]
    fn test_one_handler_serves_several_requests() {
        let index = routing();
        assert_eq!(index.get("Ping").unwrap().full_name, "Shop.Routing.Multi");
        assert_eq!(index.get("Pong").unwrap().full_name, "Shop.Routing.Multi");
    }

    #[test]
    fn test_request_names_match_exactly() {
        let index = routing();
        assert_eq!(index.get("GetOrderLines").unwrap().full_name, "Shop.Routing.LinesHandler");
        assert!(index.get("GetOrder").is_none());
    }

    #[test]
    fn test_private_protected_nested_requests_are_skipped() {
        assert!(routing().get("Sealed").is_none());
    }

    #[test]
    fn test_duplicate_short_names_keep_the_first_resolution() {
        let index = routing();
        assert_eq!(index.get("Sync").unwrap().full_name, "Shop.Routing.East.EastSyncHandler");

        let requests: Vec<&str> = index.iter().map(|(r, _)| r).collect();
        assert_eq!(requests, vec!["GetOrderLines", "Ping", "Pong", "Sync"]);
        assert!(!index.is_empty());
    }
}
