// src/core/call_graph/call_classifier.rs
use serde::Serialize;
use tracing::trace;

use crate::config::AnalysisConfig;
use super::super::model::{MethodRef, SourceModel, TypeKind, TypeName, TypeRef};
use super::super::syntax::{Expr, Invocation};
use super::signature::{CanonicalSignature, UNKNOWN_TYPE};

/// How a call site reaches its target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum CallKind {
    /// `dispatcher.Send(new Request(..))`, routed to the request's handler
    DispatchedRequest { request: String },
    /// `_field.M(..)` on a model class or interface
    FieldCall { field: String, container: TypeRef },
    /// `M(..)` or `this.M(..)` on the containing type
    SelfCall { container: TypeRef },
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallSite {
    #[serde(flatten)]
    pub kind: CallKind,
    /// Member invoked on the target
    pub member: String,
    pub signature: CanonicalSignature,
}

impl CallSite {
    fn ignored(member: &str) -> Self {
        Self {
            kind: CallKind::Ignored,
            member: member.to_string(),
            signature: CanonicalSignature::new::<&str>(member, &[]),
        }
    }
}

/// Picks the interesting calls out of a method body
pub struct CallClassifier<'c> {
    config: &'c AnalysisConfig,
}

impl<'c> CallClassifier<'c> {
    pub fn new(config: &'c AnalysisConfig) -> Self {
        Self { config }
    }

    /// Classified call sites of `method` in source pre-order, ignored ones dropped
    pub fn call_sites(&self, model: &dyn SourceModel, method: &MethodRef) -> Vec<CallSite> {
        let Some(body) = model.method_body(method) else {
            return Vec::new();
        };

        body.invocations.iter()
            .map(|invocation| self.classify(model, method, invocation))
            .filter(|site| site.kind != CallKind::Ignored)
            .collect()
    }

    pub fn classify(&self, model: &dyn SourceModel, method: &MethodRef, invocation: &Invocation) -> CallSite {
        let Some(member) = invocation.member_name() else {
            return CallSite::ignored("");
        };

        if let Some(site) = self.dispatched_request(model, method, invocation) {
            return site;
        }

        match &invocation.callee {
            Expr::MemberAccess { target, member } => {
                let field = match target.as_ref() {
                    Expr::Identifier(field) => Some(field),
                    Expr::MemberAccess { target, member: field } if **target == Expr::This => Some(field),
                    _ => None,
                };
                if let Some(field) = field {
                    if let Some(container) = self.field_container(model, &method.owner, field) {
                        trace!("{}: field call {}.{}", method.qualified_name(), field, member);
                        return CallSite {
                            kind: CallKind::FieldCall { field: field.clone(), container },
                            member: member.clone(),
                            signature: self.invocation_signature(model, method, member, invocation),
                        };
                    }
                }

                if **target == Expr::This {
                    return self.self_call(model, method, member, invocation);
                }
                CallSite::ignored(member)
            }
            Expr::Identifier(name) => self.self_call(model, method, name, invocation),
            _ => CallSite::ignored(member),
        }
    }

    fn dispatched_request(&self, model: &dyn SourceModel, method: &MethodRef, invocation: &Invocation) -> Option<CallSite> {
        let Expr::MemberAccess { target, .. } = &invocation.callee else {
            return None;
        };
        let receiver = model.static_type_of(method, target)?;
        if !self.config.dispatcher_types.iter().any(|d| d == receiver.short_name()) {
            return None;
        }

        let (argument, written) = invocation.arguments.iter().find_map(|a| match a {
            Expr::ObjectCreation { type_name: Some(written) } => Some((a, written)),
            _ => None,
        })?;

        let request = TypeName::parse(written).short_name().to_string();
        let request_type = model.static_type_of(method, argument)
            .map(|t| t.full_name)
            .unwrap_or_else(|| request.clone());

        trace!("{}: dispatched request {}", method.qualified_name(), request);

        let dispatch = &self.config.dispatch_method;
        Some(CallSite {
            kind: CallKind::DispatchedRequest { request },
            member: dispatch.clone(),
            signature: CanonicalSignature::new(dispatch, &[request_type.as_str(), self.config.cancellation_type.as_str()]),
        })
    }

    /// Model class or interface type of a field, outside excluded namespaces
    fn field_container(&self, model: &dyn SourceModel, owner: &TypeRef, field: &str) -> Option<TypeRef> {
        let container = model.resolve_field_type(owner, field)?;
        if !matches!(container.kind, TypeKind::Class | TypeKind::Interface) {
            return None;
        }
        if self.config.excluded_namespaces.iter().any(|ns| container.full_name.starts_with(ns.as_str())) {
            trace!("Skipping field {} of excluded type {}", field, container);
            return None;
        }
        Some(container)
    }

    fn self_call(&self, model: &dyn SourceModel, method: &MethodRef, name: &str, invocation: &Invocation) -> CallSite {
        if !model.declares_method(&method.owner, name) {
            return CallSite::ignored(name);
        }
        trace!("{}: self call {}", method.qualified_name(), name);
        CallSite {
            kind: CallKind::SelfCall { container: method.owner.clone() },
            member: name.to_string(),
            signature: self.invocation_signature(model, method, name, invocation),
        }
    }

    fn invocation_signature(&self, model: &dyn SourceModel, method: &MethodRef, name: &str, invocation: &Invocation) -> CanonicalSignature {
        let types: Vec<String> = invocation.arguments.iter()
            .map(|a| {
                model.static_type_of(method, a)
                    .map(|t| t.full_name)
                    .unwrap_or_else(|| UNKNOWN_TYPE.to_string())
            })
            .collect();
        CanonicalSignature::new(name, &types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::super::model::SemanticModel;

    const SOURCE: &str = r#"
using System.Threading;
using Rds.Cqrs;
using Shop.Caching;

namespace Shop.Orders
{
    public interface IOrderStore { void Save(Order order, int attempt); }
    public class Order { }
    public class GetOrder { }
    public struct Stamp { public void Touch() { } }

    public class OrderService
    {
        private readonly IOrderStore _store;
        private readonly IQueryService _queries;
        private readonly ICache _cache;
        private readonly ILogger _logger;
        private Stamp _stamp;

        public void Place(Order order)
        {
            Check(order);
            _store.Save(order, 1);
            this._store.Save(new Order(), 2);
            _queries.HandleAsync(new GetOrder(), CancellationToken.None);
            _cache.Evict(order);
            _logger.Info("placed");
            _stamp.Touch();
            this.Check(order);
            Missing();
            order.ToString();
        }

        private void Check(Order order) { }
    }
}

namespace Shop.Caching
{
    public interface ICache { void Evict(object key); }
}
"#;

    fn config() -> AnalysisConfig {
        AnalysisConfig {
            excluded_namespaces: vec!["Shop.Caching".to_string()],
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn test_call_sites_are_classified_in_source_order() {
        let model = SemanticModel::from_sources(&[("Shop.Orders", SOURCE)]).unwrap();
        let config = config();
        let classifier = CallClassifier::new(&config);
        let place = model.method("Shop.Orders.OrderService", "Place");

        let sites = classifier.call_sites(&model, &place);
        let summary: Vec<String> = sites.iter()
            .map(|s| match &s.kind {
                CallKind::DispatchedRequest { request } => format!("dispatch {} {}", request, s.signature),
                CallKind::FieldCall { field, container } => format!("field {} {} {}", field, container, s.signature),
                CallKind::SelfCall { container } => format!("self {} {}", container, s.signature),
                CallKind::Ignored => "ignored".to_string(),
            })
            .collect();

        assert_eq!(summary, vec![
            "self Shop.Orders.OrderService Check(Shop.Orders.Order)",
            "field _store Shop.Orders.IOrderStore Save(Shop.Orders.Order,int)",
            "field _store Shop.Orders.IOrderStore Save(Shop.Orders.Order,int)",
            "dispatch GetOrder HandleAsync(Shop.Orders.GetOrder,CancellationToken)",
            "self Shop.Orders.OrderService Check(Shop.Orders.Order)",
        ]);
    }

    #[test]
    fn test_unknown_argument_types() {
        let model = SemanticModel::from_sources(&[(
            "App",
            r#"
namespace App
{
    public class Runner
    {
        public void Run(Widget w) { Step(w.Size, null); }
        private void Step(int size, string name) { }
    }
}
"#,
        )])
        .unwrap();
        let config = AnalysisConfig::default();
        let run = model.method("App.Runner", "Run");

        let sites = CallClassifier::new(&config).call_sites(&model, &run);
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].signature.as_str(), "Step(unknown,unknown)");
    }
}
