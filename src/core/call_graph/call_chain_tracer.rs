// src/core/call_graph/call_chain_tracer.rs
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::{TracerError, Result};
use super::super::model::{MethodRef, SourceModel, TypeKind, TypeRef};
use super::call_classifier::{CallClassifier, CallKind, CallSite};
use super::implementation_resolver::ImplementationResolver;
use super::request_index::RequestHandlerIndex;
use super::signature::{find_method, CanonicalSignature};

/// One visited method and what each of its call sites led to
#[derive(Debug, Clone, Serialize)]
pub struct TraceNode {
    pub method: MethodRef,
    /// 0 for the entry point
    pub depth: usize,
    pub children: Vec<Outcome>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    ResolvedCall(TraceNode),
    /// An interface call with no implementing class in the model
    NoImplementationsFound { interface: TypeRef, member: String },
    /// The branch was cut at the depth ceiling
    DepthLimitReached,
    /// Nothing worth following: no classified calls, or an unregistered request
    NoInterestingCalls,
}

impl TraceNode {
    /// Methods visited in this tree, the root included
    pub fn node_count(&self) -> usize {
        1 + self.resolved().map(TraceNode::node_count).sum::<usize>()
    }

    /// Branches cut at the depth ceiling
    pub fn limit_count(&self) -> usize {
        let own = self.children.iter().filter(|c| matches!(c, Outcome::DepthLimitReached)).count();
        own + self.resolved().map(TraceNode::limit_count).sum::<usize>()
    }

    fn resolved(&self) -> impl Iterator<Item = &TraceNode> {
        self.children.iter().filter_map(|c| match c {
            Outcome::ResolvedCall(node) => Some(node),
            _ => None,
        })
    }
}

/// Depth-first, depth-bounded walk from an entry method.
///
/// There is no visited set: the depth ceiling is the only thing that stops a
/// recursive chain, so shared sub-paths are traced once per path.
pub struct CallChainTracer<'a> {
    model: &'a dyn SourceModel,
    index: &'a RequestHandlerIndex,
    classifier: CallClassifier<'a>,
    max_depth: usize,
}

impl<'a> CallChainTracer<'a> {
    pub fn new(
        model: &'a dyn SourceModel,
        index: &'a RequestHandlerIndex,
        classifier: CallClassifier<'a>,
        max_depth: usize,
    ) -> Self {
        Self {
            model,
            index,
            classifier,
            max_depth,
        }
    }

    /// Trace the call tree of one entry point
    pub fn trace(&self, entry: &MethodRef) -> Result<TraceNode> {
        debug!("Tracing {} (max depth: {})", entry.qualified_name(), self.max_depth);
        self.visit(entry, 0)
    }

    fn visit(&self, method: &MethodRef, depth: usize) -> Result<TraceNode> {
        let sites = self.classifier.call_sites(self.model, method);
        let mut children = Vec::new();

        if sites.is_empty() {
            children.push(Outcome::NoInterestingCalls);
        }

        for site in &sites {
            self.resolve_site(site, depth, &mut children)?;
        }

        Ok(TraceNode {
            method: method.clone(),
            depth,
            children,
        })
    }

    fn resolve_site(&self, site: &CallSite, depth: usize, children: &mut Vec<Outcome>) -> Result<()> {
        match &site.kind {
            CallKind::DispatchedRequest { request } => match self.index.get(request) {
                Some(handler) => children.push(self.descend(handler, &site.signature, depth)?),
                None => {
                    trace!("No handler registered for {}", request);
                    children.push(Outcome::NoInterestingCalls);
                }
            },
            CallKind::FieldCall { container, .. } | CallKind::SelfCall { container } => match container.kind {
                TypeKind::Interface => {
                    let implementors = ImplementationResolver::implementors(self.model, container);
                    if implementors.is_empty() {
                        children.push(Outcome::NoImplementationsFound {
                            interface: container.clone(),
                            member: site.member.clone(),
                        });
                    }
                    for implementor in &implementors {
                        children.push(self.descend(implementor, &site.signature, depth)?);
                    }
                }
                TypeKind::Class | TypeKind::Struct => {
                    children.push(self.descend(container, &site.signature, depth)?);
                }
                kind => {
                    return Err(TracerError::UnsupportedContainer {
                        container: container.full_name.clone(),
                        kind: kind.to_string(),
                    });
                }
            },
            CallKind::Ignored => {}
        }
        Ok(())
    }

    /// Look the target overload up and recurse into it, unless the child
    /// would sit at the depth ceiling
    fn descend(&self, container: &TypeRef, signature: &CanonicalSignature, depth: usize) -> Result<Outcome> {
        let target = find_method(self.model, container, signature)?;
        if depth + 1 >= self.max_depth {
            trace!("Depth limit reached at {}", target.qualified_name());
            return Ok(Outcome::DepthLimitReached);
        }
        Ok(Outcome::ResolvedCall(self.visit(&target, depth + 1)?))
    }
}
