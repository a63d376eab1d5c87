//! Source model: the symbol view of the loaded solution that the call graph
//! core queries.
//!
//! The core only ever talks to [`SourceModel`]; [`SemanticModel`] is the
//! implementation built from tree-sitter syntax.

mod semantic;
mod type_name;

pub use semantic::SemanticModel;
pub use type_name::TypeName;

use std::fmt;
use std::hash::{Hash, Hasher};
use serde::{Deserialize, Serialize};

use super::call_graph::CanonicalSignature;
use super::syntax::{Expr, MethodDecl, TypeDecl};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    Class,
    Interface,
    Struct,
    Enum,
    /// Not declared in the loaded sources
    Unresolved,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeKind::Class => "class",
            TypeKind::Interface => "interface",
            TypeKind::Struct => "struct",
            TypeKind::Enum => "enum",
            TypeKind::Unresolved => "unresolved",
        };
        f.write_str(name)
    }
}

/// A type as the model sees it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeRef {
    /// Display name with generic arguments, e.g. `Shop.Repo<Shop.Order>`
    pub full_name: String,
    /// Name without generic arguments, e.g. `Shop.Repo`
    pub definition: String,
    pub kind: TypeKind,
    /// Declaring module; `None` for metadata-only types
    pub module: Option<String>,
    pub type_arguments: Vec<TypeRef>,
}

impl TypeRef {
    /// A type that only exists as a name (keywords, framework and package types)
    pub fn unresolved(display: impl Into<String>) -> Self {
        let display = display.into();
        let definition = match display.find('<') {
            Some(pos) => display[..pos].to_string(),
            None => display.clone(),
        };
        Self {
            full_name: display,
            definition,
            kind: TypeKind::Unresolved,
            module: None,
            type_arguments: Vec::new(),
        }
    }

    pub fn short_name(&self) -> &str {
        self.definition.rsplit('.').next().unwrap_or(&self.definition)
    }

    pub fn is_metadata(&self) -> bool {
        self.module.is_none()
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name)
    }
}

/// Position of a method declaration inside the model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MethodHandle {
    pub(crate) part: usize,
    pub(crate) method: usize,
}

/// A declared method. Identity is the owner's full name plus the canonical signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodRef {
    pub owner: TypeRef,
    pub name: String,
    pub parameter_types: Vec<String>,
    pub module: String,
    pub signature: CanonicalSignature,
    #[serde(skip)]
    pub(crate) handle: MethodHandle,
}

impl MethodRef {
    /// `Shop.Orders.OrderService.Place`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.owner.full_name, self.name)
    }
}

impl PartialEq for MethodRef {
    fn eq(&self, other: &Self) -> bool {
        self.owner.full_name == other.owner.full_name && self.signature == other.signature
    }
}

impl Eq for MethodRef {}

impl Hash for MethodRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.owner.full_name.hash(state);
        self.signature.hash(state);
    }
}

/// One declaration part of a type, with the type it declares
#[derive(Debug, Clone)]
pub struct DeclaredType<'a> {
    pub type_ref: TypeRef,
    pub decl: &'a TypeDecl,
}

/// Symbol queries the call graph core needs from a loaded solution
pub trait SourceModel {
    /// Every declaration part, in module scan order then declaration order
    fn declared_types(&self) -> Vec<DeclaredType<'_>>;

    /// Look a type up by full name, falling back to its short name
    fn find_type(&self, name: &str) -> Option<TypeRef>;

    /// Declared type of a field of `owner`; metadata-only types are excluded
    fn resolve_field_type(&self, owner: &TypeRef, field: &str) -> Option<TypeRef>;

    /// Methods declared on the type (all partial parts of it), in declaration order
    fn declared_methods(&self, ty: &TypeRef) -> Vec<MethodRef>;

    fn declares_method(&self, ty: &TypeRef, name: &str) -> bool;

    fn method_body(&self, method: &MethodRef) -> Option<&MethodDecl>;

    /// Inferred static type of an expression inside `scope`
    fn static_type_of(&self, scope: &MethodRef, expr: &Expr) -> Option<TypeRef>;

    /// Declared base class and interfaces, resolved
    fn base_types(&self, ty: &TypeRef) -> Vec<TypeRef>;

    /// Every interface the type implements, directly or through inheritance
    fn all_interfaces(&self, ty: &TypeRef) -> Vec<TypeRef>;

    fn is_generic_instantiation_of(&self, ty: &TypeRef, unbound_name: &str) -> bool {
        !ty.type_arguments.is_empty() && ty.definition.contains(unbound_name)
    }
}
