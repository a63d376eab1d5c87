//! Language-neutral syntax IR produced by the language parsers.
//!
//! Everything here is written text as it appears in the source; no name has
//! been resolved yet. The semantic model turns these declarations into
//! `TypeRef`s and `MethodRef`s.

use serde::{Deserialize, Serialize};

/// Kind of a declared type, as written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclKind {
    Class,
    Interface,
    Struct,
    Record,
    RecordStruct,
    Enum,
}

/// One type declaration (a single part, for partial types)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    /// Dotted namespace the declaration lives in (empty for the global namespace)
    pub namespace: String,
    /// Names of the enclosing types, outermost first
    pub enclosing: Vec<String>,
    pub kind: DeclKind,
    pub modifiers: Vec<String>,
    pub attributes: Vec<String>,
    /// Base class and interfaces, as written
    pub base_types: Vec<String>,
    pub fields: Vec<MemberDecl>,
    pub properties: Vec<MemberDecl>,
    pub methods: Vec<MethodDecl>,
    /// `using` namespaces in scope for this declaration
    pub usings: Vec<String>,
    /// 1-based line of the declaration
    pub line: usize,
}

impl TypeDecl {
    /// Fully qualified name without generic arguments, e.g. `Shop.Orders.Outer.Inner`
    pub fn full_name(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if !self.namespace.is_empty() {
            parts.push(&self.namespace);
        }
        parts.extend(self.enclosing.iter().map(String::as_str));
        parts.push(&self.name);
        parts.join(".")
    }

    pub fn has_modifier(&self, modifier: &str) -> bool {
        self.modifiers.iter().any(|m| m == modifier)
    }

    pub fn is_nested(&self) -> bool {
        !self.enclosing.is_empty()
    }
}

/// A field or property: a name with a written type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDecl {
    pub name: String,
    pub type_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    pub parameters: Vec<MemberDecl>,
    pub return_type: Option<String>,
    pub attributes: Vec<String>,
    pub modifiers: Vec<String>,
    /// Locals declared anywhere in the body
    pub locals: Vec<LocalDecl>,
    /// Invocations in source pre-order
    pub invocations: Vec<Invocation>,
    pub has_body: bool,
    pub line: usize,
}

/// A local variable; `type_name` is `None` for `var`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalDecl {
    pub name: String,
    pub type_name: Option<String>,
    pub initializer: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    pub callee: Expr,
    pub arguments: Vec<Expr>,
}

impl Invocation {
    /// Name of the invoked member, if the callee names one
    pub fn member_name(&self) -> Option<&str> {
        match &self.callee {
            Expr::Identifier(name) => Some(name),
            Expr::MemberAccess { member, .. } => Some(member),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiteralKind {
    String,
    Char,
    Bool,
    Int,
    UInt,
    Long,
    ULong,
    Float,
    Double,
    Decimal,
    Null,
}

/// Just enough of the expression grammar to type call arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Identifier(String),
    This,
    MemberAccess { target: Box<Expr>, member: String },
    /// `new T(...)`; `None` for target-typed `new(...)`
    ObjectCreation { type_name: Option<String> },
    Invocation(Box<Invocation>),
    Literal(LiteralKind),
    Cast { type_name: String },
    Await(Box<Expr>),
    Other,
}

/// One parsed source file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceUnit {
    pub path: std::path::PathBuf,
    pub types: Vec<TypeDecl>,
}
