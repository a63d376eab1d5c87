use std::path::Path;
use tree_sitter::{Node, Parser};

use crate::error::{TracerError, Result};
use super::LanguageParser;
use super::super::syntax::{
    DeclKind, Expr, Invocation, LiteralKind, LocalDecl, MemberDecl, MethodDecl, SourceUnit, TypeDecl,
};

const MODIFIERS: &[&str] = &[
    "public", "private", "protected", "internal", "file", "static", "abstract", "sealed",
    "partial", "async", "virtual", "override", "readonly", "new", "unsafe", "extern", "required",
];

/// C#-specific parser using Tree-sitter
pub struct CSharpParser {
    parser: Parser,
}

/// Lexical context of a declaration
#[derive(Debug, Clone, Default)]
struct Scope {
    namespace: String,
    usings: Vec<String>,
    enclosing: Vec<String>,
}

impl CSharpParser {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let csharp_language = tree_sitter_c_sharp::language();
        parser.set_language(&csharp_language)
            .map_err(|e| TracerError::Parser(format!("Failed to set C# language: {}", e)))?;

        Ok(Self { parser })
    }
}

impl LanguageParser for CSharpParser {
    fn parse(&mut self, content: &str, file_path: &Path) -> Result<SourceUnit> {
        let tree = self.parser.parse(content, None)
            .ok_or_else(|| TracerError::Parser(format!("Failed to parse {}", file_path.display())))?;

        let mut types = Vec::new();
        self.extract_declarations(tree.root_node(), content, &Scope::default(), &mut types);

        Ok(SourceUnit {
            path: file_path.to_path_buf(),
            types,
        })
    }

    fn file_extensions(&self) -> &[&str] {
        &["cs"]
    }

    fn language_name(&self) -> &str {
        "csharp"
    }
}

impl CSharpParser {
    /// Walk a compilation unit or namespace body, collecting type declarations
    fn extract_declarations(&self, node: Node, source: &str, outer: &Scope, types: &mut Vec<TypeDecl>) {
        let mut scope = outer.clone();
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();

        // Usings apply to the whole container regardless of their position
        for child in &children {
            if child.kind() == "using_directive" {
                if let Some(namespace) = using_namespace(&node_text(*child, source)) {
                    scope.usings.push(namespace);
                }
            }
        }

        for child in children {
            match child.kind() {
                "namespace_declaration" => {
                    let mut inner = scope.clone();
                    if let Some(name) = child.child_by_field_name("name") {
                        inner.namespace = join_namespace(&scope.namespace, &normalize_type(&node_text(name, source)));
                    }
                    if let Some(body) = child.child_by_field_name("body") {
                        self.extract_declarations(body, source, &inner, types);
                    }
                }
                "file_scoped_namespace_declaration" => {
                    // Members that follow are siblings in older grammars, children in newer ones
                    if let Some(name) = child.child_by_field_name("name") {
                        scope.namespace = join_namespace(&outer.namespace, &normalize_type(&node_text(name, source)));
                    }
                    self.extract_declarations(child, source, &scope, types);
                }
                kind if decl_kind(kind).is_some() => {
                    self.extract_type(child, source, &scope, types);
                }
                _ => {}
            }
        }
    }

    /// Parse a type declaration and its nested types
    fn extract_type(&self, node: Node, source: &str, scope: &Scope, types: &mut Vec<TypeDecl>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, source);
        let header = self.header_tokens(node, name_node, source);

        let kind = match decl_kind(node.kind()) {
            Some(DeclKind::Record) if header.iter().any(|t| t == "struct") => DeclKind::RecordStruct,
            Some(kind) => kind,
            None => return,
        };

        let mut decl = TypeDecl {
            name: name.clone(),
            namespace: scope.namespace.clone(),
            enclosing: scope.enclosing.clone(),
            kind,
            modifiers: only_modifiers(&header),
            attributes: self.attributes(node, source),
            base_types: Vec::new(),
            fields: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            usings: scope.usings.clone(),
            line: node.start_position().row + 1,
        };

        let mut nested = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "base_list" | "record_base" => decl.base_types = base_list_types(child, source),
                // Positional record parameters double as properties
                "parameter_list" => decl.properties.extend(self.extract_parameters(child, source)),
                _ => {}
            }
        }

        if kind != DeclKind::Enum {
            if let Some(body) = node.child_by_field_name("body") {
                let mut cursor = body.walk();
                for member in body.named_children(&mut cursor) {
                    match member.kind() {
                        "field_declaration" => {
                            let mut cursor = member.walk();
                            for child in member.named_children(&mut cursor) {
                                if child.kind() == "variable_declaration" {
                                    let (type_name, declarators) = self.variable_declaration(child, source);
                                    for (field_name, _) in declarators {
                                        decl.fields.push(MemberDecl {
                                            name: field_name,
                                            type_name: type_name.clone().unwrap_or_else(|| "var".to_string()),
                                        });
                                    }
                                }
                            }
                        }
                        "property_declaration" => {
                            if let (Some(type_node), Some(name_node)) =
                                (member.child_by_field_name("type"), member.child_by_field_name("name"))
                            {
                                decl.properties.push(MemberDecl {
                                    name: node_text(name_node, source),
                                    type_name: normalize_type(&node_text(type_node, source)),
                                });
                            }
                        }
                        "method_declaration" => {
                            if let Some(method) = self.extract_method(member, source) {
                                decl.methods.push(method);
                            }
                        }
                        kind if decl_kind(kind).is_some() => nested.push(member),
                        _ => {}
                    }
                }
            }
        }

        types.push(decl);

        let mut inner = scope.clone();
        inner.enclosing.push(name);
        for member in nested {
            self.extract_type(member, source, &inner, types);
        }
    }

    /// Parse a C# method declaration
    fn extract_method(&self, node: Node, source: &str) -> Option<MethodDecl> {
        let name_node = node.child_by_field_name("name")?;
        let header = self.header_tokens(node, name_node, source);

        let return_type = node.child_by_field_name("returns")
            .or_else(|| node.child_by_field_name("type"))
            .map(|n| normalize_type(&node_text(n, source)));

        let parameters = node.child_by_field_name("parameters")
            .map(|p| self.extract_parameters(p, source))
            .unwrap_or_default();

        let body = node.child_by_field_name("body").or_else(|| {
            let mut cursor = node.walk();
            let found = node.named_children(&mut cursor)
                .find(|c| matches!(c.kind(), "block" | "arrow_expression_clause"));
            found
        });

        let mut locals = Vec::new();
        let mut invocations = Vec::new();
        if let Some(body) = body {
            self.collect_body(body, source, &mut locals, &mut invocations);
        }

        Some(MethodDecl {
            name: node_text(name_node, source),
            parameters,
            return_type,
            attributes: self.attributes(node, source),
            modifiers: only_modifiers(&header),
            locals,
            invocations,
            has_body: body.is_some(),
            line: node.start_position().row + 1,
        })
    }

    fn extract_parameters(&self, list: Node, source: &str) -> Vec<MemberDecl> {
        let mut parameters = Vec::new();
        let mut cursor = list.walk();

        for child in list.named_children(&mut cursor) {
            if !matches!(child.kind(), "parameter" | "parameter_array") {
                continue;
            }

            let name = child.child_by_field_name("name");
            let type_node = child.child_by_field_name("type");
            let (name, type_node) = match (name, type_node) {
                (Some(name), Some(type_node)) => (name, type_node),
                _ => {
                    // `params T[] xs` carries no field names in some grammar versions
                    let mut cursor = child.walk();
                    let parts: Vec<Node> = child.named_children(&mut cursor)
                        .filter(|c| !matches!(c.kind(), "attribute_list" | "equals_value_clause" | "parameter_modifier"))
                        .collect();
                    if parts.len() < 2 {
                        continue;
                    }
                    (parts[parts.len() - 1], parts[parts.len() - 2])
                }
            };

            parameters.push(MemberDecl {
                name: node_text(name, source),
                type_name: normalize_type(&node_text(type_node, source)),
            });
        }

        parameters
    }

    /// Pre-order walk of a method body
    fn collect_body(&self, node: Node, source: &str, locals: &mut Vec<LocalDecl>, invocations: &mut Vec<Invocation>) {
        match node.kind() {
            "invocation_expression" => {
                if let Some(invocation) = self.invocation(node, source) {
                    invocations.push(invocation);
                }
            }
            "variable_declaration" => {
                let (type_name, declarators) = self.variable_declaration(node, source);
                for (name, initializer) in declarators {
                    locals.push(LocalDecl {
                        name,
                        type_name: type_name.clone(),
                        initializer,
                    });
                }
            }
            "foreach_statement" | "declaration_expression" => {
                let type_name = node.child_by_field_name("type")
                    .map(|t| normalize_type(&node_text(t, source)))
                    .filter(|t| t != "var");
                let name = node.child_by_field_name("left")
                    .or_else(|| node.child_by_field_name("name"))
                    .filter(|n| n.kind() == "identifier");
                if let Some(name) = name {
                    locals.push(LocalDecl {
                        name: node_text(name, source),
                        type_name,
                        initializer: None,
                    });
                }
            }
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.collect_body(child, source, locals, invocations);
        }
    }

    /// Declared type (`None` for `var`) and declarators of a variable declaration
    fn variable_declaration(&self, node: Node, source: &str) -> (Option<String>, Vec<(String, Option<Expr>)>) {
        let type_name = node.child_by_field_name("type")
            .map(|t| normalize_type(&node_text(t, source)))
            .filter(|t| t != "var");

        let mut declarators = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() != "variable_declarator" {
                continue;
            }

            let name = child.child_by_field_name("name").or_else(|| {
                let mut cursor = child.walk();
                let found = child.named_children(&mut cursor).find(|c| c.kind() == "identifier");
                found
            });
            let Some(name) = name else {
                continue;
            };

            let mut initializer = None;
            let mut cursor = child.walk();
            for part in child.named_children(&mut cursor) {
                if part.id() == name.id() || part.kind() == "bracketed_argument_list" {
                    continue;
                }
                let value = if part.kind() == "equals_value_clause" {
                    part.named_child(0)
                } else {
                    Some(part)
                };
                initializer = value.map(|v| self.expr(v, source));
            }

            declarators.push((node_text(name, source), initializer));
        }

        (type_name, declarators)
    }

    fn invocation(&self, node: Node, source: &str) -> Option<Invocation> {
        let function = node.child_by_field_name("function")?;

        let mut arguments = Vec::new();
        if let Some(list) = node.child_by_field_name("arguments") {
            let mut cursor = list.walk();
            for argument in list.named_children(&mut cursor) {
                if argument.kind() != "argument" {
                    continue;
                }
                // The expression is the last named child, after any `name:` prefix
                let count = argument.named_child_count();
                if count == 0 {
                    continue;
                }
                if let Some(value) = argument.named_child(count - 1) {
                    arguments.push(self.expr(value, source));
                }
            }
        }

        Some(Invocation {
            callee: self.expr(function, source),
            arguments,
        })
    }

    fn expr(&self, node: Node, source: &str) -> Expr {
        match node.kind() {
            "identifier" => Expr::Identifier(node_text(node, source)),
            "generic_name" => Expr::Identifier(simple_name(node, source)),
            "this_expression" | "this" => Expr::This,
            "member_access_expression" => {
                let target = node.child_by_field_name("expression");
                let member = node.child_by_field_name("name");
                match (target, member) {
                    (Some(target), Some(member)) => Expr::MemberAccess {
                        target: Box::new(self.expr(target, source)),
                        member: simple_name(member, source),
                    },
                    _ => Expr::Other,
                }
            }
            "object_creation_expression" => Expr::ObjectCreation {
                type_name: node.child_by_field_name("type").map(|t| normalize_type(&node_text(t, source))),
            },
            "implicit_object_creation_expression" => Expr::ObjectCreation { type_name: None },
            "invocation_expression" => self.invocation(node, source)
                .map(|i| Expr::Invocation(Box::new(i)))
                .unwrap_or(Expr::Other),
            "string_literal" | "verbatim_string_literal" | "raw_string_literal"
            | "interpolated_string_expression" => Expr::Literal(LiteralKind::String),
            "character_literal" => Expr::Literal(LiteralKind::Char),
            "boolean_literal" => Expr::Literal(LiteralKind::Bool),
            "null_literal" => Expr::Literal(LiteralKind::Null),
            "integer_literal" => Expr::Literal(integer_kind(&node_text(node, source))),
            "real_literal" => Expr::Literal(real_kind(&node_text(node, source))),
            "cast_expression" => node.child_by_field_name("type")
                .map(|t| Expr::Cast { type_name: normalize_type(&node_text(t, source)) })
                .unwrap_or(Expr::Other),
            "await_expression" => node.named_child(0)
                .map(|inner| Expr::Await(Box::new(self.expr(inner, source))))
                .unwrap_or(Expr::Other),
            "parenthesized_expression" => node.named_child(0)
                .map(|inner| self.expr(inner, source))
                .unwrap_or(Expr::Other),
            _ => Expr::Other,
        }
    }

    /// Tokens written before the declared name, attributes excluded
    fn header_tokens(&self, node: Node, name_node: Node, source: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.id() == name_node.id() {
                break;
            }
            if child.kind() == "attribute_list" {
                continue;
            }
            tokens.extend(node_text(child, source).split_whitespace().map(str::to_string));
        }
        tokens
    }

    fn attributes(&self, node: Node, source: &str) -> Vec<String> {
        let mut attributes = Vec::new();
        let mut cursor = node.walk();
        for list in node.named_children(&mut cursor) {
            if list.kind() != "attribute_list" {
                continue;
            }
            let mut cursor = list.walk();
            for attribute in list.named_children(&mut cursor) {
                if attribute.kind() != "attribute" {
                    continue;
                }
                let name = attribute.child_by_field_name("name").or_else(|| attribute.named_child(0));
                if let Some(name) = name {
                    attributes.push(normalize_type(&node_text(name, source)));
                }
            }
        }
        attributes
    }
}

fn decl_kind(kind: &str) -> Option<DeclKind> {
    match kind {
        "class_declaration" => Some(DeclKind::Class),
        "interface_declaration" => Some(DeclKind::Interface),
        "struct_declaration" => Some(DeclKind::Struct),
        "record_declaration" => Some(DeclKind::Record),
        "record_struct_declaration" => Some(DeclKind::RecordStruct),
        "enum_declaration" => Some(DeclKind::Enum),
        _ => None,
    }
}

fn only_modifiers(tokens: &[String]) -> Vec<String> {
    tokens.iter()
        .filter(|t| MODIFIERS.contains(&t.as_str()))
        .cloned()
        .collect()
}

fn base_list_types(node: Node, source: &str) -> Vec<String> {
    let mut bases = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        let type_node = match child.kind() {
            "argument_list" => continue,
            "primary_constructor_base_type" => child.child_by_field_name("type")
                .or_else(|| child.named_child(0))
                .unwrap_or(child),
            _ => child,
        };
        let name = normalize_type(&node_text(type_node, source));
        if !name.is_empty() {
            bases.push(name);
        }
    }
    bases
}

/// Identifier of a simple or generic name (`Do` for `Do<T>`)
fn simple_name(node: Node, source: &str) -> String {
    let text = node_text(node, source);
    match text.find('<') {
        Some(pos) => text[..pos].trim().to_string(),
        None => text.trim().to_string(),
    }
}

fn using_namespace(text: &str) -> Option<String> {
    let mut rest = text.trim().trim_end_matches(';').trim();
    for prefix in ["global ", "using ", "static "] {
        rest = rest.strip_prefix(prefix).unwrap_or(rest).trim_start();
    }
    if rest.is_empty() || rest.contains('=') {
        return None;
    }
    Some(normalize_type(rest))
}

fn join_namespace(outer: &str, inner: &str) -> String {
    if outer.is_empty() {
        inner.to_string()
    } else {
        format!("{}.{}", outer, inner)
    }
}

/// Type text with whitespace and `global::` removed
fn normalize_type(text: &str) -> String {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    compact.replace("global::", "")
}

fn integer_kind(text: &str) -> LiteralKind {
    let lower = text.to_ascii_lowercase();
    if lower.ends_with("ul") || lower.ends_with("lu") {
        LiteralKind::ULong
    } else if lower.ends_with('l') {
        LiteralKind::Long
    } else if lower.ends_with('u') {
        LiteralKind::UInt
    } else {
        LiteralKind::Int
    }
}

fn real_kind(text: &str) -> LiteralKind {
    match text.to_ascii_lowercase().chars().last() {
        Some('f') => LiteralKind::Float,
        Some('m') => LiteralKind::Decimal,
        _ => LiteralKind::Double,
    }
}

/// Extract text content of a node
fn node_text(node: Node, source: &str) -> String {
    source[node.byte_range()].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> SourceUnit {
        let mut parser = CSharpParser::new().unwrap();
        parser.parse(source, Path::new("Test.cs")).unwrap()
    }

    const ORDERS: &str = r#"
using System.Threading;
using Shop.Contracts;

namespace Shop.Orders
{
    public interface IOrderRepository
    {
        void Save(Order order);
    }

    public sealed partial class OrderService : IOrderService
    {
        private readonly IOrderRepository _repository;
        private int _count;

        public string Name { get; set; }

        [C4Component("Orders", "Places orders")]
        public void Place(Order order, CancellationToken ct)
        {
            var copy = new Order();
            Validate(order);
            _repository.Save(copy);
            this.Validate("x");
        }

        private void Validate(Order order) { }

        private class Nested { }
    }
}
"#;

    #[test]
    fn test_types_namespaces_and_nesting() {
        let unit = parse(ORDERS);
        let names: Vec<String> = unit.types.iter().map(|t| t.full_name()).collect();
        assert_eq!(names, vec![
            "Shop.Orders.IOrderRepository".to_string(),
            "Shop.Orders.OrderService".to_string(),
            "Shop.Orders.OrderService.Nested".to_string(),
        ]);

        let service = &unit.types[1];
        assert_eq!(service.kind, DeclKind::Class);
        assert!(service.has_modifier("partial"));
        assert!(service.has_modifier("sealed"));
        assert_eq!(service.base_types, vec!["IOrderService".to_string()]);
        assert_eq!(service.usings, vec!["System.Threading".to_string(), "Shop.Contracts".to_string()]);

        let nested = &unit.types[2];
        assert!(nested.is_nested());
        assert!(nested.has_modifier("private"));
    }

    #[test]
    fn test_fields_properties_and_methods() {
        let unit = parse(ORDERS);
        let service = &unit.types[1];

        assert_eq!(service.fields, vec![
            MemberDecl { name: "_repository".to_string(), type_name: "IOrderRepository".to_string() },
            MemberDecl { name: "_count".to_string(), type_name: "int".to_string() },
        ]);
        assert_eq!(service.properties[0].name, "Name");

        let place = &service.methods[0];
        assert_eq!(place.name, "Place");
        assert_eq!(place.attributes, vec!["C4Component".to_string()]);
        assert_eq!(place.parameters.len(), 2);
        assert_eq!(place.parameters[1].type_name, "CancellationToken");
        assert_eq!(place.return_type.as_deref(), Some("void"));

        let interface_method = &unit.types[0].methods[0];
        assert!(!interface_method.has_body);
    }

    #[test]
    fn test_invocations_keep_source_order() {
        let unit = parse(ORDERS);
        let place = &unit.types[1].methods[0];

        let members: Vec<&str> = place.invocations.iter().filter_map(|i| i.member_name()).collect();
        assert_eq!(members, vec!["Validate", "Save", "Validate"]);

        assert_eq!(place.invocations[0].callee, Expr::Identifier("Validate".to_string()));
        assert_eq!(place.invocations[1].arguments, vec![Expr::Identifier("copy".to_string())]);
        assert_eq!(place.invocations[2].arguments, vec![Expr::Literal(LiteralKind::String)]);
        match &place.invocations[2].callee {
            Expr::MemberAccess { target, member } => {
                assert_eq!(**target, Expr::This);
                assert_eq!(member, "Validate");
            }
            other => panic!("unexpected callee {:?}", other),
        }

        let copy = &place.locals[0];
        assert_eq!(copy.name, "copy");
        assert_eq!(copy.type_name, None);
        assert_eq!(copy.initializer, Some(Expr::ObjectCreation { type_name: Some("Order".to_string()) }));
    }

    #[test]
    fn test_nested_invocations_are_pre_order() {
        let unit = parse(r#"
class A
{
    void Run()
    {
        Outer(Inner(1L), 2.5m);
    }
}
"#);
        let run = &unit.types[0].methods[0];
        let members: Vec<&str> = run.invocations.iter().filter_map(|i| i.member_name()).collect();
        assert_eq!(members, vec!["Outer", "Inner"]);
        assert_eq!(run.invocations[1].arguments, vec![Expr::Literal(LiteralKind::Long)]);
        assert_eq!(run.invocations[0].arguments[1], Expr::Literal(LiteralKind::Decimal));
    }

    #[test]
    fn test_literal_suffixes() {
        assert_eq!(integer_kind("10"), LiteralKind::Int);
        assert_eq!(integer_kind("10UL"), LiteralKind::ULong);
        assert_eq!(integer_kind("10u"), LiteralKind::UInt);
        assert_eq!(real_kind("1.5f"), LiteralKind::Float);
        assert_eq!(real_kind("1.5"), LiteralKind::Double);
    }

    #[test]
    fn test_using_directives() {
        assert_eq!(using_namespace("using System.Linq;"), Some("System.Linq".to_string()));
        assert_eq!(using_namespace("global using Shop.Core;"), Some("Shop.Core".to_string()));
        assert_eq!(using_namespace("using static Shop.Guard;"), Some("Shop.Guard".to_string()));
        assert_eq!(using_namespace("using Json = Newtonsoft.Json;"), None);
    }
}
