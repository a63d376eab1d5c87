use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::super::call_graph::CanonicalSignature;
use super::super::parser::ParsedProject;
use super::super::syntax::{DeclKind, Expr, Invocation, LiteralKind, MethodDecl, TypeDecl};
use super::{DeclaredType, MethodHandle, MethodRef, SourceModel, TypeKind, TypeName, TypeRef};

/// Bound on `var` chains and nested member access during inference
const MAX_INFERENCE_DEPTH: usize = 16;

#[derive(Debug)]
struct TypePart {
    decl: TypeDecl,
    module: String,
}

/// Whole-solution symbol index built from parsed projects.
///
/// Immutable once built; the call graph core receives it as `&dyn SourceModel`.
#[derive(Debug)]
pub struct SemanticModel {
    modules: Vec<String>,
    parts: Vec<TypePart>,
    /// Full name without generic arguments -> declaration parts, in scan order
    by_name: HashMap<String, Vec<usize>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelStats {
    pub modules: usize,
    pub types: usize,
    pub methods: usize,
}

impl SemanticModel {
    /// Build the model; projects are scanned in the order given
    pub fn build(projects: Vec<ParsedProject>) -> Self {
        let mut modules = Vec::new();
        let mut parts = Vec::new();
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();

        for project in projects {
            for unit in project.files {
                for decl in unit.types {
                    by_name.entry(decl.full_name()).or_default().push(parts.len());
                    parts.push(TypePart {
                        decl,
                        module: project.name.clone(),
                    });
                }
            }
            modules.push(project.name);
        }

        debug!("Indexed {} type declarations across {} modules", parts.len(), modules.len());

        Self { modules, parts, by_name }
    }

    pub fn stats(&self) -> ModelStats {
        let types: HashSet<(&str, String)> = self.parts.iter()
            .map(|p| (p.module.as_str(), p.decl.full_name()))
            .collect();
        ModelStats {
            modules: self.modules.len(),
            types: types.len(),
            methods: self.parts.iter().map(|p| p.decl.methods.len()).sum(),
        }
    }

    fn type_ref_of(&self, index: usize) -> TypeRef {
        let part = &self.parts[index];
        let full_name = part.decl.full_name();
        TypeRef {
            definition: full_name.clone(),
            full_name,
            kind: kind_of(part.decl.kind),
            module: Some(part.module.clone()),
            type_arguments: Vec::new(),
        }
    }

    /// Declaration parts of a model type within its module
    fn parts_of<'a>(&'a self, ty: &'a TypeRef) -> impl Iterator<Item = (usize, &'a TypePart)> + 'a {
        let module = ty.module.as_deref();
        self.by_name.get(&ty.definition)
            .into_iter()
            .flatten()
            .map(move |&index| (index, &self.parts[index]))
            .filter(move |(_, part)| Some(part.module.as_str()) == module)
    }

    /// Pick among same-named declarations the one whose module shares the
    /// longest leading run of dotted segments with the type name
    fn pick_part(&self, candidates: &[usize], full_name: &str) -> Option<usize> {
        let name_segments: Vec<&str> = full_name.split('.').collect();
        let mut best: Option<(usize, usize)> = None;
        for &index in candidates {
            let affinity = self.parts[index].module.split('.')
                .zip(name_segments.iter())
                .take_while(|(a, b)| a == *b)
                .count();
            if best.map_or(true, |(_, score)| affinity > score) {
                best = Some((index, affinity));
            }
        }
        best.map(|(index, _)| index)
    }

    /// Resolve a written type name in the lexical context of a declaration part
    fn resolve_in(&self, context: &TypePart, written: &str) -> TypeRef {
        self.resolve_name(context, &TypeName::parse(written))
    }

    fn resolve_name(&self, context: &TypePart, name: &TypeName) -> TypeRef {
        if name.opaque {
            return TypeRef::unresolved(name.qualified());
        }

        let arguments: Vec<TypeRef> = name.arguments.iter()
            .map(|a| self.resolve_name(context, a))
            .collect();

        if let Some((key, index)) = self.lookup(context, &name.qualified()) {
            let part = &self.parts[index];
            let kind = kind_of(part.decl.kind);
            let mut full_name = key.clone();
            if !arguments.is_empty() {
                full_name = format!("{}<{}>", full_name, join_names(&arguments));
            }

            // `?` on a reference type is an annotation, not a different type
            let reference = matches!(kind, TypeKind::Class | TypeKind::Interface);
            if name.suffix.is_empty() || (reference && name.suffix == "?") {
                return TypeRef {
                    full_name,
                    definition: key,
                    kind,
                    module: Some(part.module.clone()),
                    type_arguments: arguments,
                };
            }
            return TypeRef::unresolved(format!("{}{}", full_name, name.suffix));
        }

        if let Some(keyword) = name.keyword_alias() {
            return TypeRef::unresolved(format!("{}{}", keyword, name.suffix));
        }

        let mut display = name.short_name().to_string();
        if !arguments.is_empty() {
            display = format!("{}<{}>", display, join_names(&arguments));
        }
        let mut unresolved = TypeRef::unresolved(format!("{}{}", display, name.suffix));
        unresolved.type_arguments = arguments;
        unresolved
    }

    /// C#-style lookup: enclosing types and namespaces innermost first, then
    /// usings, then the global namespace
    fn lookup(&self, context: &TypePart, qualified: &str) -> Option<(String, usize)> {
        let mut candidates = Vec::new();

        let container = context.decl.full_name();
        let mut scope: Vec<&str> = container.split('.').collect();
        while !scope.is_empty() {
            candidates.push(format!("{}.{}", scope.join("."), qualified));
            scope.pop();
        }
        for using in &context.decl.usings {
            candidates.push(format!("{}.{}", using, qualified));
        }
        candidates.push(qualified.to_string());

        candidates.into_iter().find_map(|key| {
            let index = self.by_name.get(&key).and_then(|c| self.pick_part(c, &key))?;
            Some((key, index))
        })
    }

    /// Type of a field or property, following model base classes
    fn member_type(&self, owner: &TypeRef, member: &str, depth: usize) -> Option<TypeRef> {
        if depth > MAX_INFERENCE_DEPTH {
            return None;
        }

        for (_, part) in self.parts_of(owner) {
            let declared = part.decl.fields.iter()
                .chain(part.decl.properties.iter())
                .find(|m| m.name == member);
            if let Some(declared) = declared {
                return Some(self.resolve_in(part, &declared.type_name));
            }
        }

        self.base_types(owner).into_iter()
            .filter(|b| b.kind == TypeKind::Class)
            .find_map(|b| self.member_type(&b, member, depth + 1))
    }

    fn type_of(&self, scope: &MethodRef, expr: &Expr, depth: usize) -> Option<TypeRef> {
        if depth > MAX_INFERENCE_DEPTH {
            return None;
        }
        let part = self.parts.get(scope.handle.part)?;
        let method = part.decl.methods.get(scope.handle.method)?;

        match expr {
            Expr::Literal(kind) => literal_type(*kind),
            Expr::ObjectCreation { type_name: Some(written) } => Some(self.resolve_in(part, written)),
            Expr::ObjectCreation { type_name: None } => None,
            Expr::Cast { type_name } => Some(self.resolve_in(part, type_name)),
            Expr::This => Some(scope.owner.clone()),
            Expr::Identifier(name) => {
                if let Some(local) = method.locals.iter().find(|l| &l.name == name) {
                    return match (&local.type_name, &local.initializer) {
                        (Some(written), _) => Some(self.resolve_in(part, written)),
                        (None, Some(initializer)) => self.type_of(scope, initializer, depth + 1),
                        (None, None) => None,
                    };
                }
                if let Some(parameter) = method.parameters.iter().find(|p| &p.name == name) {
                    return Some(self.resolve_in(part, &parameter.type_name));
                }
                self.member_type(&scope.owner, name, depth + 1)
            }
            Expr::MemberAccess { target, member } => {
                let target = self.type_of(scope, target, depth + 1)?;
                self.member_type(&target, member, depth + 1)
            }
            Expr::Invocation(invocation) => self.return_type_of(scope, invocation, depth + 1),
            Expr::Await(inner) => self.type_of(scope, inner, depth + 1).and_then(unwrap_task),
            Expr::Other => None,
        }
    }

    /// Declared return type of the first same-named, same-arity model method
    fn return_type_of(&self, scope: &MethodRef, invocation: &Invocation, depth: usize) -> Option<TypeRef> {
        let (owner, name) = match &invocation.callee {
            Expr::Identifier(name) => (scope.owner.clone(), name),
            Expr::MemberAccess { target, member } => (self.type_of(scope, target, depth)?, member),
            _ => return None,
        };

        for (_, part) in self.parts_of(&owner) {
            let found = part.decl.methods.iter()
                .find(|m| &m.name == name && m.parameters.len() == invocation.arguments.len());
            if let Some(method) = found {
                return method.return_type.as_deref()
                    .filter(|r| *r != "void")
                    .map(|r| self.resolve_in(part, r));
            }
        }
        None
    }
}

impl SourceModel for SemanticModel {
    fn declared_types(&self) -> Vec<DeclaredType<'_>> {
        (0..self.parts.len())
            .map(|index| DeclaredType {
                type_ref: self.type_ref_of(index),
                decl: &self.parts[index].decl,
            })
            .collect()
    }

    fn find_type(&self, name: &str) -> Option<TypeRef> {
        if let Some(index) = self.by_name.get(name).and_then(|c| self.pick_part(c, name)) {
            return Some(self.type_ref_of(index));
        }
        self.parts.iter()
            .position(|p| p.decl.name == name)
            .map(|index| self.type_ref_of(index))
    }

    fn resolve_field_type(&self, owner: &TypeRef, field: &str) -> Option<TypeRef> {
        self.parts_of(owner)
            .find_map(|(_, part)| {
                part.decl.fields.iter()
                    .find(|f| f.name == field)
                    .map(|f| self.resolve_in(part, &f.type_name))
            })
            .filter(|ty| !ty.is_metadata())
    }

    fn declared_methods(&self, ty: &TypeRef) -> Vec<MethodRef> {
        let mut methods = Vec::new();
        for (index, part) in self.parts_of(ty) {
            for (position, method) in part.decl.methods.iter().enumerate() {
                let parameter_types: Vec<String> = method.parameters.iter()
                    .map(|p| self.resolve_in(part, &p.type_name).full_name)
                    .collect();
                methods.push(MethodRef {
                    owner: ty.clone(),
                    name: method.name.clone(),
                    signature: CanonicalSignature::new(&method.name, &parameter_types),
                    parameter_types,
                    module: part.module.clone(),
                    handle: MethodHandle { part: index, method: position },
                });
            }
        }
        methods
    }

    fn declares_method(&self, ty: &TypeRef, name: &str) -> bool {
        self.parts_of(ty).any(|(_, part)| part.decl.methods.iter().any(|m| m.name == name))
    }

    fn method_body(&self, method: &MethodRef) -> Option<&MethodDecl> {
        self.parts.get(method.handle.part)?.decl.methods.get(method.handle.method)
    }

    fn static_type_of(&self, scope: &MethodRef, expr: &Expr) -> Option<TypeRef> {
        self.type_of(scope, expr, 0)
    }

    fn base_types(&self, ty: &TypeRef) -> Vec<TypeRef> {
        let mut seen = HashSet::new();
        let mut bases = Vec::new();
        for (_, part) in self.parts_of(ty) {
            for written in &part.decl.base_types {
                let base = self.resolve_in(part, written);
                if seen.insert(base.full_name.clone()) {
                    bases.push(base);
                }
            }
        }
        bases
    }

    fn all_interfaces(&self, ty: &TypeRef) -> Vec<TypeRef> {
        let mut interfaces = Vec::new();
        let mut seen = HashSet::new();
        let mut visited = HashSet::new();
        let mut pending = self.base_types(ty);

        while let Some(base) = pending.pop() {
            if base.is_metadata() || !visited.insert(base.full_name.clone()) {
                continue;
            }
            if base.kind == TypeKind::Interface && seen.insert(base.full_name.clone()) {
                interfaces.push(base.clone());
            }
            pending.extend(self.base_types(&base));
        }

        interfaces
    }
}

fn kind_of(kind: DeclKind) -> TypeKind {
    match kind {
        DeclKind::Class | DeclKind::Record => TypeKind::Class,
        DeclKind::Interface => TypeKind::Interface,
        DeclKind::Struct | DeclKind::RecordStruct => TypeKind::Struct,
        DeclKind::Enum => TypeKind::Enum,
    }
}

fn join_names(types: &[TypeRef]) -> String {
    types.iter().map(|t| t.full_name.as_str()).collect::<Vec<_>>().join(", ")
}

fn literal_type(kind: LiteralKind) -> Option<TypeRef> {
    let keyword = match kind {
        LiteralKind::String => "string",
        LiteralKind::Char => "char",
        LiteralKind::Bool => "bool",
        LiteralKind::Int => "int",
        LiteralKind::UInt => "uint",
        LiteralKind::Long => "long",
        LiteralKind::ULong => "ulong",
        LiteralKind::Float => "float",
        LiteralKind::Double => "double",
        LiteralKind::Decimal => "decimal",
        LiteralKind::Null => return None,
    };
    Some(TypeRef::unresolved(keyword))
}

/// `Task<T>` and `ValueTask<T>` become `T`; a bare task has no value
fn unwrap_task(ty: TypeRef) -> Option<TypeRef> {
    if matches!(ty.short_name(), "Task" | "ValueTask") {
        return ty.type_arguments.into_iter().next();
    }
    Some(ty)
}

#[cfg(test)]
impl SemanticModel {
    /// Build a model from `(module, source)` pairs through the C# parser
    pub fn from_sources(sources: &[(&str, &str)]) -> crate::error::Result<Self> {
        use super::super::languages::{CSharpParser, LanguageParser};

        let mut parser = CSharpParser::new()?;
        let mut projects: Vec<ParsedProject> = Vec::new();
        for (i, (module, source)) in sources.iter().enumerate() {
            let path = std::path::PathBuf::from(format!("{}/File{}.cs", module, i));
            let unit = parser.parse(source, &path)?;
            match projects.iter_mut().find(|p| p.name == *module) {
                Some(project) => project.files.push(unit),
                None => projects.push(ParsedProject {
                    name: module.to_string(),
                    root: std::path::PathBuf::from(module),
                    files: vec![unit],
                }),
            }
        }
        Ok(Self::build(projects))
    }

    /// First method with this name on the named type
    pub fn method(&self, type_name: &str, method: &str) -> MethodRef {
        let ty = self.find_type(type_name).expect("type not in model");
        self.declared_methods(&ty)
            .into_iter()
            .find(|m| m.name == method)
            .expect("method not in model")
    }
}
