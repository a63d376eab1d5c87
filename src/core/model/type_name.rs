//! Structural view of a written type name such as `Shop.Repo<Order, int>[]`.

/// A written type name split into qualifier segments, generic arguments and
/// a trailing array/nullable suffix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeName {
    /// Dotted segments, generic arguments of qualifiers dropped
    pub segments: Vec<String>,
    /// Generic arguments of the last segment
    pub arguments: Vec<TypeName>,
    /// `[]`, `?`, `[,]` and the like
    pub suffix: String,
    /// Tuples and other shapes kept verbatim
    pub opaque: bool,
}

impl TypeName {
    pub fn parse(text: &str) -> Self {
        let text: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        let text = text.replace("::", ".");

        if text.starts_with('(') || text.is_empty() {
            return Self::opaque(&text);
        }

        let (base, suffix) = split_suffix(&text);

        let mut segments = Vec::new();
        let mut arguments = Vec::new();
        let parts = split_top_level(base, '.');
        let last = parts.len().saturating_sub(1);
        for (i, part) in parts.iter().enumerate() {
            match part.find('<') {
                Some(open) => {
                    segments.push(part[..open].to_string());
                    if i == last {
                        let inner = part[open + 1..].strip_suffix('>').unwrap_or(&part[open + 1..]);
                        arguments = split_top_level(inner, ',')
                            .into_iter()
                            .filter(|a| !a.is_empty())
                            .map(TypeName::parse)
                            .collect();
                    }
                }
                None => segments.push(part.to_string()),
            }
        }

        if segments.iter().any(|s| s.is_empty()) {
            return Self::opaque(&text);
        }

        Self {
            segments,
            arguments,
            suffix: suffix.to_string(),
            opaque: false,
        }
    }

    fn opaque(text: &str) -> Self {
        Self {
            segments: vec![text.to_string()],
            arguments: Vec::new(),
            suffix: String::new(),
            opaque: true,
        }
    }

    /// Dotted name without generic arguments or suffix
    pub fn qualified(&self) -> String {
        self.segments.join(".")
    }

    pub fn short_name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    /// C# keyword spelling of a framework type (`System.Int32` → `int`)
    pub fn keyword_alias(&self) -> Option<&'static str> {
        if !self.arguments.is_empty() || self.opaque {
            return None;
        }
        let name = match self.segments.as_slice() {
            [single] => single.as_str(),
            [system, single] if system == "System" => single.as_str(),
            _ => return None,
        };
        let keyword = match name {
            "Int32" => "int",
            "Int64" => "long",
            "Int16" => "short",
            "UInt32" => "uint",
            "UInt64" => "ulong",
            "UInt16" => "ushort",
            "Byte" => "byte",
            "SByte" => "sbyte",
            "String" => "string",
            "Boolean" => "bool",
            "Char" => "char",
            "Single" => "float",
            "Double" => "double",
            "Decimal" => "decimal",
            "Object" => "object",
            "Void" => "void",
            _ => return None,
        };
        Some(keyword)
    }
}

/// Split `Foo<int>[]?` into `Foo<int>` and `[]?`
fn split_suffix(text: &str) -> (&str, &str) {
    let mut end = text.len();
    for (i, c) in text.char_indices().rev() {
        if matches!(c, '[' | ']' | '?' | '*' | ',') {
            end = i;
        } else {
            break;
        }
    }
    text.split_at(end)
}

/// Split on a separator that is not nested inside `<>`, `()` or `[]`
fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth -= 1,
            c if c == separator && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generic_with_suffix() {
        let name = TypeName::parse("Shop.Data.Repo<Order, Dictionary<string, int>>[]");
        assert_eq!(name.segments, vec!["Shop", "Data", "Repo"]);
        assert_eq!(name.suffix, "[]");
        assert_eq!(name.arguments.len(), 2);
        assert_eq!(name.arguments[0].qualified(), "Order");
        assert_eq!(name.arguments[1].short_name(), "Dictionary");
        assert_eq!(name.arguments[1].arguments.len(), 2);
    }

    #[test]
    fn test_nullable_and_alias_qualifier() {
        let name = TypeName::parse("int?");
        assert_eq!(name.qualified(), "int");
        assert_eq!(name.suffix, "?");

        let aliased = TypeName::parse("Cqrs::IQuery");
        assert_eq!(aliased.segments, vec!["Cqrs", "IQuery"]);
    }

    #[test]
    fn test_tuples_are_opaque() {
        let name = TypeName::parse("(int, string)");
        assert!(name.opaque);
        assert_eq!(name.qualified(), "(int,string)");
    }

    #[test]
    fn test_keyword_aliases() {
        assert_eq!(TypeName::parse("System.Int32").keyword_alias(), Some("int"));
        assert_eq!(TypeName::parse("String").keyword_alias(), Some("string"));
        assert_eq!(TypeName::parse("Shop.String").keyword_alias(), None);
        assert_eq!(TypeName::parse("List<int>").keyword_alias(), None);
    }
}
