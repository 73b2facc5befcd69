//! Go type model used by the front-end.
//!
//! A small slice of the Go type system: enough to follow
//! field, method, index, and call chains back to a named struct type. Types
//! are resolved from syntax alone; anything that cannot be followed is
//! [`GoType::Unknown`], which the oracle treats as "not a message".

use std::collections::HashMap;
use std::fmt;

use tree_sitter::Node;

use crate::syntax::node_text as text;

/// Identity of a named type: declaring package name plus type name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey {
    pub package: String,
    pub name: String,
}

impl TypeKey {
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
        }
    }
}

/// A resolved Go type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoType {
    /// A predeclared type (`int`, `string`, `error`, ...).
    Basic(String),
    /// A declared type.
    Named(TypeKey),
    Pointer(Box<GoType>),
    Slice(Box<GoType>),
    Array(Box<GoType>),
    Map(Box<GoType>, Box<GoType>),
    Chan(Box<GoType>),
    /// A function value; only its results matter here.
    Func(Vec<GoType>),
    /// Results of a multi-value call.
    Tuple(Vec<GoType>),
    Interface,
    /// An anonymous struct type.
    Struct,
    /// An imported package name used in expression position.
    Package(String),
    /// A type used in expression position (conversions, `new(T)`).
    TypeExpr(Box<GoType>),
    Unknown,
}

impl GoType {
    pub fn named(package: impl Into<String>, name: impl Into<String>) -> Self {
        GoType::Named(TypeKey::new(package, name))
    }

    pub fn pointer(inner: GoType) -> Self {
        GoType::Pointer(Box::new(inner))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, GoType::Unknown)
    }

    /// Strip one level of pointer indirection.
    pub fn deref(&self) -> &GoType {
        match self {
            GoType::Pointer(inner) => inner,
            other => other,
        }
    }

    /// The named type behind at most one pointer.
    pub fn named_key(&self) -> Option<&TypeKey> {
        match self.deref() {
            GoType::Named(key) => Some(key),
            _ => None,
        }
    }

    /// Type of a call to a value of this type.
    pub fn call_result(&self) -> GoType {
        match self {
            GoType::Func(results) => results_type(results),
            GoType::TypeExpr(target) => (**target).clone(),
            _ => GoType::Unknown,
        }
    }
}

/// Collapse a result list into the type of the call expression.
pub fn results_type(results: &[GoType]) -> GoType {
    match results {
        [] => GoType::Unknown,
        [single] => single.clone(),
        many => GoType::Tuple(many.to_vec()),
    }
}

impl fmt::Display for GoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoType::Basic(name) => write!(f, "{}", name),
            GoType::Named(key) => write!(f, "{}.{}", key.package, key.name),
            GoType::Pointer(inner) => write!(f, "*{}", inner),
            GoType::Slice(elem) => write!(f, "[]{}", elem),
            GoType::Array(elem) => write!(f, "[N]{}", elem),
            GoType::Map(key, value) => write!(f, "map[{}]{}", key, value),
            GoType::Chan(elem) => write!(f, "chan {}", elem),
            GoType::Func(results) => {
                write!(f, "func(...)")?;
                match results.as_slice() {
                    [] => Ok(()),
                    [single] => write!(f, " {}", single),
                    many => {
                        let parts: Vec<String> = many.iter().map(|t| t.to_string()).collect();
                        write!(f, " ({})", parts.join(", "))
                    }
                }
            }
            GoType::Tuple(items) => {
                let parts: Vec<String> = items.iter().map(|t| t.to_string()).collect();
                write!(f, "({})", parts.join(", "))
            }
            GoType::Interface => write!(f, "interface{{}}"),
            GoType::Struct => write!(f, "struct{{...}}"),
            GoType::Package(name) => write!(f, "package {}", name),
            GoType::TypeExpr(inner) => write!(f, "type {}", inner),
            GoType::Unknown => write!(f, "?"),
        }
    }
}

// ============================================================================
// Resolution from syntax
// ============================================================================

const PREDECLARED: &[&str] = &[
    "bool", "byte", "complex64", "complex128", "error", "float32", "float64", "int", "int8",
    "int16", "int32", "int64", "rune", "string", "uint", "uint8", "uint16", "uint32", "uint64",
    "uintptr", "any", "comparable",
];

/// Whether `name` is a predeclared Go type name.
pub fn is_predeclared(name: &str) -> bool {
    PREDECLARED.contains(&name)
}

/// Package name and import aliases of one file.
#[derive(Debug, Clone, Default)]
pub struct FileContext {
    pub package: String,
    /// Local import name to the imported package's name.
    pub imports: HashMap<String, String>,
}

impl FileContext {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            imports: HashMap::new(),
        }
    }

    /// Package name an import name refers to.
    pub fn resolve_import(&self, local: &str) -> Option<&str> {
        self.imports.get(local).map(String::as_str)
    }

    /// Register an import spec (`alias "path"` or `"path"`).
    pub fn add_import(&mut self, alias: Option<&str>, path: &str) {
        let package = default_package_name(path);
        match alias {
            Some("_") | Some(".") => {}
            Some(alias) => {
                self.imports.insert(alias.to_string(), package);
            }
            None => {
                self.imports.insert(package.clone(), package);
            }
        }
    }
}

/// Default package name of an import path: its last segment, skipping a
/// major version suffix such as `v2`.
pub fn default_package_name(path: &str) -> String {
    let path = path.trim_matches(|c| c == '"' || c == '`');
    let mut segments = path.rsplit('/');
    let last = segments.next().unwrap_or(path);
    let is_version = last.len() > 1
        && last.starts_with('v')
        && last[1..].chars().all(|c| c.is_ascii_digit());
    if is_version {
        if let Some(prev) = segments.next() {
            return prev.to_string();
        }
    }
    last.to_string()
}

/// Resolve a type node against the file's package and imports.
pub fn resolve_type(node: Node<'_>, src: &[u8], ctx: &FileContext) -> GoType {
    match node.kind() {
        "type_identifier" | "identifier" => {
            let name = text(node, src);
            if is_predeclared(name) {
                GoType::Basic(name.to_string())
            } else {
                GoType::named(ctx.package.clone(), name)
            }
        }
        "qualified_type" => {
            let package = node
                .child_by_field_name("package")
                .map(|n| text(n, src))
                .unwrap_or("");
            let name = node
                .child_by_field_name("name")
                .map(|n| text(n, src))
                .unwrap_or("");
            let package = ctx.resolve_import(package).unwrap_or(package);
            GoType::named(package, name)
        }
        "pointer_type" => match node.named_child(0) {
            Some(inner) => GoType::pointer(resolve_type(inner, src, ctx)),
            None => GoType::Unknown,
        },
        "slice_type" => field_type(node, "element", src, ctx, GoType::Slice),
        "array_type" | "implicit_length_array_type" => {
            field_type(node, "element", src, ctx, GoType::Array)
        }
        "channel_type" => field_type(node, "value", src, ctx, GoType::Chan),
        "map_type" => {
            let key = node
                .child_by_field_name("key")
                .map(|n| resolve_type(n, src, ctx))
                .unwrap_or(GoType::Unknown);
            let value = node
                .child_by_field_name("value")
                .map(|n| resolve_type(n, src, ctx))
                .unwrap_or(GoType::Unknown);
            GoType::Map(Box::new(key), Box::new(value))
        }
        "function_type" => GoType::Func(
            node.child_by_field_name("result")
                .map(|n| result_types(n, src, ctx))
                .unwrap_or_default(),
        ),
        "interface_type" => GoType::Interface,
        "struct_type" => GoType::Struct,
        "generic_type" => node
            .child_by_field_name("type")
            .map(|n| resolve_type(n, src, ctx))
            .unwrap_or(GoType::Unknown),
        "parenthesized_type" => node
            .named_child(0)
            .map(|n| resolve_type(n, src, ctx))
            .unwrap_or(GoType::Unknown),
        // `*T` or `pkg.T` parsed in expression position.
        "unary_expression" if node.child_by_field_name("operator").map(|n| text(n, src)) == Some("*") => {
            match node.child_by_field_name("operand") {
                Some(inner) => GoType::pointer(resolve_type(inner, src, ctx)),
                None => GoType::Unknown,
            }
        }
        "selector_expression" => {
            let package = node
                .child_by_field_name("operand")
                .map(|n| text(n, src))
                .unwrap_or("");
            let name = node
                .child_by_field_name("field")
                .map(|n| text(n, src))
                .unwrap_or("");
            match ctx.resolve_import(package) {
                Some(package) => GoType::named(package, name),
                None => GoType::Unknown,
            }
        }
        "parenthesized_expression" => node
            .named_child(0)
            .map(|n| resolve_type(n, src, ctx))
            .unwrap_or(GoType::Unknown),
        _ => GoType::Unknown,
    }
}

fn field_type(
    node: Node<'_>,
    field: &str,
    src: &[u8],
    ctx: &FileContext,
    wrap: fn(Box<GoType>) -> GoType,
) -> GoType {
    match node.child_by_field_name(field) {
        Some(inner) => wrap(Box::new(resolve_type(inner, src, ctx))),
        None => GoType::Unknown,
    }
}

/// Result types of a function signature's `result` node: either a single
/// type or a parameter list.
pub fn result_types(node: Node<'_>, src: &[u8], ctx: &FileContext) -> Vec<GoType> {
    if node.kind() != "parameter_list" {
        return vec![resolve_type(node, src, ctx)];
    }
    parameter_types(node, src, ctx)
        .into_iter()
        .map(|(_, ty)| ty)
        .collect()
}

/// Parameters of a parameter list as `(name, type)` pairs, one per declared
/// name (unnamed parameters get `None`). Variadic parameters are slices.
pub fn parameter_types(
    list: Node<'_>,
    src: &[u8],
    ctx: &FileContext,
) -> Vec<(Option<String>, GoType)> {
    let mut out = Vec::new();
    let mut cursor = list.walk();
    for param in list.named_children(&mut cursor) {
        let variadic = match param.kind() {
            "parameter_declaration" => false,
            "variadic_parameter_declaration" => true,
            _ => continue,
        };
        let mut ty = param
            .child_by_field_name("type")
            .map(|n| resolve_type(n, src, ctx))
            .unwrap_or(GoType::Unknown);
        if variadic {
            ty = GoType::Slice(Box::new(ty));
        }

        let mut name_cursor = param.walk();
        let names: Vec<String> = param
            .children_by_field_name("name", &mut name_cursor)
            .map(|n| text(n, src).to_string())
            .collect();
        if names.is_empty() {
            out.push((None, ty));
        } else {
            for name in names {
                out.push((Some(name), ty.clone()));
            }
        }
    }
    out
}
