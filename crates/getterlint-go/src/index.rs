//! Cross-file declaration index.
//!
//! Every loaded file contributes its top-level declarations (struct types,
//! methods, functions, typed package variables). Lowering then resolves
//! selectors and calls against the combined [`TypeIndex`], including files
//! that are themselves skipped from analysis, such as generated message
//! definitions.

use std::collections::HashMap;

use tracing::debug;
use tree_sitter::{Node, Tree};

use crate::syntax::node_text;
use crate::types::{parameter_types, resolve_type, result_types, FileContext, GoType, TypeKey};

/// Methods whose presence marks a generated message type.
pub const MESSAGE_MARKER_METHODS: &[&str] = &["ProtoReflect", "ProtoMessage"];

/// Type of the leading state field generated message structs carry.
pub const MESSAGE_STATE_TYPE: &str = "MessageState";

/// A struct field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub ty: GoType,
    pub embedded: bool,
}

/// A method and its result types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDef {
    pub name: String,
    pub results: Vec<GoType>,
}

/// A type declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDef {
    Struct(Vec<FieldDef>),
    /// Any non-struct declaration, with its underlying type.
    Other(GoType),
}

/// Top-level declarations collected from one file.
#[derive(Debug, Clone, Default)]
pub struct FileDecls {
    pub context: FileContext,
    pub types: Vec<(TypeKey, TypeDef)>,
    pub methods: Vec<(TypeKey, MethodDef)>,
    pub funcs: Vec<(TypeKey, Vec<GoType>)>,
    pub vars: Vec<(TypeKey, GoType)>,
}

/// Read the package clause and imports of a file.
pub fn file_context(root: Node<'_>, src: &[u8]) -> FileContext {
    let mut ctx = FileContext::default();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        match child.kind() {
            "package_clause" => {
                if let Some(name) = child.named_child(0) {
                    ctx.package = node_text(name, src).to_string();
                }
            }
            "import_declaration" => collect_imports(child, src, &mut ctx),
            _ => {}
        }
    }
    ctx
}

fn collect_imports(node: Node<'_>, src: &[u8], ctx: &mut FileContext) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "import_spec" => {
                let alias = child.child_by_field_name("name").map(|n| node_text(n, src));
                if let Some(path) = child.child_by_field_name("path") {
                    ctx.add_import(alias, node_text(path, src));
                }
            }
            "import_spec_list" => collect_imports(child, src, ctx),
            _ => {}
        }
    }
}

/// Collect the top-level declarations of one parsed file.
pub fn collect_decls(tree: &Tree, src: &[u8]) -> FileDecls {
    let root = tree.root_node();
    let ctx = file_context(root, src);
    let mut decls = FileDecls::default();

    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        match child.kind() {
            "type_declaration" => collect_types(child, src, &ctx, &mut decls),
            "function_declaration" => {
                if let Some(name) = child.child_by_field_name("name") {
                    let results = child
                        .child_by_field_name("result")
                        .map(|r| result_types(r, src, &ctx))
                        .unwrap_or_default();
                    decls
                        .funcs
                        .push((TypeKey::new(&ctx.package, node_text(name, src)), results));
                }
            }
            "method_declaration" => {
                if let Some((key, method)) = method_decl(child, src, &ctx) {
                    decls.methods.push((key, method));
                }
            }
            "var_declaration" => collect_vars(child, src, &ctx, &mut decls),
            _ => {}
        }
    }

    decls.context = ctx;
    decls
}

fn collect_types(node: Node<'_>, src: &[u8], ctx: &FileContext, decls: &mut FileDecls) {
    let mut cursor = node.walk();
    for spec in node.named_children(&mut cursor) {
        if spec.kind() != "type_spec" && spec.kind() != "type_alias" {
            continue;
        }
        let (Some(name), Some(ty)) = (
            spec.child_by_field_name("name"),
            spec.child_by_field_name("type"),
        ) else {
            continue;
        };
        let key = TypeKey::new(&ctx.package, node_text(name, src));
        let def = if ty.kind() == "struct_type" {
            TypeDef::Struct(struct_fields(ty, src, ctx))
        } else {
            TypeDef::Other(resolve_type(ty, src, ctx))
        };
        decls.types.push((key, def));
    }
}

fn struct_fields(node: Node<'_>, src: &[u8], ctx: &FileContext) -> Vec<FieldDef> {
    let mut fields = Vec::new();
    let mut cursor = node.walk();
    for list in node.named_children(&mut cursor) {
        if list.kind() != "field_declaration_list" {
            continue;
        }
        let mut list_cursor = list.walk();
        for decl in list.named_children(&mut list_cursor) {
            if decl.kind() != "field_declaration" {
                continue;
            }
            let Some(ty_node) = decl.child_by_field_name("type") else {
                continue;
            };
            let ty = resolve_type(ty_node, src, ctx);

            let mut name_cursor = decl.walk();
            let names: Vec<String> = decl
                .children_by_field_name("name", &mut name_cursor)
                .map(|n| node_text(n, src).to_string())
                .collect();

            if names.is_empty() {
                if let Some(key) = ty.named_key() {
                    fields.push(FieldDef {
                        name: key.name.clone(),
                        ty: ty.clone(),
                        embedded: true,
                    });
                }
            } else {
                for name in names {
                    fields.push(FieldDef {
                        name,
                        ty: ty.clone(),
                        embedded: false,
                    });
                }
            }
        }
    }
    fields
}

fn method_decl(node: Node<'_>, src: &[u8], ctx: &FileContext) -> Option<(TypeKey, MethodDef)> {
    let receiver = node.child_by_field_name("receiver")?;
    let name = node.child_by_field_name("name")?;
    let (_, receiver_ty) = parameter_types(receiver, src, ctx).into_iter().next()?;
    let key = receiver_ty.named_key()?.clone();
    let results = node
        .child_by_field_name("result")
        .map(|r| result_types(r, src, ctx))
        .unwrap_or_default();
    Some((
        key,
        MethodDef {
            name: node_text(name, src).to_string(),
            results,
        },
    ))
}

fn collect_vars(node: Node<'_>, src: &[u8], ctx: &FileContext, decls: &mut FileDecls) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "var_spec" => {
                let Some(ty) = child.child_by_field_name("type") else {
                    continue;
                };
                let ty = resolve_type(ty, src, ctx);
                let mut name_cursor = child.walk();
                for name in child.children_by_field_name("name", &mut name_cursor) {
                    decls
                        .vars
                        .push((TypeKey::new(&ctx.package, node_text(name, src)), ty.clone()));
                }
            }
            "var_spec_list" => collect_vars(child, src, ctx, decls),
            _ => {}
        }
    }
}

// ============================================================================
// Index
// ============================================================================

/// Maximum depth followed through embedded fields.
const EMBED_DEPTH: usize = 3;

/// Declarations of every loaded file, keyed by package and name.
#[derive(Debug, Clone, Default)]
pub struct TypeIndex {
    types: HashMap<TypeKey, TypeDef>,
    methods: HashMap<TypeKey, Vec<MethodDef>>,
    funcs: HashMap<TypeKey, Vec<GoType>>,
    vars: HashMap<TypeKey, GoType>,
}

impl TypeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one file's declarations.
    pub fn add(&mut self, decls: FileDecls) {
        for (key, def) in decls.types {
            self.types.insert(key, def);
        }
        for (key, method) in decls.methods {
            self.methods.entry(key).or_default().push(method);
        }
        for (key, results) in decls.funcs {
            self.funcs.insert(key, results);
        }
        for (key, ty) in decls.vars {
            self.vars.insert(key, ty);
        }
    }

    pub fn from_decls(decls: impl IntoIterator<Item = FileDecls>) -> Self {
        let mut index = Self::new();
        for file in decls {
            index.add(file);
        }
        debug!(
            types = index.types.len(),
            funcs = index.funcs.len(),
            "type index built"
        );
        index
    }

    pub fn has_type(&self, key: &TypeKey) -> bool {
        self.types.contains_key(key)
    }

    pub fn type_def(&self, key: &TypeKey) -> Option<&TypeDef> {
        self.types.get(key)
    }

    pub fn func_results(&self, key: &TypeKey) -> Option<&[GoType]> {
        self.funcs.get(key).map(Vec::as_slice)
    }

    pub fn var_type(&self, key: &TypeKey) -> Option<&GoType> {
        self.vars.get(key)
    }

    /// Underlying type of a non-struct declaration.
    pub fn underlying(&self, key: &TypeKey) -> Option<&GoType> {
        match self.types.get(key)? {
            TypeDef::Other(ty) => Some(ty),
            TypeDef::Struct(_) => None,
        }
    }

    /// Whether the type is a generated message record.
    pub fn is_message(&self, key: &TypeKey) -> bool {
        if MESSAGE_MARKER_METHODS
            .iter()
            .any(|marker| self.declares_method(key, marker))
        {
            return true;
        }
        match self.types.get(key) {
            Some(TypeDef::Struct(fields)) => fields.first().is_some_and(|f| {
                f.ty.named_key()
                    .is_some_and(|k| k.name == MESSAGE_STATE_TYPE)
            }),
            _ => false,
        }
    }

    fn declares_method(&self, key: &TypeKey, name: &str) -> bool {
        self.methods
            .get(key)
            .is_some_and(|methods| methods.iter().any(|m| m.name == name))
    }

    /// Names of the methods declared on the type, followed by methods
    /// promoted from embedded fields.
    pub fn method_names(&self, key: &TypeKey) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_method_names(key, EMBED_DEPTH, &mut names);
        names
    }

    fn collect_method_names(&self, key: &TypeKey, depth: usize, names: &mut Vec<String>) {
        if let Some(methods) = self.methods.get(key) {
            for method in methods {
                if !names.contains(&method.name) {
                    names.push(method.name.clone());
                }
            }
        }
        if depth == 0 {
            return;
        }
        for embedded in self.embedded_fields(key) {
            if let Some(inner) = embedded.ty.named_key() {
                self.collect_method_names(inner, depth - 1, names);
            }
        }
    }

    /// Result types of a method, including promoted methods.
    pub fn method_results(&self, key: &TypeKey, name: &str) -> Option<Vec<GoType>> {
        self.method_results_at(key, name, EMBED_DEPTH)
    }

    fn method_results_at(&self, key: &TypeKey, name: &str, depth: usize) -> Option<Vec<GoType>> {
        if let Some(method) = self
            .methods
            .get(key)
            .and_then(|methods| methods.iter().find(|m| m.name == name))
        {
            return Some(method.results.clone());
        }
        if depth == 0 {
            return None;
        }
        self.embedded_fields(key).into_iter().find_map(|embedded| {
            embedded
                .ty
                .named_key()
                .and_then(|inner| self.method_results_at(inner, name, depth - 1))
        })
    }

    /// Type of a field, including fields promoted from embedded structs.
    pub fn field_type(&self, key: &TypeKey, name: &str) -> Option<GoType> {
        self.field_type_at(key, name, EMBED_DEPTH)
    }

    fn field_type_at(&self, key: &TypeKey, name: &str, depth: usize) -> Option<GoType> {
        let Some(TypeDef::Struct(fields)) = self.types.get(key) else {
            return None;
        };
        if let Some(field) = fields.iter().find(|f| f.name == name) {
            return Some(field.ty.clone());
        }
        if depth == 0 {
            return None;
        }
        fields
            .iter()
            .filter(|f| f.embedded)
            .find_map(|f| {
                f.ty.named_key()
                    .and_then(|inner| self.field_type_at(inner, name, depth - 1))
            })
    }

    fn embedded_fields(&self, key: &TypeKey) -> Vec<&FieldDef> {
        match self.types.get(key) {
            Some(TypeDef::Struct(fields)) => fields.iter().filter(|f| f.embedded).collect(),
            _ => Vec::new(),
        }
    }
}
