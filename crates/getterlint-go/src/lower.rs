//! Lowering tree-sitter Go syntax into the core tree.
//!
//! A [`Lowerer`] walks one parsed file, producing core statements and
//! expressions. Along the way it tracks local bindings in a [`ScopeStack`]
//! and records a resolved [`GoType`] for every expression whose type can be
//! followed from syntax and the [`TypeIndex`]. Expressions without an entry
//! are of unknown type.

use std::collections::HashMap;

use getterlint_core::ast::{
    AssignStmt, Expr, ExprBuilder, ExprKind, IncDecStmt, Member, NodeId, SourceFile, Stmt, UnaryOp,
};
use getterlint_core::patch::Span;
use tracing::trace;
use tree_sitter::{Node, Tree};

use crate::index::{file_context, TypeIndex};
use crate::scope::ScopeStack;
use crate::syntax::node_text;
use crate::types::{
    is_predeclared, parameter_types, resolve_type, result_types, FileContext, GoType, TypeKey,
};

/// How many alias/underlying hops are followed.
const UNDERLYING_DEPTH: usize = 4;

/// Node kinds that spell a type.
const TYPE_KINDS: &[&str] = &[
    "type_identifier",
    "qualified_type",
    "pointer_type",
    "slice_type",
    "array_type",
    "implicit_length_array_type",
    "map_type",
    "channel_type",
    "function_type",
    "struct_type",
    "interface_type",
    "generic_type",
    "parenthesized_type",
    "negated_type",
];

fn is_type_kind(kind: &str) -> bool {
    TYPE_KINDS.contains(&kind)
}

/// Expression kinds rendered from their source text, with lowered children
/// spliced back in. Type syntax is rendered the same way.
const VERBATIM_KINDS: &[&str] = &[
    "composite_literal",
    "literal_value",
    "func_literal",
    "type_assertion_expression",
    "slice_expression",
];

fn is_verbatim_kind(kind: &str) -> bool {
    VERBATIM_KINDS.contains(&kind) || is_type_kind(kind)
}

fn is_statement_kind(kind: &str) -> bool {
    kind.ends_with("_statement")
        || kind.ends_with("_declaration")
        || matches!(
            kind,
            "block"
                | "statement_list"
                | "expression_case"
                | "default_case"
                | "type_case"
                | "communication_case"
        )
}

fn span_of(node: Node<'_>) -> Span {
    Span::new(node.start_byte() as u64, node.end_byte() as u64)
}

fn line_of(node: Node<'_>) -> u32 {
    node.start_position().row as u32 + 1
}

fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

fn field_children<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

/// Items of an `expression_list`, or the node itself.
fn list_items(node: Node<'_>) -> Vec<Node<'_>> {
    if node.kind() == "expression_list" {
        named_children(node)
    } else {
        vec![node]
    }
}

fn has_token(node: Node<'_>, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|child| child.kind() == token);
    found
}

fn basic(name: &str) -> GoType {
    GoType::Basic(name.to_string())
}

/// A lowered file and the resolved types of its expressions.
#[derive(Debug, Clone)]
pub struct LoweredFile {
    pub file: SourceFile,
    pub types: HashMap<NodeId, GoType>,
}

/// Lower one parsed file.
pub fn lower_file(path: &str, tree: &Tree, source: &str, index: &TypeIndex) -> LoweredFile {
    let src = source.as_bytes();
    let root = tree.root_node();
    let ctx = file_context(root, src);
    let mut lowerer = Lowerer::new(src, &ctx, index);
    let body = lowerer.lower_top_level(root);
    trace!(
        file = path,
        nodes = lowerer.builder.count(),
        typed = lowerer.types.len(),
        "file lowered"
    );
    LoweredFile {
        file: SourceFile {
            path: path.to_string(),
            body,
        },
        types: lowerer.types,
    }
}

/// Per-file lowering state.
pub struct Lowerer<'a> {
    src: &'a [u8],
    ctx: &'a FileContext,
    index: &'a TypeIndex,
    builder: ExprBuilder,
    scopes: ScopeStack,
    types: HashMap<NodeId, GoType>,
}

impl<'a> Lowerer<'a> {
    pub fn new(src: &'a [u8], ctx: &'a FileContext, index: &'a TypeIndex) -> Self {
        Self {
            src,
            ctx,
            index,
            builder: ExprBuilder::new(),
            scopes: ScopeStack::new(),
            types: HashMap::new(),
        }
    }

    fn text(&self, node: Node<'_>) -> &'a str {
        node_text(node, self.src)
    }

    fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.scopes.push();
        let out = f(self);
        self.scopes.pop();
        out
    }

    fn make(&mut self, node: Node<'_>, kind: ExprKind, ty: GoType) -> Expr {
        let expr = self.builder.node(kind, span_of(node), line_of(node));
        if !ty.is_unknown() {
            self.types.insert(expr.id, ty);
        }
        expr
    }

    fn make_other(
        &mut self,
        node: Node<'_>,
        children: Vec<Expr>,
        body: Vec<Stmt>,
        ty: GoType,
    ) -> Expr {
        let text = is_verbatim_kind(node.kind()).then(|| self.text(node).to_string());
        let kind = ExprKind::Other {
            kind: node.kind().to_string(),
            text,
            children,
            body,
        };
        self.make(node, kind, ty)
    }

    fn type_of(&self, expr: &Expr) -> GoType {
        self.types.get(&expr.id).cloned().unwrap_or(GoType::Unknown)
    }

    fn resolve(&self, node: Node<'_>) -> GoType {
        resolve_type(node, self.src, self.ctx)
    }

    fn bind_params(&mut self, list: Node<'_>) {
        for (name, ty) in parameter_types(list, self.src, self.ctx) {
            if let Some(name) = name {
                self.scopes.bind(&name, ty);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------

    fn lower_top_level(&mut self, root: Node<'_>) -> Vec<Stmt> {
        let mut body = Vec::new();
        for child in named_children(root) {
            match child.kind() {
                "package_clause" | "import_declaration" | "type_declaration" => {}
                _ => body.extend(self.lower_stmt(child)),
            }
        }
        body
    }

    fn lower_stmt(&mut self, node: Node<'_>) -> Option<Stmt> {
        let stmt = match node.kind() {
            "function_declaration" | "method_declaration" => self.lower_function(node),
            "assignment_statement" => self.lower_assignment(node),
            "short_var_declaration" => self.lower_short_var(node),
            "inc_statement" | "dec_statement" => self.lower_inc_dec(node)?,
            "expression_statement" => Stmt::Expr(self.lower_expr(node.named_child(0)?)),
            "var_declaration" | "const_declaration" => self.lower_value_decl(node),
            "block" => self.scoped(|l| l.lower_block(node)),
            "if_statement" => self.lower_if(node),
            "for_statement" => self.lower_for(node),
            "expression_switch_statement" | "select_statement" => self.lower_switch(node),
            "type_switch_statement" => self.lower_type_switch(node),
            "expression_case" | "default_case" | "communication_case" => self.lower_case(node),
            "receive_statement" => self.lower_receive(node),
            "type_declaration" | "empty_statement" | "break_statement" | "continue_statement"
            | "goto_statement" | "fallthrough_statement" | "comment" | "label_name" => return None,
            kind if is_type_kind(kind) => return None,
            _ => self.lower_generic_stmt(node),
        };
        Some(stmt)
    }

    fn compound(node: Node<'_>, children: Vec<Stmt>) -> Stmt {
        Stmt::Compound {
            kind: node.kind().to_string(),
            span: span_of(node),
            children,
        }
    }

    /// Statements of a block, without opening a scope.
    fn block_statements(&mut self, block: Node<'_>) -> Vec<Stmt> {
        let mut out = Vec::new();
        for child in named_children(block) {
            if child.kind() == "statement_list" {
                out.extend(self.block_statements(child));
            } else {
                out.extend(self.lower_stmt(child));
            }
        }
        out
    }

    fn lower_block(&mut self, node: Node<'_>) -> Stmt {
        let children = self.block_statements(node);
        Self::compound(node, children)
    }

    fn lower_generic_stmt(&mut self, node: Node<'_>) -> Stmt {
        let mut children = Vec::new();
        for child in named_children(node) {
            self.lower_child_into(child, &mut children);
        }
        Self::compound(node, children)
    }

    fn lower_child_into(&mut self, child: Node<'_>, out: &mut Vec<Stmt>) {
        match child.kind() {
            "expression_list" => {
                for item in named_children(child) {
                    out.push(Stmt::Expr(self.lower_expr(item)));
                }
            }
            "label_name" | "field_identifier" => {}
            kind if is_type_kind(kind) => {}
            kind if is_statement_kind(kind) => out.extend(self.lower_stmt(child)),
            _ => out.push(Stmt::Expr(self.lower_expr(child))),
        }
    }

    fn lower_function(&mut self, node: Node<'_>) -> Stmt {
        self.scoped(|l| {
            if let Some(receiver) = node.child_by_field_name("receiver") {
                l.bind_params(receiver);
            }
            if let Some(params) = node.child_by_field_name("parameters") {
                l.bind_params(params);
            }
            if let Some(result) = node.child_by_field_name("result") {
                if result.kind() == "parameter_list" {
                    l.bind_params(result);
                }
            }
            let children = node
                .child_by_field_name("body")
                .map(|body| l.block_statements(body))
                .unwrap_or_default();
            Self::compound(node, children)
        })
    }

    fn lower_list(&mut self, node: Option<Node<'_>>) -> Vec<Expr> {
        node.map(list_items)
            .unwrap_or_default()
            .into_iter()
            .map(|item| self.lower_expr(item))
            .collect()
    }

    fn lower_assignment(&mut self, node: Node<'_>) -> Stmt {
        let targets = self.lower_list(node.child_by_field_name("left"));
        let values = self.lower_list(node.child_by_field_name("right"));
        let op = node
            .child_by_field_name("operator")
            .map(|op| self.text(op))
            .unwrap_or("=");
        Stmt::Assign(AssignStmt {
            span: span_of(node),
            line: line_of(node),
            targets,
            op: op.to_string(),
            values,
        })
    }

    /// Types bound by `names := values`, spreading multi-value calls and
    /// comma-ok forms.
    fn distribute(&self, count: usize, values: &[Expr]) -> Vec<GoType> {
        if let [single] = values {
            if count > 1 {
                return match self.type_of(single) {
                    GoType::Tuple(items) => {
                        let mut items = items;
                        items.resize(count, GoType::Unknown);
                        items
                    }
                    ty if count == 2 => vec![ty, basic("bool")],
                    _ => vec![GoType::Unknown; count],
                };
            }
        }
        (0..count)
            .map(|i| values.get(i).map(|v| self.type_of(v)).unwrap_or(GoType::Unknown))
            .collect()
    }

    fn bind_names(&mut self, names: &[Node<'_>], types: Vec<GoType>) {
        for (name, ty) in names.iter().zip(types) {
            if name.kind() == "identifier" {
                let name = self.text(*name);
                self.scopes.bind(name, ty);
            }
        }
    }

    fn lower_short_var(&mut self, node: Node<'_>) -> Stmt {
        let values = self.lower_list(node.child_by_field_name("right"));
        let names = node
            .child_by_field_name("left")
            .map(list_items)
            .unwrap_or_default();
        let types = self.distribute(names.len(), &values);
        self.bind_names(&names, types);
        let targets = names.into_iter().map(|n| self.lower_expr(n)).collect();
        Stmt::Assign(AssignStmt {
            span: span_of(node),
            line: line_of(node),
            targets,
            op: ":=".to_string(),
            values,
        })
    }

    fn lower_inc_dec(&mut self, node: Node<'_>) -> Option<Stmt> {
        let operand = self.lower_expr(node.named_child(0)?);
        Some(Stmt::IncDec(IncDecStmt {
            span: span_of(node),
            line: line_of(node),
            operand,
            increment: node.kind() == "inc_statement",
        }))
    }

    fn lower_value_decl(&mut self, node: Node<'_>) -> Stmt {
        let mut children = Vec::new();
        self.lower_specs(node, &mut children);
        Self::compound(node, children)
    }

    fn lower_specs(&mut self, node: Node<'_>, out: &mut Vec<Stmt>) {
        for child in named_children(node) {
            match child.kind() {
                "var_spec" | "const_spec" => {
                    let values = self.lower_list(child.child_by_field_name("value"));
                    let names = field_children(child, "name");
                    let types = match child.child_by_field_name("type") {
                        Some(ty) => vec![self.resolve(ty); names.len()],
                        None => self.distribute(names.len(), &values),
                    };
                    self.bind_names(&names, types);
                    out.extend(values.into_iter().map(Stmt::Expr));
                }
                "var_spec_list" | "const_spec_list" => self.lower_specs(child, out),
                _ => {}
            }
        }
    }

    fn lower_if(&mut self, node: Node<'_>) -> Stmt {
        self.scoped(|l| {
            let mut children = Vec::new();
            if let Some(init) = node.child_by_field_name("initializer") {
                children.extend(l.lower_stmt(init));
            }
            if let Some(cond) = node.child_by_field_name("condition") {
                children.push(Stmt::Expr(l.lower_expr(cond)));
            }
            if let Some(consequence) = node.child_by_field_name("consequence") {
                children.extend(l.lower_stmt(consequence));
            }
            if let Some(alternative) = node.child_by_field_name("alternative") {
                children.extend(l.lower_stmt(alternative));
            }
            Self::compound(node, children)
        })
    }

    fn lower_for(&mut self, node: Node<'_>) -> Stmt {
        self.scoped(|l| {
            let mut children = Vec::new();
            for child in named_children(node) {
                match child.kind() {
                    "for_clause" => {
                        for field in ["initializer", "condition", "update"] {
                            if let Some(part) = child.child_by_field_name(field) {
                                l.lower_child_into(part, &mut children);
                            }
                        }
                    }
                    "range_clause" => children.push(l.lower_range(child)),
                    "block" => children.extend(l.lower_stmt(child)),
                    _ => l.lower_child_into(child, &mut children),
                }
            }
            Self::compound(node, children)
        })
    }

    fn range_types(&self, ty: &GoType) -> Vec<GoType> {
        match self.underlying(ty.deref()) {
            GoType::Slice(elem) | GoType::Array(elem) => vec![basic("int"), *elem],
            GoType::Map(key, value) => vec![*key, *value],
            GoType::Chan(elem) => vec![*elem],
            GoType::Basic(name) if name == "string" => vec![basic("int"), basic("rune")],
            GoType::Basic(name) => vec![GoType::Basic(name)],
            _ => Vec::new(),
        }
    }

    fn lower_range(&mut self, clause: Node<'_>) -> Stmt {
        let value = clause.child_by_field_name("right").map(|r| self.lower_expr(r));
        let names = clause
            .child_by_field_name("left")
            .map(list_items)
            .unwrap_or_default();
        let Some(value) = value else {
            return Self::compound(clause, Vec::new());
        };
        if names.is_empty() {
            return Stmt::Expr(value);
        }

        let declares = has_token(clause, ":=");
        if declares {
            let types = self.range_types(&self.type_of(&value));
            self.bind_names(&names, types);
        }
        let targets = names.into_iter().map(|n| self.lower_expr(n)).collect();
        Stmt::Assign(AssignStmt {
            span: span_of(clause),
            line: line_of(clause),
            targets,
            op: if declares { ":=" } else { "=" }.to_string(),
            values: vec![value],
        })
    }

    fn lower_switch(&mut self, node: Node<'_>) -> Stmt {
        self.scoped(|l| {
            let mut children = Vec::new();
            if let Some(init) = node.child_by_field_name("initializer") {
                children.extend(l.lower_stmt(init));
            }
            if let Some(value) = node.child_by_field_name("value") {
                children.push(Stmt::Expr(l.lower_expr(value)));
            }
            for case in named_children(node) {
                if matches!(
                    case.kind(),
                    "expression_case" | "default_case" | "communication_case"
                ) {
                    children.push(l.lower_case(case));
                }
            }
            Self::compound(node, children)
        })
    }

    fn lower_case(&mut self, node: Node<'_>) -> Stmt {
        self.scoped(|l| {
            let mut children = Vec::new();
            for child in named_children(node) {
                match child.kind() {
                    "expression_list" => l.lower_child_into(child, &mut children),
                    "statement_list" => children.extend(l.block_statements(child)),
                    _ => l.lower_child_into(child, &mut children),
                }
            }
            Self::compound(node, children)
        })
    }

    fn lower_type_switch(&mut self, node: Node<'_>) -> Stmt {
        self.scoped(|l| {
            let mut children = Vec::new();
            if let Some(init) = node.child_by_field_name("initializer") {
                children.extend(l.lower_stmt(init));
            }
            let alias = node
                .child_by_field_name("alias")
                .and_then(|a| list_items(a).into_iter().next())
                .map(|a| l.text(a));
            let mut value_ty = GoType::Unknown;
            if let Some(value) = node.child_by_field_name("value") {
                let value = l.lower_expr(value);
                value_ty = l.type_of(&value);
                children.push(Stmt::Expr(value));
            }

            for case in named_children(node) {
                if !matches!(case.kind(), "type_case" | "default_case") {
                    continue;
                }
                let stmt = l.scoped(|l| {
                    let types = field_children(case, "type");
                    if let Some(alias) = alias {
                        let ty = match types.as_slice() {
                            [single] => l.resolve(*single),
                            _ => value_ty.clone(),
                        };
                        l.scopes.bind(alias, ty);
                    }
                    let mut body = Vec::new();
                    for child in named_children(case) {
                        if types.contains(&child) {
                            continue;
                        }
                        if child.kind() == "statement_list" {
                            body.extend(l.block_statements(child));
                        } else {
                            l.lower_child_into(child, &mut body);
                        }
                    }
                    Self::compound(case, body)
                });
                children.push(stmt);
            }
            Self::compound(node, children)
        })
    }

    fn lower_receive(&mut self, node: Node<'_>) -> Stmt {
        let Some(right) = node.child_by_field_name("right") else {
            return self.lower_generic_stmt(node);
        };
        let value = self.lower_expr(right);
        let names = node
            .child_by_field_name("left")
            .map(list_items)
            .unwrap_or_default();
        if names.is_empty() {
            return Stmt::Expr(value);
        }
        let declares = has_token(node, ":=");
        if declares {
            let types = self.distribute(names.len(), std::slice::from_ref(&value));
            self.bind_names(&names, types);
        }
        let targets = names.into_iter().map(|n| self.lower_expr(n)).collect();
        Stmt::Assign(AssignStmt {
            span: span_of(node),
            line: line_of(node),
            targets,
            op: if declares { ":=" } else { "=" }.to_string(),
            values: vec![value],
        })
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    fn lower_expr(&mut self, node: Node<'_>) -> Expr {
        match node.kind() {
            "identifier" => {
                let name = self.text(node);
                let ty = self.ident_type(name);
                self.make(node, ExprKind::Ident(name.to_string()), ty)
            }
            "field_identifier" | "package_identifier" | "label_name" => {
                let name = self.text(node).to_string();
                self.make(node, ExprKind::Ident(name), GoType::Unknown)
            }
            "nil" | "iota" => {
                let name = self.text(node).to_string();
                self.make(node, ExprKind::Ident(name), GoType::Unknown)
            }
            "true" | "false" => {
                let name = self.text(node).to_string();
                self.make(node, ExprKind::Ident(name), basic("bool"))
            }
            "int_literal" => self.literal(node, "int"),
            "float_literal" => self.literal(node, "float64"),
            "imaginary_literal" => self.literal(node, "complex128"),
            "rune_literal" => self.literal(node, "rune"),
            "interpreted_string_literal" | "raw_string_literal" => self.literal(node, "string"),
            "selector_expression" => self.lower_selector(node),
            "call_expression" => self.lower_call(node),
            "index_expression" => self.lower_index(node),
            "unary_expression" => self.lower_unary(node),
            "binary_expression" => self.lower_binary(node),
            "parenthesized_expression" => match node.named_child(0) {
                Some(inner) => {
                    let inner = self.lower_expr(inner);
                    let ty = self.type_of(&inner);
                    self.make(node, ExprKind::Paren(Box::new(inner)), ty)
                }
                None => self.make_other(node, Vec::new(), Vec::new(), GoType::Unknown),
            },
            "type_conversion_expression" => self.lower_conversion(node),
            "composite_literal" => self.lower_composite(node),
            "func_literal" => self.lower_func_literal(node),
            "type_assertion_expression" => self.lower_assertion(node),
            "slice_expression" => self.lower_slice(node),
            "literal_value" => {
                let children = self.lower_literal_value(node);
                self.make_other(node, children, Vec::new(), GoType::Unknown)
            }
            kind if is_type_kind(kind) => self.lower_type_expr(node),
            _ => {
                let children = named_children(node)
                    .into_iter()
                    .map(|child| self.lower_expr(child))
                    .collect();
                self.make_other(node, children, Vec::new(), GoType::Unknown)
            }
        }
    }

    fn literal(&mut self, node: Node<'_>, ty: &str) -> Expr {
        let text = self.text(node).to_string();
        self.make(node, ExprKind::Literal(text), basic(ty))
    }

    fn ident_type(&self, name: &str) -> GoType {
        if let Some(ty) = self.scopes.lookup(name) {
            return ty.clone();
        }
        if let Some(package) = self.ctx.resolve_import(name) {
            return GoType::Package(package.to_string());
        }
        let key = TypeKey::new(self.ctx.package.clone(), name);
        if let Some(ty) = self.index.var_type(&key) {
            return ty.clone();
        }
        if let Some(results) = self.index.func_results(&key) {
            return GoType::Func(results.to_vec());
        }
        if self.index.has_type(&key) {
            return GoType::TypeExpr(Box::new(GoType::Named(key)));
        }
        if is_predeclared(name) {
            return GoType::TypeExpr(Box::new(basic(name)));
        }
        GoType::Unknown
    }

    /// Follow declared types to their underlying type.
    fn underlying(&self, ty: &GoType) -> GoType {
        let mut current = ty.clone();
        for _ in 0..UNDERLYING_DEPTH {
            let GoType::Named(key) = &current else {
                break;
            };
            match self.index.underlying(key) {
                Some(next) => current = next.clone(),
                None => break,
            }
        }
        current
    }

    fn selector_type(&self, base: &GoType, member: &str) -> GoType {
        match base {
            GoType::Package(package) => {
                let key = TypeKey::new(package.clone(), member);
                if let Some(ty) = self.index.var_type(&key) {
                    return ty.clone();
                }
                if let Some(results) = self.index.func_results(&key) {
                    return GoType::Func(results.to_vec());
                }
                if self.index.has_type(&key) {
                    return GoType::TypeExpr(Box::new(GoType::Named(key)));
                }
                GoType::Unknown
            }
            // Method expression: `T.Method`.
            GoType::TypeExpr(inner) => inner
                .named_key()
                .and_then(|key| self.index.method_results(key, member))
                .map(GoType::Func)
                .unwrap_or(GoType::Unknown),
            _ => self.member_type(base, member),
        }
    }

    fn member_type(&self, base: &GoType, member: &str) -> GoType {
        let mut current = base.clone();
        for _ in 0..UNDERLYING_DEPTH {
            let Some(key) = current.named_key().cloned() else {
                return GoType::Unknown;
            };
            if let Some(field) = self.index.field_type(&key, member) {
                return field;
            }
            if let Some(results) = self.index.method_results(&key, member) {
                return GoType::Func(results);
            }
            match self.index.underlying(&key) {
                Some(next) => current = next.clone(),
                None => return GoType::Unknown,
            }
        }
        GoType::Unknown
    }

    fn element_type(&self, base: &GoType) -> GoType {
        match self.underlying(base.deref()) {
            GoType::Slice(elem) | GoType::Array(elem) => *elem,
            GoType::Map(_, value) => *value,
            GoType::Basic(name) if name == "string" => basic("byte"),
            _ => GoType::Unknown,
        }
    }

    fn lower_selector(&mut self, node: Node<'_>) -> Expr {
        let (Some(operand), Some(field)) = (
            node.child_by_field_name("operand"),
            node.child_by_field_name("field"),
        ) else {
            return self.make_other(node, Vec::new(), Vec::new(), GoType::Unknown);
        };
        let base = self.lower_expr(operand);
        let name = self.text(field).to_string();
        let ty = self.selector_type(&self.type_of(&base), &name);
        let member = Member {
            name,
            span: span_of(field),
        };
        self.make(
            node,
            ExprKind::Selector {
                base: Box::new(base),
                member,
            },
            ty,
        )
    }

    fn lower_arg(&mut self, node: Node<'_>) -> Expr {
        if node.kind() != "variadic_argument" {
            return self.lower_expr(node);
        }
        let children: Vec<Expr> = named_children(node)
            .into_iter()
            .map(|child| self.lower_expr(child))
            .collect();
        let ty = children
            .first()
            .map(|c| self.type_of(c))
            .unwrap_or(GoType::Unknown);
        self.make_other(node, children, Vec::new(), ty)
    }

    fn lower_call(&mut self, node: Node<'_>) -> Expr {
        let Some(function) = node.child_by_field_name("function") else {
            return self.make_other(node, Vec::new(), Vec::new(), GoType::Unknown);
        };
        let callee = self.lower_expr(function);
        let args: Vec<Expr> = node
            .child_by_field_name("arguments")
            .map(named_children)
            .unwrap_or_default()
            .into_iter()
            .map(|arg| self.lower_arg(arg))
            .collect();
        let ty = self.call_type(&callee, &args);
        self.make(
            node,
            ExprKind::Call {
                callee: Box::new(callee),
                args,
            },
            ty,
        )
    }

    fn call_type(&self, callee: &Expr, args: &[Expr]) -> GoType {
        let callee_ty = self.type_of(callee);
        if let (ExprKind::Ident(name), GoType::Unknown) = (&callee.kind, &callee_ty) {
            let first = args.first().map(|a| self.type_of(a));
            return match (name.as_str(), first) {
                ("len" | "cap" | "copy", _) => basic("int"),
                ("new", Some(GoType::TypeExpr(target))) => GoType::Pointer(target),
                ("make", Some(GoType::TypeExpr(target))) => *target,
                ("append" | "min" | "max", Some(ty)) => ty,
                _ => GoType::Unknown,
            };
        }
        callee_ty.call_result()
    }

    fn lower_index(&mut self, node: Node<'_>) -> Expr {
        let (Some(operand), Some(index)) = (
            node.child_by_field_name("operand"),
            node.child_by_field_name("index"),
        ) else {
            return self.make_other(node, Vec::new(), Vec::new(), GoType::Unknown);
        };
        let base = self.lower_expr(operand);
        let index = self.lower_expr(index);
        let base_ty = self.type_of(&base);
        let ty = match base_ty {
            // Generic instantiation keeps the operand's type.
            GoType::Func(_) | GoType::TypeExpr(_) => base_ty,
            other => self.element_type(&other),
        };
        self.make(
            node,
            ExprKind::Index {
                base: Box::new(base),
                index: Box::new(index),
            },
            ty,
        )
    }

    fn lower_unary(&mut self, node: Node<'_>) -> Expr {
        let op = node
            .child_by_field_name("operator")
            .and_then(|op| UnaryOp::from_token(self.text(op)));
        let (Some(op), Some(operand)) = (op, node.child_by_field_name("operand")) else {
            let children = named_children(node)
                .into_iter()
                .map(|child| self.lower_expr(child))
                .collect();
            return self.make_other(node, children, Vec::new(), GoType::Unknown);
        };
        let operand = self.lower_expr(operand);
        let operand_ty = self.type_of(&operand);
        let ty = match op {
            UnaryOp::AddressOf => GoType::pointer(operand_ty),
            UnaryOp::Deref => match operand_ty {
                GoType::TypeExpr(target) => GoType::TypeExpr(Box::new(GoType::Pointer(target))),
                GoType::Pointer(target) => *target,
                _ => GoType::Unknown,
            },
            UnaryOp::Receive => match self.underlying(&operand_ty) {
                GoType::Chan(elem) => *elem,
                _ => GoType::Unknown,
            },
            UnaryOp::Not => basic("bool"),
            UnaryOp::Neg | UnaryOp::Plus | UnaryOp::Complement => operand_ty,
        };
        self.make(
            node,
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            ty,
        )
    }

    fn lower_binary(&mut self, node: Node<'_>) -> Expr {
        let (Some(left), Some(op), Some(right)) = (
            node.child_by_field_name("left"),
            node.child_by_field_name("operator"),
            node.child_by_field_name("right"),
        ) else {
            return self.make_other(node, Vec::new(), Vec::new(), GoType::Unknown);
        };
        let left = self.lower_expr(left);
        let op = self.text(op).to_string();
        let right = self.lower_expr(right);
        let ty = match op.as_str() {
            "==" | "!=" | "<" | "<=" | ">" | ">=" | "&&" | "||" => basic("bool"),
            _ => match self.type_of(&left) {
                GoType::Unknown => self.type_of(&right),
                ty => ty,
            },
        };
        self.make(
            node,
            ExprKind::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
            ty,
        )
    }

    fn lower_conversion(&mut self, node: Node<'_>) -> Expr {
        let (Some(ty_node), Some(operand)) = (
            node.child_by_field_name("type"),
            node.child_by_field_name("operand"),
        ) else {
            return self.make_other(node, Vec::new(), Vec::new(), GoType::Unknown);
        };
        let callee = self.lower_type_expr(ty_node);
        let arg = self.lower_expr(operand);
        let ty = self.resolve(ty_node);
        self.make(
            node,
            ExprKind::Call {
                callee: Box::new(callee),
                args: vec![arg],
            },
            ty,
        )
    }

    fn lower_composite(&mut self, node: Node<'_>) -> Expr {
        let ty = node
            .child_by_field_name("type")
            .map(|t| self.resolve(t))
            .unwrap_or(GoType::Unknown);
        let children = node
            .child_by_field_name("body")
            .map(|body| self.lower_literal_value(body))
            .unwrap_or_default();
        self.make_other(node, children, Vec::new(), ty)
    }

    fn lower_literal_value(&mut self, node: Node<'_>) -> Vec<Expr> {
        let mut out = Vec::new();
        for child in named_children(node) {
            match child.kind() {
                "keyed_element" => {
                    for part in named_children(child) {
                        out.push(self.lower_element(part));
                    }
                }
                _ => out.push(self.lower_element(child)),
            }
        }
        out
    }

    fn lower_element(&mut self, node: Node<'_>) -> Expr {
        if node.kind() == "literal_element" {
            if let Some(inner) = node.named_child(0) {
                return self.lower_expr(inner);
            }
        }
        self.lower_expr(node)
    }

    fn lower_func_literal(&mut self, node: Node<'_>) -> Expr {
        let results = node
            .child_by_field_name("result")
            .map(|r| result_types(r, self.src, self.ctx))
            .unwrap_or_default();
        let body = self.scoped(|l| {
            if let Some(params) = node.child_by_field_name("parameters") {
                l.bind_params(params);
            }
            if let Some(result) = node.child_by_field_name("result") {
                if result.kind() == "parameter_list" {
                    l.bind_params(result);
                }
            }
            node.child_by_field_name("body")
                .map(|body| l.block_statements(body))
                .unwrap_or_default()
        });
        self.make_other(node, Vec::new(), body, GoType::Func(results))
    }

    fn lower_assertion(&mut self, node: Node<'_>) -> Expr {
        let children: Vec<Expr> = node
            .child_by_field_name("operand")
            .map(|operand| self.lower_expr(operand))
            .into_iter()
            .collect();
        let ty = node
            .child_by_field_name("type")
            .map(|t| self.resolve(t))
            .unwrap_or(GoType::Unknown);
        self.make_other(node, children, Vec::new(), ty)
    }

    fn lower_slice(&mut self, node: Node<'_>) -> Expr {
        let mut children = Vec::new();
        for field in ["operand", "start", "end", "capacity"] {
            if let Some(part) = node.child_by_field_name(field) {
                children.push(self.lower_expr(part));
            }
        }
        let ty = match children.first().map(|operand| self.type_of(operand)) {
            Some(operand) => match self.underlying(operand.deref()) {
                GoType::Array(elem) | GoType::Slice(elem) => GoType::Slice(elem),
                GoType::Basic(name) if name == "string" => operand,
                _ => GoType::Unknown,
            },
            None => GoType::Unknown,
        };
        self.make_other(node, children, Vec::new(), ty)
    }

    /// A type spelled in expression position, typed as a type expression.
    fn lower_type_expr(&mut self, node: Node<'_>) -> Expr {
        let ty = GoType::TypeExpr(Box::new(self.resolve(node)));
        match node.kind() {
            "type_identifier" => {
                let name = self.text(node).to_string();
                self.make(node, ExprKind::Ident(name), ty)
            }
            "qualified_type" => {
                let (Some(package), Some(name)) = (
                    node.child_by_field_name("package"),
                    node.child_by_field_name("name"),
                ) else {
                    return self.make_other(node, Vec::new(), Vec::new(), ty);
                };
                let local = self.text(package);
                let resolved = self.ctx.resolve_import(local).unwrap_or(local).to_string();
                let base = self.make(
                    package,
                    ExprKind::Ident(local.to_string()),
                    GoType::Package(resolved),
                );
                let member = Member {
                    name: self.text(name).to_string(),
                    span: span_of(name),
                };
                self.make(
                    node,
                    ExprKind::Selector {
                        base: Box::new(base),
                        member,
                    },
                    ty,
                )
            }
            "pointer_type" => match node.named_child(0) {
                Some(inner) => {
                    let inner = self.lower_type_expr(inner);
                    self.make(
                        node,
                        ExprKind::Unary {
                            op: UnaryOp::Deref,
                            operand: Box::new(inner),
                        },
                        ty,
                    )
                }
                None => self.make_other(node, Vec::new(), Vec::new(), ty),
            },
            "parenthesized_type" => match node.named_child(0) {
                Some(inner) => {
                    let inner = self.lower_type_expr(inner);
                    self.make(node, ExprKind::Paren(Box::new(inner)), ty)
                }
                None => self.make_other(node, Vec::new(), Vec::new(), ty),
            },
            _ => self.make_other(node, Vec::new(), Vec::new(), ty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::collect_decls;
    use crate::syntax::parse_go;

    const PROTO: &str = r#"package proto

type Test struct {
	state    protoimpl.MessageState
	S        string
	Embedded *Test
	Items    []*Test
	ByName   map[string]*Test
}

func (x *Test) GetS() string { return "" }
func (x *Test) ProtoReflect() int { return 0 }

func NewTest() (*Test, error) { return nil, nil }
"#;

    fn lower(source: &str) -> LoweredFile {
        let proto = parse_go("proto/test.pb.go", PROTO).unwrap();
        let user = parse_go("main.go", source).unwrap();
        let index = TypeIndex::from_decls([
            collect_decls(&proto, PROTO.as_bytes()),
            collect_decls(&user, source.as_bytes()),
        ]);
        lower_file("main.go", &user, source, &index)
    }

    /// Type recorded for the first expression whose source text is `needle`.
    fn type_at(lowered: &LoweredFile, source: &str, needle: &str) -> GoType {
        fn find<'e>(stmts: &'e [Stmt], out: &mut Vec<&'e Expr>) {
            for stmt in stmts {
                match stmt {
                    Stmt::Assign(a) => {
                        a.targets.iter().chain(&a.values).for_each(|e| find_expr(e, out))
                    }
                    Stmt::IncDec(s) => find_expr(&s.operand, out),
                    Stmt::Expr(e) => find_expr(e, out),
                    Stmt::Compound { children, .. } => find(children, out),
                }
            }
        }
        fn find_expr<'e>(expr: &'e Expr, out: &mut Vec<&'e Expr>) {
            out.push(expr);
            match &expr.kind {
                ExprKind::Selector { base, .. } => find_expr(base, out),
                ExprKind::Call { callee, args } => {
                    find_expr(callee, out);
                    args.iter().for_each(|a| find_expr(a, out));
                }
                ExprKind::Index { base, index } => {
                    find_expr(base, out);
                    find_expr(index, out);
                }
                ExprKind::Binary { left, right, .. } => {
                    find_expr(left, out);
                    find_expr(right, out);
                }
                ExprKind::Unary { operand, .. } => find_expr(operand, out),
                ExprKind::Paren(inner) => find_expr(inner, out),
                ExprKind::Other { children, body, .. } => {
                    children.iter().for_each(|c| find_expr(c, out));
                    find(body, out);
                }
                ExprKind::Ident(_) | ExprKind::Literal(_) => {}
            }
        }

        let mut all = Vec::new();
        find(&lowered.file.body, &mut all);
        let expr = all
            .into_iter()
            .find(|e| &source[e.span.start as usize..e.span.end as usize] == needle)
            .unwrap_or_else(|| panic!("no expression `{needle}`"));
        lowered.types.get(&expr.id).cloned().unwrap_or(GoType::Unknown)
    }

    fn test_ptr() -> GoType {
        GoType::pointer(GoType::named("proto", "Test"))
    }

    mod statements {
        use super::*;

        #[test]
        fn short_var_decl_spreads_tuple_results() {
            let src = "package main\n\nimport \"example.com/api/proto\"\n\nfunc f() {\n\tt, err := proto.NewTest()\n\t_ = t.S\n\t_ = err\n}\n";
            let lowered = lower(src);
            assert_eq!(type_at(&lowered, src, "t.S"), basic("string"));
            assert_eq!(type_at(&lowered, src, "proto.NewTest()"), GoType::Tuple(vec![test_ptr(), basic("error")]));
        }

        #[test]
        fn assignment_keeps_operator() {
            let src = "package main\n\nfunc f(x int) {\n\tx += 1\n}\n";
            let lowered = lower(src);
            let Stmt::Compound { children, .. } = &lowered.file.body[0] else {
                panic!("expected function");
            };
            let Stmt::Assign(assign) = &children[0] else {
                panic!("expected assignment");
            };
            assert_eq!(assign.op, "+=");
            assert_eq!(assign.targets.len(), 1);
        }

        #[test]
        fn range_binds_element_type() {
            let src = "package main\n\nimport \"example.com/api/proto\"\n\nfunc f(t *proto.Test) {\n\tfor i, item := range t.Items {\n\t\t_ = item.S\n\t\t_ = i\n\t}\n\tfor k, v := range t.ByName {\n\t\t_ = v.Embedded\n\t\t_ = k\n\t}\n}\n";
            let lowered = lower(src);
            assert_eq!(type_at(&lowered, src, "item"), test_ptr());
            assert_eq!(type_at(&lowered, src, "v.Embedded"), test_ptr());
            assert_eq!(type_at(&lowered, src, "k"), basic("string"));
        }

        #[test]
        fn type_switch_binds_case_type() {
            let src = "package main\n\nimport \"example.com/api/proto\"\n\nfunc f(x interface{}) {\n\tswitch v := x.(type) {\n\tcase *proto.Test:\n\t\t_ = v.S\n\t}\n}\n";
            let lowered = lower(src);
            assert_eq!(type_at(&lowered, src, "v"), test_ptr());
        }

        #[test]
        fn inc_dec_is_lowered() {
            let src = "package main\n\nimport \"example.com/api/proto\"\n\nfunc f(t *proto.Test) {\n\tt.Items[0].S = \"\"\n\tn := 0\n\tn++\n}\n";
            let lowered = lower(src);
            let Stmt::Compound { children, .. } = &lowered.file.body[0] else {
                panic!("expected function");
            };
            assert!(matches!(children[2], Stmt::IncDec(IncDecStmt { increment: true, .. })));
        }
    }

    mod expressions {
        use super::*;

        #[test]
        fn receivers_and_params_are_typed() {
            let src = "package main\n\nimport pb \"example.com/api/proto\"\n\ntype Server struct{}\n\nfunc (s *Server) Handle(req *pb.Test) {\n\t_ = req.Embedded.S\n\t_ = s\n}\n";
            let lowered = lower(src);
            assert_eq!(type_at(&lowered, src, "req"), test_ptr());
            assert_eq!(type_at(&lowered, src, "req.Embedded"), test_ptr());
        }

        #[test]
        fn method_call_uses_result_type() {
            let src = "package main\n\nimport \"example.com/api/proto\"\n\nfunc f(t *proto.Test) {\n\t_ = t.GetS()\n}\n";
            let lowered = lower(src);
            assert_eq!(type_at(&lowered, src, "t.GetS()"), basic("string"));
            assert_eq!(type_at(&lowered, src, "t.GetS"), GoType::Func(vec![basic("string")]));
        }

        #[test]
        fn builtins_and_indexing() {
            let src = "package main\n\nimport \"example.com/api/proto\"\n\nfunc f() {\n\tt := new(proto.Test)\n\titems := make([]*proto.Test, 0)\n\titems = append(items, t)\n\t_ = items[0].S\n\t_ = len(items)\n}\n";
            let lowered = lower(src);
            assert_eq!(type_at(&lowered, src, "t"), test_ptr());
            assert_eq!(type_at(&lowered, src, "items[0]"), test_ptr());
            assert_eq!(type_at(&lowered, src, "len(items)"), basic("int"));
        }

        #[test]
        fn composite_literal_and_address_of() {
            let src = "package main\n\nimport \"example.com/api/proto\"\n\nfunc f() {\n\tt := &proto.Test{S: \"x\"}\n\t_ = t\n}\n";
            let lowered = lower(src);
            assert_eq!(type_at(&lowered, src, "proto.Test{S: \"x\"}"), GoType::named("proto", "Test"));
            assert_eq!(type_at(&lowered, src, "&proto.Test{S: \"x\"}"), test_ptr());
        }

        #[test]
        fn conversion_callee_is_type_expression() {
            let src = "package main\n\nimport \"example.com/api/proto\"\n\nfunc f() {\n\t_ = (*proto.Test)(nil).S\n}\n";
            let lowered = lower(src);
            assert_eq!(type_at(&lowered, src, "(*proto.Test)(nil)"), test_ptr());
            assert!(matches!(
                type_at(&lowered, src, "(*proto.Test)"),
                GoType::TypeExpr(_)
            ));
        }

        #[test]
        fn func_literal_body_is_lowered() {
            let src = "package main\n\nimport \"example.com/api/proto\"\n\nfunc f(t *proto.Test) {\n\tg := func() string { return t.S }\n\t_ = g\n}\n";
            let lowered = lower(src);
            assert_eq!(type_at(&lowered, src, "t.S"), basic("string"));
            assert_eq!(type_at(&lowered, src, "g"), GoType::Func(vec![basic("string")]));
        }

        #[test]
        fn shadowed_name_uses_inner_type() {
            let src = "package main\n\nimport \"example.com/api/proto\"\n\nfunc f(t *proto.Test) {\n\t{\n\t\tt := 3\n\t\t_ = t\n\t}\n\t_ = t.S\n}\n";
            let lowered = lower(src);
            assert_eq!(type_at(&lowered, src, "t.S"), basic("string"));
        }
    }
}
