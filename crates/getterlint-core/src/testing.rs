//! Test support: a tiny Go-flavored statement parser and a schema-backed
//! oracle, so engine tests can be written as source text.
//!
//! The parser understands one statement per line: expressions, `a = b`,
//! `a, b := c, d`, `a += b`, `a++`, `a--`. Spans and lines are real byte
//! offsets into the given text.

use std::collections::HashMap;

use crate::ast::{
    AssignStmt, Expr, ExprBuilder, ExprKind, IncDecStmt, Member, SourceFile, Stmt, UnaryOp,
};
use crate::oracle::TypeOracle;
use crate::patch::Span;

// ============================================================================
// Parser
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Lit(String),
    Punct(&'static str),
}

const PUNCTS: &[&str] = &[
    ":=", "+=", "-=", "++", "--", "==", "!=", "<=", ">=", "&&", "||", "<-", ".", "(", ")", "[",
    "]", ",", "&", "*", "!", "=", "+", "-", "<", ">", "/",
];

fn tokenize(line: &str, base: usize) -> Vec<(Tok, usize, usize)> {
    let bytes = line.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < bytes.len() && ((bytes[i] as char).is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            out.push((Tok::Ident(line[start..i].to_string()), base + start, base + i));
        } else if c.is_ascii_digit() {
            let start = i;
            while i < bytes.len() && (bytes[i] as char).is_ascii_digit() {
                i += 1;
            }
            out.push((Tok::Lit(line[start..i].to_string()), base + start, base + i));
        } else if c == '"' {
            let start = i;
            i += 1;
            while i < bytes.len() && bytes[i] != b'"' {
                i += 1;
            }
            i += 1;
            out.push((Tok::Lit(line[start..i].to_string()), base + start, base + i));
        } else {
            let punct = PUNCTS
                .iter()
                .find(|p| line[i..].starts_with(**p))
                .unwrap_or_else(|| panic!("unexpected character {:?}", c));
            out.push((Tok::Punct(punct), base + i, base + i + punct.len()));
            i += punct.len();
        }
    }
    out
}

struct Parser<'b> {
    toks: Vec<(Tok, usize, usize)>,
    pos: usize,
    line: u32,
    builder: &'b mut ExprBuilder,
}

impl<'b> Parser<'b> {
    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos).map(|t| &t.0)
    }

    fn peek_punct(&self, p: &str) -> bool {
        matches!(self.peek(), Some(Tok::Punct(q)) if *q == p)
    }

    fn bump(&mut self) -> (Tok, usize, usize) {
        let tok = self.toks[self.pos].clone();
        self.pos += 1;
        tok
    }

    fn node(&mut self, kind: ExprKind, start: usize, end: usize) -> Expr {
        self.builder
            .node(kind, Span::new(start as u64, end as u64), self.line)
    }

    fn expr_list(&mut self) -> Vec<Expr> {
        let mut list = vec![self.expr(0)];
        while self.peek_punct(",") {
            self.bump();
            list.push(self.expr(0));
        }
        list
    }

    fn stmt(&mut self) -> Stmt {
        let start = self.toks[0].1;
        let targets = self.expr_list();
        let end_of = |e: &Expr| e.span.end;
        for op in ["=", ":=", "+=", "-="] {
            if self.peek_punct(op) {
                self.bump();
                let values = self.expr_list();
                let end = values.last().map(end_of).unwrap_or(start as u64);
                return Stmt::Assign(AssignStmt {
                    span: Span::new(start as u64, end),
                    line: self.line,
                    targets,
                    op: op.to_string(),
                    values,
                });
            }
        }
        if self.peek_punct("++") || self.peek_punct("--") {
            let (tok, _, end) = self.bump();
            let operand = targets.into_iter().next().unwrap();
            return Stmt::IncDec(IncDecStmt {
                span: Span::new(start as u64, end as u64),
                line: self.line,
                operand,
                increment: tok == Tok::Punct("++"),
            });
        }
        assert_eq!(targets.len(), 1, "bare expression lists are not statements");
        Stmt::Expr(targets.into_iter().next().unwrap())
    }

    fn precedence(op: &str) -> Option<u8> {
        match op {
            "||" => Some(1),
            "&&" => Some(2),
            "==" | "!=" | "<" | "<=" | ">" | ">=" => Some(3),
            "+" | "-" => Some(4),
            "*" | "/" => Some(5),
            _ => None,
        }
    }

    fn expr(&mut self, min_prec: u8) -> Expr {
        let mut left = self.unary();
        loop {
            let op = match self.peek() {
                Some(Tok::Punct(p)) => *p,
                _ => break,
            };
            let prec = match Self::precedence(op) {
                Some(p) if p > min_prec => p,
                _ => break,
            };
            self.bump();
            let right = self.expr(prec);
            let (start, end) = (left.span.start as usize, right.span.end as usize);
            left = self.node(
                ExprKind::Binary {
                    left: Box::new(left),
                    op: op.to_string(),
                    right: Box::new(right),
                },
                start,
                end,
            );
        }
        left
    }

    fn unary(&mut self) -> Expr {
        if let Some(Tok::Punct(p)) = self.peek() {
            if let Some(op) = UnaryOp::from_token(p) {
                let (_, start, _) = self.bump();
                let operand = self.unary();
                let end = operand.span.end as usize;
                return self.node(
                    ExprKind::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                    start,
                    end,
                );
            }
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Expr {
        let mut expr = self.primary();
        loop {
            let start = expr.span.start as usize;
            if self.peek_punct(".") {
                self.bump();
                let (tok, ms, me) = self.bump();
                let name = match tok {
                    Tok::Ident(name) => name,
                    other => panic!("expected member name, got {:?}", other),
                };
                expr = self.node(
                    ExprKind::Selector {
                        base: Box::new(expr),
                        member: Member {
                            name,
                            span: Span::new(ms as u64, me as u64),
                        },
                    },
                    start,
                    me,
                );
            } else if self.peek_punct("(") {
                self.bump();
                let mut args = Vec::new();
                while !self.peek_punct(")") {
                    args.push(self.expr(0));
                    if self.peek_punct(",") {
                        self.bump();
                    }
                }
                let (_, _, end) = self.bump();
                expr = self.node(
                    ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                    },
                    start,
                    end,
                );
            } else if self.peek_punct("[") {
                self.bump();
                let index = self.expr(0);
                let (_, _, end) = self.bump();
                expr = self.node(
                    ExprKind::Index {
                        base: Box::new(expr),
                        index: Box::new(index),
                    },
                    start,
                    end,
                );
            } else {
                return expr;
            }
        }
    }

    fn primary(&mut self) -> Expr {
        let (tok, start, end) = self.bump();
        match tok {
            Tok::Ident(name) => self.node(ExprKind::Ident(name), start, end),
            Tok::Lit(text) => self.node(ExprKind::Literal(text), start, end),
            Tok::Punct("(") => {
                let inner = self.expr(0);
                let (_, _, end) = self.bump();
                self.node(ExprKind::Paren(Box::new(inner)), start, end)
            }
            other => panic!("unexpected token {:?}", other),
        }
    }
}

/// Parse `source` (one statement per line) into a file named `test.go`.
pub(crate) fn parse(source: &str) -> SourceFile {
    let mut builder = ExprBuilder::new();
    let mut body = Vec::new();
    let mut offset = 0usize;
    for (idx, line) in source.split('\n').enumerate() {
        let toks = tokenize(line, offset);
        offset += line.len() + 1;
        if toks.is_empty() {
            continue;
        }
        let mut parser = Parser {
            toks,
            pos: 0,
            line: idx as u32 + 1,
            builder: &mut builder,
        };
        body.push(parser.stmt());
    }
    SourceFile {
        path: "test.go".to_string(),
        body,
    }
}

// ============================================================================
// Schema oracle
// ============================================================================

#[derive(Debug, Default, Clone)]
pub(crate) struct TypeDef {
    pub message: bool,
    pub fields: Vec<(String, String)>,
    /// Method name to result type.
    pub methods: Vec<(String, String)>,
}

/// Structural oracle: types are strings like `*T`, `[]*T`, `func:R`.
#[derive(Debug, Default, Clone)]
pub(crate) struct SchemaOracle {
    pub types: HashMap<String, TypeDef>,
    pub vars: HashMap<String, String>,
}

impl SchemaOracle {
    /// Message `T { S string; D float64; Embedded *T; RepeatedEmbeddeds []*T;
    /// I64 int64 }` with getters, setter `SetS`, and `CustomMethod`; plain
    /// type `Other` with `MyMethod() *T`.
    pub fn proto() -> Self {
        let fields = [
            ("S", "string"),
            ("D", "float64"),
            ("Embedded", "*T"),
            ("RepeatedEmbeddeds", "[]*T"),
            ("I64", "int64"),
        ];
        let mut t = TypeDef {
            message: true,
            ..TypeDef::default()
        };
        for (name, ty) in fields {
            t.fields.push((name.to_string(), ty.to_string()));
            t.methods.push((format!("Get{}", name), ty.to_string()));
        }
        t.methods.push(("ProtoReflect".into(), "Message".into()));
        t.methods.push(("SetS".into(), "void".into()));
        t.methods.push(("CustomMethod".into(), "error".into()));

        let other = TypeDef {
            message: false,
            fields: vec![("S".into(), "string".into())],
            methods: vec![("MyMethod".into(), "*T".into())],
        };

        let mut oracle = SchemaOracle::default();
        oracle.types.insert("T".into(), t);
        oracle.types.insert("Other".into(), other);
        for (name, ty) in [
            ("t", "*T"),
            ("many", "[]*T"),
            ("arr", "[]*T"),
            ("other", "Other"),
            ("fn", "func:bool"),
            ("idx", "int"),
        ] {
            oracle.vars.insert(name.into(), ty.into());
        }
        oracle
    }

    fn lookup(&self, ty: &str) -> Option<&TypeDef> {
        self.types.get(ty.strip_prefix('*').unwrap_or(ty))
    }

    pub fn type_of(&self, expr: &Expr) -> Option<String> {
        match &expr.kind {
            ExprKind::Ident(name) => self.vars.get(name).cloned(),
            ExprKind::Selector { base, member } => {
                let def = self.lookup(&self.type_of(base)?)?;
                if let Some((_, ty)) = def.fields.iter().find(|(n, _)| *n == member.name) {
                    return Some(ty.clone());
                }
                def.methods
                    .iter()
                    .find(|(n, _)| *n == member.name)
                    .map(|(_, r)| format!("func:{}", r))
            }
            ExprKind::Call { callee, .. } => self
                .type_of(callee)?
                .strip_prefix("func:")
                .map(str::to_string),
            ExprKind::Index { base, .. } => self
                .type_of(base)?
                .strip_prefix("[]")
                .map(str::to_string),
            ExprKind::Paren(inner) => self.type_of(inner),
            ExprKind::Unary { op, operand } => {
                let ty = self.type_of(operand)?;
                match op {
                    UnaryOp::AddressOf => Some(format!("*{}", ty)),
                    UnaryOp::Deref => ty.strip_prefix('*').map(str::to_string),
                    _ => Some(ty),
                }
            }
            _ => None,
        }
    }
}

impl TypeOracle for SchemaOracle {
    fn type_name(&self, expr: &Expr) -> Option<String> {
        self.type_of(expr)
    }

    fn is_message_type(&self, expr: &Expr) -> bool {
        self.type_of(expr)
            .and_then(|ty| self.lookup(&ty).map(|def| def.message))
            .unwrap_or(false)
    }

    fn method_names(&self, expr: &Expr) -> Vec<String> {
        self.type_of(expr)
            .and_then(|ty| self.lookup(&ty))
            .map(|def| def.methods.iter().map(|(n, _)| n.clone()).collect())
            .unwrap_or_default()
    }
}

/// First expression of the first statement (for renderer tests).
pub(crate) fn first_expr(file: &SourceFile) -> &Expr {
    match &file.body[0] {
        Stmt::Expr(e) => e,
        Stmt::Assign(a) => &a.values[0],
        Stmt::IncDec(i) => &i.operand,
        Stmt::Compound { .. } => panic!("no expression"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parser_tracks_spans_across_lines() {
        let file = parse("a = 1\n_ = t.Embedded.S");
        let Stmt::Assign(second) = &file.body[1] else {
            panic!("expected assignment");
        };
        assert_eq!(second.line, 2);
        let value = &second.values[0];
        assert_eq!(value.span, Span::new(10, 22));
        let ExprKind::Selector { member, .. } = &value.kind else {
            panic!("expected selector");
        };
        assert_eq!(member.name, "S");
        assert_eq!(member.span, Span::new(21, 22));
    }

    #[test]
    fn schema_oracle_resolves_chains() {
        let oracle = SchemaOracle::proto();
        let file = parse("many[0].GetEmbedded().S");
        let expr = first_expr(&file);
        assert_eq!(oracle.type_of(expr).as_deref(), Some("string"));
        let ExprKind::Selector { base, .. } = &expr.kind else {
            panic!("expected selector");
        };
        assert!(oracle.is_message_type(base));
    }
}
