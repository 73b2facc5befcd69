//! [`TypeOracle`] over the types recorded during lowering.

use std::collections::HashMap;

use getterlint_core::ast::{Expr, NodeId};
use getterlint_core::TypeOracle;

use crate::index::TypeIndex;
use crate::lower::LoweredFile;
use crate::types::{GoType, TypeKey};

/// Answers type questions for one lowered file.
pub struct GoOracle<'a> {
    types: &'a HashMap<NodeId, GoType>,
    index: &'a TypeIndex,
}

impl<'a> GoOracle<'a> {
    pub fn new(lowered: &'a LoweredFile, index: &'a TypeIndex) -> Self {
        Self {
            types: &lowered.types,
            index,
        }
    }

    fn type_of(&self, expr: &Expr) -> Option<&'a GoType> {
        self.types.get(&expr.id)
    }

    /// Named type behind one pointer, following a declared alias such as
    /// `type Req = pb.Request`.
    fn named_key(&self, expr: &Expr) -> Option<&'a TypeKey> {
        let key = self.type_of(expr)?.named_key()?;
        match self.index.underlying(key).and_then(GoType::named_key) {
            Some(target) if self.index.has_type(target) => Some(target),
            _ => Some(key),
        }
    }
}

impl TypeOracle for GoOracle<'_> {
    fn type_name(&self, expr: &Expr) -> Option<String> {
        self.type_of(expr).map(|ty| ty.to_string())
    }

    fn is_message_type(&self, expr: &Expr) -> bool {
        self.named_key(expr)
            .is_some_and(|key| self.index.is_message(key))
    }

    fn method_names(&self, expr: &Expr) -> Vec<String> {
        self.named_key(expr)
            .map(|key| self.index.method_names(key))
            .unwrap_or_default()
    }
}
