//! Bind parameter registry.
//!
//! Every bind parameter rendered in one statement gets a placeholder key
//! that is unique within that statement. Keys are claimed in traversal
//! order, so recompiling the same tree always yields the same keys.

use std::collections::HashMap;

use crate::ast::{NodeId, Value};

/// Identity of a registered parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindOrigin {
    /// A `BindParam` node of the expression tree.
    Node(NodeId),
    /// Synthesized by an INSERT/UPDATE for the given column.
    Column(NodeId),
}

/// A bind parameter after registration.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParam {
    pub origin: BindOrigin,
    pub shortname: String,
    /// Unique placeholder key.
    pub key: String,
    /// Default value applied when no override is supplied.
    pub value: Option<Value>,
}

/// Registry of bind parameters, indexed by unique key and by shortname.
#[derive(Debug, Clone, Default)]
pub struct BindRegistry {
    params: Vec<BoundParam>,
    by_origin: HashMap<BindOrigin, usize>,
    by_key: HashMap<String, usize>,
    by_name: HashMap<String, Vec<usize>>,
}

impl BindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parameter and return its unique key.
    ///
    /// Registering the same origin again returns the key it already holds.
    pub fn register(
        &mut self,
        origin: BindOrigin,
        shortname: &str,
        declared_key: &str,
        value: Option<Value>,
    ) -> String {
        if let Some(&idx) = self.by_origin.get(&origin) {
            return self.params[idx].key.clone();
        }

        let key = unique_name(declared_key, |k| self.by_key.contains_key(k));
        tracing::trace!(shortname, key = %key, "claimed bind key");

        let idx = self.params.len();
        self.params.push(BoundParam {
            origin,
            shortname: shortname.to_string(),
            key: key.clone(),
            value,
        });
        self.by_origin.insert(origin, idx);
        self.by_key.insert(key.clone(), idx);
        self.index_name(shortname, idx);
        key
    }

    /// Also index an already registered parameter under `name`, e.g. the
    /// column an INSERT binds it to.
    pub fn alias_name(&mut self, origin: BindOrigin, name: &str) {
        if let Some(&idx) = self.by_origin.get(&origin) {
            self.index_name(name, idx);
        }
    }

    fn index_name(&mut self, name: &str, idx: usize) {
        let slots = self.by_name.entry(name.to_string()).or_default();
        if !slots.contains(&idx) {
            slots.push(idx);
        }
    }

    pub fn key_of(&self, origin: BindOrigin) -> Option<&str> {
        self.by_origin
            .get(&origin)
            .map(|&idx| self.params[idx].key.as_str())
    }

    /// Look up a parameter by its unique key.
    pub fn get(&self, key: &str) -> Option<&BoundParam> {
        self.by_key.get(key).map(|&idx| &self.params[idx])
    }

    /// All parameters registered under a shortname (or column alias).
    pub fn by_shortname(&self, name: &str) -> impl Iterator<Item = &BoundParam> {
        self.by_name
            .get(name)
            .into_iter()
            .flatten()
            .map(|&idx| &self.params[idx])
    }

    pub(crate) fn positions_for_name(&self, name: &str) -> &[usize] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn position_of_key(&self, key: &str) -> Option<usize> {
        self.by_key.get(key).copied()
    }

    /// Parameters in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &BoundParam> {
        self.params.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|p| p.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Claim `base`, or `base_1`, `base_2`, ... whichever is free first.
pub(crate) fn unique_name(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    let mut n = 1;
    loop {
        let candidate = format!("{}_{}", base, n);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
