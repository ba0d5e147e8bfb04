//! Arena storage for expression nodes.

use std::collections::{HashMap, HashSet};

use super::node::*;
use super::schema::{ColumnSpec, SqlType};
use crate::compiler::binds::unique_name;
use crate::error::{SqlError, SqlResult};

/// Names a SELECT exports, claimed with the same suffix rule the compiler
/// applies to labels.
#[derive(Default)]
struct ExportedNames {
    taken: HashSet<String>,
    by_column: HashMap<NodeId, String>,
}

impl ExportedNames {
    fn claim(&mut self, base: &str) -> String {
        let name = unique_name(base, |n| self.taken.contains(n));
        self.taken.insert(name.clone());
        name
    }
}

/// Append-only arena of expression nodes.
///
/// Nodes are never mutated after they are pushed, so a tree can be shared
/// read-only between any number of concurrent compilations.
#[derive(Debug, Clone, Default)]
pub struct ExprTree {
    nodes: Vec<Node>,
}

impl ExprTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Look up a node, failing for handles that do not belong to this arena.
    pub fn node(&self, id: NodeId) -> SqlResult<&Node> {
        self.get(id)
            .ok_or_else(|| SqlError::unresolved(id.0, "handle outside the expression tree"))
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Append a raw node.
    pub fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Add a named table together with its columns.
    pub fn table<I>(&mut self, name: impl Into<String>, columns: I) -> NodeId
    where
        I: IntoIterator<Item = ColumnSpec>,
    {
        self.add_table(Some(name.into()), columns)
    }

    /// Add a table without a name. Its columns render bare.
    pub fn anonymous_table<I>(&mut self, columns: I) -> NodeId
    where
        I: IntoIterator<Item = ColumnSpec>,
    {
        self.add_table(None, columns)
    }

    fn add_table<I>(&mut self, name: Option<String>, columns: I) -> NodeId
    where
        I: IntoIterator<Item = ColumnSpec>,
    {
        let table = self.push(Node::Table(Table {
            name,
            columns: Vec::new(),
        }));
        let ids = self.add_columns(table, columns);
        if let Some(Node::Table(t)) = self.nodes.get_mut(table.0) {
            t.columns = ids;
        }
        table
    }

    fn add_columns<I>(&mut self, owner: NodeId, columns: I) -> Vec<NodeId>
    where
        I: IntoIterator<Item = ColumnSpec>,
    {
        columns
            .into_iter()
            .map(|spec| self.push(Node::Column(Column { owner, spec })))
            .collect()
    }

    /// Columns of a table or alias, in declaration order.
    pub fn columns_of(&self, owner: NodeId) -> &[NodeId] {
        match self.get(owner) {
            Some(Node::Table(t)) => &t.columns,
            Some(Node::Alias(a)) => &a.columns,
            _ => &[],
        }
    }

    /// Find a column of a table or alias by name.
    pub fn column(&self, owner: NodeId, name: &str) -> Option<NodeId> {
        self.columns_of(owner)
            .iter()
            .copied()
            .find(|id| matches!(self.get(*id), Some(Node::Column(c)) if c.name() == name))
    }

    /// The name a column's owner contributes to `owner.column`, if any.
    pub fn owner_name(&self, owner: NodeId) -> Option<&str> {
        match self.get(owner) {
            Some(Node::Table(t)) => t.name.as_deref(),
            Some(Node::Alias(a)) => Some(&a.name),
            _ => None,
        }
    }

    /// Alias a from-capable node. The alias gets proxy columns for every
    /// column the source exports.
    pub fn alias(&mut self, source: NodeId, name: impl Into<String>) -> NodeId {
        let exported = self.exported_columns(source);
        let alias = self.push(Node::Alias(Alias {
            source,
            name: name.into(),
            columns: Vec::new(),
        }));
        let ids = self.add_columns(alias, exported);
        if let Some(Node::Alias(a)) = self.nodes.get_mut(alias.0) {
            a.columns = ids;
        }
        alias
    }

    fn exported_columns(&self, source: NodeId) -> Vec<ColumnSpec> {
        match self.get(source) {
            Some(Node::Table(_)) | Some(Node::Alias(_)) => self
                .columns_of(source)
                .iter()
                .filter_map(|id| self.column_spec(*id).cloned())
                .collect(),
            Some(Node::Join(j)) => {
                let mut specs = self.exported_columns(j.left);
                specs.extend(self.exported_columns(j.right));
                specs
            }
            Some(Node::Select(s)) => {
                let mut names = ExportedNames::default();
                let mut specs = Vec::new();
                for item in &s.items {
                    match (&item.label, self.get(item.node)) {
                        (Some(label), node) => {
                            let mut spec = match node {
                                Some(Node::Column(c)) => c.spec.clone(),
                                _ => ColumnSpec::new(label.clone(), SqlType::Text),
                            };
                            spec.name = names.claim(label);
                            specs.push(spec);
                        }
                        (None, Some(Node::Table(_))) | (None, Some(Node::Alias(_))) => {
                            for id in self.columns_of(item.node) {
                                if let Some(spec) = self.selected_spec(*id, s.use_labels, &mut names) {
                                    specs.push(spec);
                                }
                            }
                        }
                        (None, Some(Node::Column(_))) => {
                            if let Some(spec) = self.selected_spec(item.node, s.use_labels, &mut names) {
                                specs.push(spec);
                            }
                        }
                        _ => {}
                    }
                }
                specs
            }
            _ => Vec::new(),
        }
    }

    fn column_spec(&self, id: NodeId) -> Option<&ColumnSpec> {
        match self.get(id) {
            Some(Node::Column(c)) => Some(&c.spec),
            _ => None,
        }
    }

    fn selected_spec(
        &self,
        column: NodeId,
        use_labels: bool,
        names: &mut ExportedNames,
    ) -> Option<ColumnSpec> {
        let Some(Node::Column(c)) = self.get(column) else {
            return None;
        };
        let mut spec = c.spec.clone();
        if use_labels {
            spec.name = match names.by_column.get(&column) {
                Some(label) => label.clone(),
                None => {
                    let base = match self.owner_name(c.owner) {
                        Some(owner) => format!("{}_{}", owner, c.name()),
                        None => c.name().to_string(),
                    };
                    let label = names.claim(&base);
                    names.by_column.insert(column, label.clone());
                    label
                }
            };
        }
        Some(spec)
    }

    pub fn join(&mut self, left: NodeId, right: NodeId, on: NodeId) -> NodeId {
        self.push(Node::Join(Join {
            left,
            right,
            on,
            outer: false,
        }))
    }

    pub fn outer_join(&mut self, left: NodeId, right: NodeId, on: NodeId) -> NodeId {
        self.push(Node::Join(Join {
            left,
            right,
            on,
            outer: true,
        }))
    }

    /// A bind parameter with no default value.
    pub fn bind(&mut self, shortname: impl Into<String>) -> NodeId {
        self.bind_param(BindParam::new(shortname))
    }

    pub fn bind_param(&mut self, param: BindParam) -> NodeId {
        self.push(Node::BindParam(param))
    }

    pub fn text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(Node::Text(TextClause {
            text: text.into(),
            parens: false,
        }))
    }

    pub fn binary(&mut self, left: NodeId, operator: impl Into<String>, right: NodeId) -> NodeId {
        self.push(Node::Binary(Binary {
            left,
            operator: operator.into(),
            right,
            parens: false,
        }))
    }

    pub fn eq(&mut self, left: NodeId, right: NodeId) -> NodeId {
        self.binary(left, "=", right)
    }

    pub fn compound<I>(&mut self, operator: Option<&str>, clauses: I, parens: bool) -> NodeId
    where
        I: IntoIterator<Item = NodeId>,
    {
        self.push(Node::Compound(Compound {
            operator: operator.map(str::to_string),
            clauses: clauses.into_iter().collect(),
            parens,
        }))
    }

    pub fn and<I: IntoIterator<Item = NodeId>>(&mut self, clauses: I) -> NodeId {
        self.compound(Some("AND"), clauses, false)
    }

    /// OR groups are parenthesized so they survive conjunction.
    pub fn or<I: IntoIterator<Item = NodeId>>(&mut self, clauses: I) -> NodeId {
        self.compound(Some("OR"), clauses, true)
    }

    pub fn list<I: IntoIterator<Item = NodeId>>(&mut self, clauses: I) -> NodeId {
        self.push(Node::ClauseList(ClauseList {
            clauses: clauses.into_iter().collect(),
        }))
    }

    /// Add a SELECT. An empty FROM list is derived from the tables and
    /// aliases its items and filter refer to.
    pub fn select(&mut self, mut select: Select) -> NodeId {
        if select.froms.is_empty() {
            let mut froms = Vec::new();
            let mut seen = HashSet::new();
            for item in &select.items {
                self.collect_froms(item.node, &mut froms, &mut seen);
            }
            if let Some(filter) = select.filter {
                self.collect_froms(filter, &mut froms, &mut seen);
            }
            select.froms = froms;
        }
        self.push(Node::Select(select))
    }

    fn collect_froms(&self, id: NodeId, froms: &mut Vec<NodeId>, seen: &mut HashSet<NodeId>) {
        if !seen.insert(id) {
            return;
        }
        match self.get(id) {
            Some(Node::Column(c)) => {
                let from_capable = self.get(c.owner).is_some_and(Node::is_from_capable);
                if from_capable && !froms.contains(&c.owner) {
                    froms.push(c.owner);
                }
            }
            Some(Node::Table(_)) | Some(Node::Alias(_)) => {
                if !froms.contains(&id) {
                    froms.push(id);
                }
            }
            Some(Node::Binary(b)) => {
                self.collect_froms(b.left, froms, seen);
                self.collect_froms(b.right, froms, seen);
            }
            Some(Node::Compound(c)) => {
                for clause in &c.clauses {
                    self.collect_froms(*clause, froms, seen);
                }
            }
            Some(Node::ClauseList(l)) => {
                for clause in &l.clauses {
                    self.collect_froms(*clause, froms, seen);
                }
            }
            _ => {}
        }
    }

    pub fn insert(&mut self, insert: Insert) -> NodeId {
        self.push(Node::Insert(insert))
    }

    pub fn update(&mut self, update: Update) -> NodeId {
        self.push(Node::Update(update))
    }

    pub fn delete(&mut self, delete: Delete) -> NodeId {
        self.push(Node::Delete(delete))
    }
}
