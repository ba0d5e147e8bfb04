//! Statement compiler.
//!
//! Walks an [`ExprTree`] bottom-up and renders a statement into SQL text.
//! Children are rendered on demand the first time a parent needs them and
//! memoized by [`NodeId`], so a node shared between several parents is
//! rendered exactly once per compilation. Bind parameters are registered
//! as they are rendered.
//!
//! A [`Compiler`] lives for exactly one compilation; `compile` consumes it.

pub mod binds;
pub mod dialect;
pub mod params;

mod dml;
mod select;

#[cfg(test)]
mod tests;

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::ast::{ExprTree, Node, NodeId, Value};
use crate::error::{SqlError, SqlResult};

pub use binds::{BindOrigin, BindRegistry, BoundParam};
pub use dialect::{AnsiGenerator, Dialect, SqlDialect};
pub use params::{MissingPolicy, ResolvedParams};

/// Per-compilation settings.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Render `fullname AS label` for every selected column.
    pub use_labels: bool,
    /// Extra predicate a FROM element contributes to its enclosing SELECT.
    pub where_overrides: HashMap<NodeId, NodeId>,
    /// Compile-time parameter values, by shortname or column name.
    pub params: HashMap<String, Value>,
    pub dialect: Dialect,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_labels(mut self) -> Self {
        self.use_labels = true;
        self
    }

    pub fn where_override(mut self, from: NodeId, predicate: NodeId) -> Self {
        self.where_overrides.insert(from, predicate);
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }
}

/// How often each node's rendering rule ran during one compilation.
#[derive(Debug, Clone, Default)]
pub struct RenderStats {
    counts: HashMap<NodeId, u32>,
}

impl RenderStats {
    pub fn renders_of(&self, id: NodeId) -> u32 {
        self.counts.get(&id).copied().unwrap_or(0)
    }

    /// Number of distinct nodes rendered.
    pub fn rendered_nodes(&self) -> usize {
        self.counts.len()
    }
}

/// The result of one compilation.
#[derive(Debug, Clone)]
pub struct Compiled {
    text: String,
    from_text: Option<String>,
    binds: BindRegistry,
    stats: RenderStats,
}

impl Compiled {
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Parenthesized text for nesting a SELECT as a subquery.
    pub fn from_text(&self) -> Option<&str> {
        self.from_text.as_deref()
    }

    pub fn binds(&self) -> &BindRegistry {
        &self.binds
    }

    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    /// Resolve final bind values. Parameters with no value fail with `MissingBindValue`.
    pub fn resolve<I, K, V>(&self, overrides: I) -> SqlResult<ResolvedParams>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        params::resolve(&self.binds, overrides, MissingPolicy::Error)
    }

    pub fn resolve_with<I, K, V>(&self, overrides: I, policy: MissingPolicy) -> SqlResult<ResolvedParams>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        params::resolve(&self.binds, overrides, policy)
    }
}

impl std::fmt::Display for Compiled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum SlotState {
    #[default]
    Pending,
    Rendering,
    Done,
}

/// Render cache entry for one arena slot.
#[derive(Debug, Default)]
struct Slot {
    state: SlotState,
    value: Option<String>,
    from: Option<String>,
}

struct Rendered {
    value: Option<String>,
    from: Option<String>,
}

impl Rendered {
    fn value(text: String) -> Self {
        Self {
            value: Some(text),
            from: None,
        }
    }

    fn source(from: Option<String>) -> Self {
        Self { value: None, from }
    }
}

fn wrap(text: String, parens: bool) -> String {
    if parens { format!("({})", text) } else { text }
}

pub struct Compiler<'t> {
    tree: &'t ExprTree,
    options: CompileOptions,
    generator: Box<dyn SqlDialect>,
    slots: Vec<Slot>,
    binds: BindRegistry,
    stats: RenderStats,
    /// Output column names of each rendered SELECT.
    exports: HashMap<NodeId, Vec<String>>,
}

impl<'t> Compiler<'t> {
    pub fn new(tree: &'t ExprTree, options: CompileOptions) -> Self {
        let generator = options.dialect.generator();
        let mut slots = Vec::with_capacity(tree.len());
        slots.resize_with(tree.len(), Slot::default);
        Self {
            tree,
            options,
            generator,
            slots,
            binds: BindRegistry::new(),
            stats: RenderStats::default(),
            exports: HashMap::new(),
        }
    }

    /// Compile a SELECT, INSERT, UPDATE or DELETE node.
    pub fn compile(mut self, root: NodeId) -> SqlResult<Compiled> {
        let node = self.tree.node(root)?;
        if !node.is_statement() {
            return Err(SqlError::unsupported(node.kind(), "a statement"));
        }
        debug!(root = %root, kind = node.kind(), dialect = self.generator.name(), "compiling statement");

        let text = self.value_text(root)?;
        let from_text = self.slots[root.0].from.take();

        debug!(
            binds = self.binds.len(),
            nodes = self.stats.rendered_nodes(),
            "compiled statement"
        );
        Ok(Compiled {
            text,
            from_text,
            binds: self.binds,
            stats: self.stats,
        })
    }

    /// Render `id` unless it is already cached.
    fn ensure(&mut self, id: NodeId) -> SqlResult<()> {
        let tree = self.tree;
        let node = tree.node(id)?;
        match self.slots[id.0].state {
            SlotState::Done => return Ok(()),
            SlotState::Rendering => return Err(SqlError::unresolved(id.0, "cyclic reference")),
            SlotState::Pending => {}
        }

        self.slots[id.0].state = SlotState::Rendering;
        trace!(node = %id, kind = node.kind(), "rendering node");
        let rendered = self.render(id, node)?;
        *self.stats.counts.entry(id).or_insert(0) += 1;

        let slot = &mut self.slots[id.0];
        slot.value = rendered.value;
        slot.from = rendered.from;
        slot.state = SlotState::Done;
        Ok(())
    }

    /// Text of `id` used as an operand.
    fn value_text(&mut self, id: NodeId) -> SqlResult<String> {
        self.ensure(id)?;
        match &self.slots[id.0].value {
            Some(text) => Ok(text.clone()),
            None => Err(SqlError::unsupported(
                self.tree.node(id)?.kind(),
                "a value expression",
            )),
        }
    }

    /// Text of `id` used as a FROM source. `None` for anonymous tables.
    fn from_text(&mut self, id: NodeId) -> SqlResult<Option<String>> {
        let node = self.tree.node(id)?;
        if !node.is_from_capable() {
            return Err(SqlError::unsupported(node.kind(), "a FROM source"));
        }
        self.ensure(id)?;
        Ok(self.slots[id.0].from.clone())
    }

    /// The name a column is selected under. A proxy column of an alias takes
    /// the name its source exports in this compilation, which for a SELECT
    /// depends on the labels assigned to it.
    fn column_name(&mut self, id: NodeId) -> SqlResult<String> {
        let tree = self.tree;
        let column = match tree.node(id)? {
            Node::Column(c) => c,
            other => return Err(SqlError::unsupported(other.kind(), "a column")),
        };
        if let Some(Node::Alias(a)) = tree.get(column.owner) {
            if let Some(pos) = a.columns.iter().position(|c| *c == id) {
                if let Some(name) = self.output_names(a.source)?.into_iter().nth(pos) {
                    return Ok(name);
                }
            }
        }
        Ok(column.name().to_string())
    }

    /// Column names a FROM source exposes, in proxy column order.
    fn output_names(&mut self, source: NodeId) -> SqlResult<Vec<String>> {
        let tree = self.tree;
        match tree.node(source)? {
            Node::Select(_) => {
                self.ensure(source)?;
                Ok(self.exports.get(&source).cloned().unwrap_or_default())
            }
            Node::Join(j) => {
                let mut names = self.output_names(j.left)?;
                names.extend(self.output_names(j.right)?);
                Ok(names)
            }
            Node::Table(_) | Node::Alias(_) => tree
                .columns_of(source)
                .iter()
                .map(|c| self.column_name(*c))
                .collect(),
            _ => Ok(Vec::new()),
        }
    }

    /// A join side must render as a FROM source; anonymous tables do not.
    fn join_side(&mut self, id: NodeId) -> SqlResult<String> {
        self.from_text(id)?
            .ok_or_else(|| SqlError::unsupported("anonymous table", "a join side"))
    }

    fn value_texts(&mut self, ids: &[NodeId]) -> SqlResult<Vec<String>> {
        ids.iter().map(|id| self.value_text(*id)).collect()
    }

    fn render(&mut self, id: NodeId, node: &'t Node) -> SqlResult<Rendered> {
        match node {
            Node::Table(t) => Ok(Rendered::source(t.name.clone())),
            Node::Column(c) => {
                let name = self.column_name(id)?;
                let text = match self.tree.owner_name(c.owner) {
                    Some(owner) => format!("{}.{}", owner, name),
                    None => name,
                };
                Ok(Rendered::value(text))
            }
            Node::Alias(a) => {
                let text = match self.from_text(a.source)? {
                    Some(source) => format!("{} {}", source, a.name),
                    None => a.name.clone(),
                };
                Ok(Rendered::source(Some(text)))
            }
            Node::Join(j) => {
                let left = self.join_side(j.left)?;
                let right = self.join_side(j.right)?;
                let on = self.value_text(j.on)?;
                let text = format!(
                    "({} {} {} ON {})",
                    left,
                    self.generator.join_keyword(j.outer),
                    right,
                    on
                );
                Ok(Rendered::source(Some(text)))
            }
            Node::BindParam(b) => {
                let value = self
                    .options
                    .params
                    .get(&b.shortname)
                    .cloned()
                    .or_else(|| b.value.clone());
                let key = self.binds.register(
                    BindOrigin::Node(id),
                    &b.shortname,
                    b.declared_key(),
                    value,
                );
                Ok(Rendered::value(self.generator.placeholder(&key)))
            }
            Node::Compound(c) => {
                let parts: Vec<String> = self
                    .value_texts(&c.clauses)?
                    .into_iter()
                    .filter(|p| !p.is_empty())
                    .collect();
                if parts.is_empty() {
                    return Ok(Rendered::value(String::new()));
                }
                let sep = match &c.operator {
                    Some(op) => format!(" {} ", op),
                    None => " ".to_string(),
                };
                Ok(Rendered::value(wrap(parts.join(&sep), c.parens)))
            }
            Node::ClauseList(l) => Ok(Rendered::value(self.value_texts(&l.clauses)?.join(", "))),
            Node::Binary(b) => {
                let left = self.value_text(b.left)?;
                let right = self.value_text(b.right)?;
                let text = format!("{} {} {}", left, b.operator, right);
                Ok(Rendered::value(wrap(text, b.parens)))
            }
            Node::Text(t) => Ok(Rendered::value(wrap(
                t.text.clone(),
                t.parens && !t.text.is_empty(),
            ))),
            Node::Select(s) => {
                let text = self.render_select(id, s)?;
                Ok(Rendered {
                    from: Some(format!("({})", text)),
                    value: Some(text),
                })
            }
            Node::Insert(i) => self.render_insert(i).map(Rendered::value),
            Node::Update(u) => self.render_update(u).map(Rendered::value),
            Node::Delete(d) => self.render_delete(d).map(Rendered::value),
        }
    }

    /// ` WHERE <text>`, or nothing when the predicate is absent or renders empty.
    fn where_suffix(&mut self, filter: Option<NodeId>) -> SqlResult<String> {
        let Some(filter) = filter else {
            return Ok(String::new());
        };
        let text = self.value_text(filter)?;
        if text.is_empty() {
            Ok(String::new())
        } else {
            Ok(format!(" WHERE {}", text))
        }
    }
}

/// Compile a statement with default options.
pub fn compile(tree: &ExprTree, root: NodeId) -> SqlResult<Compiled> {
    Compiler::new(tree, CompileOptions::default()).compile(root)
}

/// Compile a statement with explicit options.
pub fn compile_with(tree: &ExprTree, root: NodeId, options: CompileOptions) -> SqlResult<Compiled> {
    Compiler::new(tree, options).compile(root)
}
