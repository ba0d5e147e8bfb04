//! Node kinds of the expression tree.

use super::schema::ColumnSpec;
use super::values::Value;

/// Handle to a node in an [`ExprTree`](super::ExprTree).
///
/// Identity, not structure: two structurally equal nodes with different
/// handles are different nodes to the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One node of the relational expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Table(Table),
    Column(Column),
    Alias(Alias),
    Join(Join),
    BindParam(BindParam),
    Compound(Compound),
    ClauseList(ClauseList),
    Binary(Binary),
    Text(TextClause),
    Select(Select),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
}

impl Node {
    /// Human readable kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Table(_) => "table",
            Node::Column(_) => "column",
            Node::Alias(_) => "alias",
            Node::Join(_) => "join",
            Node::BindParam(_) => "bind parameter",
            Node::Compound(_) => "compound",
            Node::ClauseList(_) => "clause list",
            Node::Binary(_) => "binary",
            Node::Text(_) => "text clause",
            Node::Select(_) => "select",
            Node::Insert(_) => "insert",
            Node::Update(_) => "update",
            Node::Delete(_) => "delete",
        }
    }

    /// Whether the node can appear in a FROM list.
    pub fn is_from_capable(&self) -> bool {
        matches!(
            self,
            Node::Table(_) | Node::Alias(_) | Node::Join(_) | Node::Select(_)
        )
    }

    /// Whether the node is a complete statement.
    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            Node::Select(_) | Node::Insert(_) | Node::Update(_) | Node::Delete(_)
        )
    }
}

/// A table. Tables without a name are anonymous (derived) and contribute no FROM text.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: Option<String>,
    pub columns: Vec<NodeId>,
}

/// A column owned by a table, an alias, or another from-capable node.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub owner: NodeId,
    pub spec: ColumnSpec,
}

impl Column {
    pub fn name(&self) -> &str {
        &self.spec.name
    }
}

/// `<source> <name>`; owns proxy columns for each column of the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Alias {
    pub source: NodeId,
    pub name: String,
    pub columns: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub left: NodeId,
    pub right: NodeId,
    pub on: NodeId,
    pub outer: bool,
}

/// A named placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct BindParam {
    pub shortname: String,
    /// Requested placeholder name; defaults to the shortname.
    pub key: Option<String>,
    pub value: Option<Value>,
}

impl BindParam {
    pub fn new(shortname: impl Into<String>) -> Self {
        Self {
            shortname: shortname.into(),
            key: None,
            value: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn declared_key(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.shortname)
    }
}

/// N-ary group such as `a AND b AND c`, or space-joined when there is no operator.
#[derive(Debug, Clone, PartialEq)]
pub struct Compound {
    pub operator: Option<String>,
    pub clauses: Vec<NodeId>,
    pub parens: bool,
}

/// Comma-joined group, e.g. an ORDER BY list.
#[derive(Debug, Clone, PartialEq)]
pub struct ClauseList {
    pub clauses: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binary {
    pub left: NodeId,
    pub operator: String,
    pub right: NodeId,
    pub parens: bool,
}

/// Literal SQL fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct TextClause {
    pub text: String,
    pub parens: bool,
}

/// A selected item. Items with a label render as `<expr> AS <label>`.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub node: NodeId,
    pub label: Option<String>,
}

impl SelectItem {
    pub fn labeled(node: NodeId, label: impl Into<String>) -> Self {
        Self {
            node,
            label: Some(label.into()),
        }
    }
}

impl From<NodeId> for SelectItem {
    fn from(node: NodeId) -> Self {
        Self { node, label: None }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Select {
    pub items: Vec<SelectItem>,
    /// FROM elements. Derived from the selected columns when left empty.
    pub froms: Vec<NodeId>,
    pub filter: Option<NodeId>,
    /// Trailing `(keyword, clause)` pairs such as `("ORDER BY", list)`.
    pub clauses: Vec<(String, NodeId)>,
    pub use_labels: bool,
}

impl Select {
    pub fn new<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<SelectItem>,
    {
        Self {
            items: items.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn from(mut self, from: NodeId) -> Self {
        self.froms.push(from);
        self
    }

    pub fn filter(mut self, predicate: NodeId) -> Self {
        self.filter = Some(predicate);
        self
    }

    pub fn clause(mut self, keyword: impl Into<String>, clause: NodeId) -> Self {
        self.clauses.push((keyword.into(), clause));
        self
    }

    pub fn group_by(self, clause: NodeId) -> Self {
        self.clause("GROUP BY", clause)
    }

    pub fn order_by(self, clause: NodeId) -> Self {
        self.clause("ORDER BY", clause)
    }

    pub fn use_labels(mut self) -> Self {
        self.use_labels = true;
        self
    }
}

/// The value assigned to a column by an INSERT or UPDATE.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    /// Bound through a bind parameter synthesized for the column.
    Literal(Value),
    /// Bound through an existing `BindParam` node.
    Param(NodeId),
}

impl From<Value> for ColumnValue {
    fn from(v: Value) -> Self {
        ColumnValue::Literal(v)
    }
}

macro_rules! literal_column_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ColumnValue {
                fn from(v: $ty) -> Self {
                    ColumnValue::Literal(Value::from(v))
                }
            }
        )*
    };
}

literal_column_value!(bool, i32, i64, f64, &str, String);

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: NodeId,
    pub values: Vec<(NodeId, ColumnValue)>,
}

impl Insert {
    pub fn new(table: NodeId) -> Self {
        Self {
            table,
            values: Vec::new(),
        }
    }

    pub fn value(mut self, column: NodeId, value: impl Into<ColumnValue>) -> Self {
        self.values.push((column, value.into()));
        self
    }

    pub fn param(mut self, column: NodeId, bind: NodeId) -> Self {
        self.values.push((column, ColumnValue::Param(bind)));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: NodeId,
    pub values: Vec<(NodeId, ColumnValue)>,
    pub filter: Option<NodeId>,
}

impl Update {
    pub fn new(table: NodeId) -> Self {
        Self {
            table,
            values: Vec::new(),
            filter: None,
        }
    }

    pub fn set(mut self, column: NodeId, value: impl Into<ColumnValue>) -> Self {
        self.values.push((column, value.into()));
        self
    }

    pub fn set_param(mut self, column: NodeId, bind: NodeId) -> Self {
        self.values.push((column, ColumnValue::Param(bind)));
        self
    }

    pub fn filter(mut self, predicate: NodeId) -> Self {
        self.filter = Some(predicate);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: NodeId,
    pub filter: Option<NodeId>,
}

impl Delete {
    pub fn new(table: NodeId) -> Self {
        Self {
            table,
            filter: None,
        }
    }

    pub fn filter(mut self, predicate: NodeId) -> Self {
        self.filter = Some(predicate);
        self
    }
}
