//! JSON statement documents.
//!
//! A document declares tables and, optionally, one statement over them:
//!
//! ```json
//! {
//!   "tables": [
//!     {"name": "users", "columns": [
//!       {"name": "id", "type": "INTEGER", "primary_key": true},
//!       {"name": "name", "type": "VARCHAR(40)", "nullable": false}
//!     ]}
//!   ],
//!   "statement": {"select": {
//!     "items": [{"column": "users.id"}, {"expr": {"column": "name"}, "label": "n"}],
//!     "where": {"binary": {"left": {"column": "users.id"}, "op": "=", "right": {"bind": {"name": "id"}}}}
//!   }},
//!   "where_overrides": [{"from": "users", "predicate": {"text": "users.id > 0"}}]
//! }
//! ```
//!
//! Columns are written `owner.column`; a bare `column` must be unambiguous
//! among the tables and aliases declared so far. Every `bind` object is a
//! distinct bind parameter.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use tracing::debug;

use crate::ast::{
    Binary, BindParam, ColumnSpec, ColumnValue, Compound, Delete, ExprTree, Insert, Node, NodeId,
    Select, SelectItem, SqlType, TextClause, Update, Value,
};
use crate::compiler::CompileOptions;
use crate::error::{SqlError, SqlResult};

#[derive(Debug, Clone, Deserialize)]
pub struct StatementDoc {
    #[serde(default)]
    pub tables: Vec<TableDoc>,
    #[serde(default)]
    pub statement: Option<StmtDoc>,
    #[serde(default)]
    pub where_overrides: Vec<OverrideDoc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableDoc {
    pub name: String,
    pub columns: Vec<ColumnDoc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub sql_type: String,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default = "nullable_default")]
    pub nullable: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub default: Option<Value>,
}

fn nullable_default() -> bool {
    true
}

impl From<ColumnDoc> for ColumnSpec {
    fn from(doc: ColumnDoc) -> Self {
        Self {
            name: doc.name,
            sql_type: SqlType::from_name(&doc.sql_type),
            primary_key: doc.primary_key,
            nullable: doc.nullable && !doc.primary_key,
            unique: doc.unique,
            default: doc.default,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StmtDoc {
    Select(SelectDoc),
    Insert(InsertDoc),
    Update(UpdateDoc),
    Delete(DeleteDoc),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SelectDoc {
    /// An empty item list selects `*`.
    pub items: Vec<ItemDoc>,
    pub from: Vec<FromDoc>,
    #[serde(rename = "where")]
    pub filter: Option<ExprDoc>,
    pub group_by: Vec<ExprDoc>,
    pub order_by: Vec<ExprDoc>,
    pub use_labels: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ItemDoc {
    Labeled { expr: ExprDoc, label: String },
    Plain(ExprDoc),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FromDoc {
    Table(String),
    Alias {
        source: Box<FromDoc>,
        name: String,
    },
    Join {
        left: Box<FromDoc>,
        right: Box<FromDoc>,
        on: ExprDoc,
        #[serde(default)]
        outer: bool,
    },
    Select(Box<SelectDoc>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExprDoc {
    Column(String),
    Bind(BindDoc),
    Text(String),
    Binary(Box<BinaryDoc>),
    And(Vec<ExprDoc>),
    Or(Vec<ExprDoc>),
    List(Vec<ExprDoc>),
    Compound(CompoundDoc),
    Select(Box<SelectDoc>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct BindDoc {
    pub name: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinaryDoc {
    pub left: ExprDoc,
    pub op: String,
    pub right: ExprDoc,
    #[serde(default)]
    pub parens: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompoundDoc {
    #[serde(default)]
    pub operator: Option<String>,
    pub clauses: Vec<ExprDoc>,
    #[serde(default)]
    pub parens: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InsertDoc {
    pub table: String,
    #[serde(default)]
    pub values: BTreeMap<String, ValueDoc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDoc {
    pub table: String,
    #[serde(default)]
    pub set: BTreeMap<String, ValueDoc>,
    #[serde(default, rename = "where")]
    pub filter: Option<ExprDoc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteDoc {
    pub table: String,
    #[serde(default, rename = "where")]
    pub filter: Option<ExprDoc>,
}

/// A column value: `{"bind": {...}}` or a plain literal.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ValueDoc {
    Bind { bind: BindDoc },
    Literal(Value),
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverrideDoc {
    /// Name of a table or alias.
    pub from: String,
    pub predicate: ExprDoc,
}

/// A document turned into an expression tree.
#[derive(Debug)]
pub struct Lowered {
    pub tree: ExprTree,
    pub root: Option<NodeId>,
    /// Declared tables, in document order.
    pub tables: Vec<NodeId>,
    pub options: CompileOptions,
}

impl StatementDoc {
    pub fn from_json(json: &str) -> SqlResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn lower(self) -> SqlResult<Lowered> {
        let mut lowerer = Lowerer::default();

        for table in self.tables {
            if lowerer.scope.contains_key(&table.name) {
                return Err(SqlError::Document(format!(
                    "table '{}' declared twice",
                    table.name
                )));
            }
            let specs: Vec<ColumnSpec> = table.columns.into_iter().map(Into::into).collect();
            let id = lowerer.tree.table(table.name.clone(), specs);
            lowerer.scope.insert(table.name, id);
            lowerer.tables.push(id);
        }

        let root = match self.statement {
            Some(stmt) => Some(lowerer.statement(stmt)?),
            None => None,
        };

        let mut options = CompileOptions::new();
        for o in self.where_overrides {
            let from = lowerer.named(&o.from)?;
            let predicate = lowerer.expr(o.predicate)?;
            options = options.where_override(from, predicate);
        }

        debug!(
            nodes = lowerer.tree.len(),
            tables = lowerer.tables.len(),
            "lowered statement document"
        );
        Ok(Lowered {
            tree: lowerer.tree,
            root,
            tables: lowerer.tables,
            options,
        })
    }
}

#[derive(Default)]
struct Lowerer {
    tree: ExprTree,
    /// Tables and aliases by name.
    scope: HashMap<String, NodeId>,
    tables: Vec<NodeId>,
}

impl Lowerer {
    fn named(&self, name: &str) -> SqlResult<NodeId> {
        self.scope
            .get(name)
            .copied()
            .ok_or_else(|| SqlError::Document(format!("unknown table or alias '{}'", name)))
    }

    fn table(&self, name: &str) -> SqlResult<NodeId> {
        let id = self.named(name)?;
        match self.tree.get(id) {
            Some(Node::Table(_)) => Ok(id),
            _ => Err(SqlError::Document(format!("'{}' is not a table", name))),
        }
    }

    fn column(&self, reference: &str) -> SqlResult<NodeId> {
        if let Some((owner, name)) = reference.split_once('.') {
            let owner = self.named(owner)?;
            return self
                .tree
                .column(owner, name)
                .ok_or_else(|| SqlError::Document(format!("unknown column '{}'", reference)));
        }

        let mut found = self
            .scope
            .values()
            .filter_map(|owner| self.tree.column(*owner, reference));
        match (found.next(), found.next()) {
            (Some(id), None) => Ok(id),
            (None, _) => Err(SqlError::Document(format!("unknown column '{}'", reference))),
            (Some(_), Some(_)) => Err(SqlError::Document(format!(
                "column '{}' is ambiguous",
                reference
            ))),
        }
    }

    fn statement(&mut self, stmt: StmtDoc) -> SqlResult<NodeId> {
        match stmt {
            StmtDoc::Select(select) => self.select(select),
            StmtDoc::Insert(doc) => {
                let table = self.table(&doc.table)?;
                let mut insert = Insert::new(table);
                for (name, value) in doc.values {
                    let column = self.table_column(table, &doc.table, &name)?;
                    insert.values.push((column, self.column_value(value)));
                }
                Ok(self.tree.insert(insert))
            }
            StmtDoc::Update(doc) => {
                let table = self.table(&doc.table)?;
                let mut update = Update::new(table);
                for (name, value) in doc.set {
                    let column = self.table_column(table, &doc.table, &name)?;
                    update.values.push((column, self.column_value(value)));
                }
                if let Some(filter) = doc.filter {
                    update = update.filter(self.expr(filter)?);
                }
                Ok(self.tree.update(update))
            }
            StmtDoc::Delete(doc) => {
                let table = self.table(&doc.table)?;
                let mut delete = Delete::new(table);
                if let Some(filter) = doc.filter {
                    delete = delete.filter(self.expr(filter)?);
                }
                Ok(self.tree.delete(delete))
            }
        }
    }

    fn table_column(&self, table: NodeId, table_name: &str, name: &str) -> SqlResult<NodeId> {
        self.tree.column(table, name).ok_or_else(|| {
            SqlError::Document(format!("table '{}' has no column '{}'", table_name, name))
        })
    }

    fn column_value(&mut self, value: ValueDoc) -> ColumnValue {
        match value {
            ValueDoc::Bind { bind } => ColumnValue::Param(self.bind(bind)),
            ValueDoc::Literal(v) => ColumnValue::Literal(v),
        }
    }

    fn bind(&mut self, doc: BindDoc) -> NodeId {
        self.tree.bind_param(BindParam {
            shortname: doc.name,
            key: doc.key,
            value: doc.value,
        })
    }

    fn select(&mut self, doc: SelectDoc) -> SqlResult<NodeId> {
        // FROM first so items can refer to aliases declared there.
        let mut froms = Vec::with_capacity(doc.from.len());
        for from in doc.from {
            froms.push(self.from(from)?);
        }

        let mut items = Vec::with_capacity(doc.items.len());
        for item in doc.items {
            items.push(match item {
                ItemDoc::Labeled { expr, label } => SelectItem::labeled(self.expr(expr)?, label),
                ItemDoc::Plain(expr) => SelectItem::from(self.expr(expr)?),
            });
        }

        let mut select = Select {
            items,
            froms,
            use_labels: doc.use_labels,
            ..Select::default()
        };
        if let Some(filter) = doc.filter {
            select.filter = Some(self.expr(filter)?);
        }
        if !doc.group_by.is_empty() {
            let list = self.list(doc.group_by)?;
            select = select.group_by(list);
        }
        if !doc.order_by.is_empty() {
            let list = self.list(doc.order_by)?;
            select = select.order_by(list);
        }
        Ok(self.tree.select(select))
    }

    fn from(&mut self, doc: FromDoc) -> SqlResult<NodeId> {
        match doc {
            FromDoc::Table(name) => self.named(&name),
            FromDoc::Alias { source, name } => {
                let source = self.from(*source)?;
                let alias = self.tree.alias(source, name.clone());
                self.scope.insert(name, alias);
                Ok(alias)
            }
            FromDoc::Join {
                left,
                right,
                on,
                outer,
            } => {
                let left = self.from(*left)?;
                let right = self.from(*right)?;
                let on = self.expr(on)?;
                Ok(if outer {
                    self.tree.outer_join(left, right, on)
                } else {
                    self.tree.join(left, right, on)
                })
            }
            FromDoc::Select(select) => self.select(*select),
        }
    }

    fn list(&mut self, exprs: Vec<ExprDoc>) -> SqlResult<NodeId> {
        let clauses = self.exprs(exprs)?;
        Ok(self.tree.list(clauses))
    }

    fn exprs(&mut self, exprs: Vec<ExprDoc>) -> SqlResult<Vec<NodeId>> {
        exprs.into_iter().map(|e| self.expr(e)).collect()
    }

    fn expr(&mut self, doc: ExprDoc) -> SqlResult<NodeId> {
        match doc {
            ExprDoc::Column(reference) => self.column(&reference),
            ExprDoc::Bind(bind) => Ok(self.bind(bind)),
            ExprDoc::Text(text) => Ok(self.tree.push(Node::Text(TextClause {
                text,
                parens: false,
            }))),
            ExprDoc::Binary(binary) => {
                let BinaryDoc {
                    left,
                    op,
                    right,
                    parens,
                } = *binary;
                let left = self.expr(left)?;
                let right = self.expr(right)?;
                Ok(self.tree.push(Node::Binary(Binary {
                    left,
                    operator: op,
                    right,
                    parens,
                })))
            }
            ExprDoc::And(clauses) => {
                let clauses = self.exprs(clauses)?;
                Ok(self.tree.and(clauses))
            }
            ExprDoc::Or(clauses) => {
                let clauses = self.exprs(clauses)?;
                Ok(self.tree.or(clauses))
            }
            ExprDoc::List(clauses) => self.list(clauses),
            ExprDoc::Compound(compound) => {
                let clauses = self.exprs(compound.clauses)?;
                Ok(self.tree.push(Node::Compound(Compound {
                    operator: compound.operator,
                    clauses,
                    parens: compound.parens,
                })))
            }
            ExprDoc::Select(select) => self.select(*select),
        }
    }
}
