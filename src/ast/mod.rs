//! The relational expression tree consumed by the compiler.

pub mod node;
pub mod schema;
pub mod tree;
pub mod values;

pub use self::node::{
    Alias, Binary, BindParam, ClauseList, Column, ColumnValue, Compound, Delete, Insert, Join,
    Node, NodeId, Select, SelectItem, Table, TextClause, Update,
};
pub use self::schema::{ColumnSpec, SqlType};
pub use self::tree::ExprTree;
pub use self::values::Value;
