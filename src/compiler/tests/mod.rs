//! Compiler tests (SELECT, DML, caching and error cases).

mod engine;

use crate::ast::*;

/// `t (a INTEGER, b INTEGER)`
fn table_t(tree: &mut ExprTree) -> NodeId {
    tree.table(
        "t",
        [
            ColumnSpec::new("a", SqlType::Integer),
            ColumnSpec::new("b", SqlType::Integer),
        ],
    )
}

fn col(tree: &ExprTree, owner: NodeId, name: &str) -> NodeId {
    tree.column(owner, name)
        .unwrap_or_else(|| panic!("no column {} on {}", name, owner))
}
