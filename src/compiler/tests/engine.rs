//! Caching, predicate injection and error cases.

use pretty_assertions::assert_eq;

use super::{col, table_t};
use crate::ast::*;
use crate::compiler::{CompileOptions, compile, compile_with};
use crate::error::SqlError;

#[test]
fn test_shared_node_rendered_once() {
    let mut tree = ExprTree::new();
    let t1 = tree.table("t1", [ColumnSpec::new("id", SqlType::Integer)]);
    let t2 = tree.table("t2", [ColumnSpec::new("t1_id", SqlType::Integer)]);
    let id = col(&tree, t1, "id");
    let fk = col(&tree, t2, "t1_id");
    let bind = tree.bind("id");
    let shared = tree.eq(id, bind);
    let link = tree.eq(id, fk);
    let on = tree.and([link, shared]);
    let join = tree.join(t1, t2, on);
    let sel = tree.select(Select::new([id]).from(join).filter(shared));

    let compiled = compile(&tree, sel).unwrap();
    assert_eq!(
        compiled.text(),
        "SELECT t1.id FROM (t1 JOIN t2 ON t1.id = t2.t1_id AND t1.id = :id) WHERE t1.id = :id"
    );
    assert_eq!(compiled.binds().len(), 1);
    assert_eq!(compiled.stats().renders_of(shared), 1);
    assert_eq!(compiled.stats().renders_of(bind), 1);
    assert_eq!(compiled.stats().renders_of(id), 1);
}

#[test]
fn test_where_override_conjoined() {
    let mut tree = ExprTree::new();
    let t1 = table_t(&mut tree);
    let t2 = tree.table("t2", [ColumnSpec::new("b", SqlType::Integer)]);
    let a = col(&tree, t1, "a");
    let b2 = col(&tree, t2, "b");

    // injected predicate declared before the statement's own predicate
    let five = tree.text("5");
    let injected = tree.eq(b2, five);
    let bind = tree.bind("a");
    let own = tree.eq(a, bind);
    let sel = tree.select(Select::new([a]).from(t1).from(t2).filter(own));

    let options = CompileOptions::new().where_override(t2, injected);
    let compiled = compile_with(&tree, sel, options).unwrap();
    assert_eq!(
        compiled.text(),
        "SELECT t.a FROM t, t2 WHERE t2.b = 5 AND t.a = :a"
    );
    assert_eq!(compiled.stats().renders_of(own), 1);
}

#[test]
fn test_where_override_declared_after_predicate() {
    let mut tree = ExprTree::new();
    let t1 = table_t(&mut tree);
    let t2 = tree.table("t2", [ColumnSpec::new("b", SqlType::Integer)]);
    let a = col(&tree, t1, "a");
    let b2 = col(&tree, t2, "b");

    let bind = tree.bind("a");
    let own = tree.eq(a, bind);
    let sel = tree.select(Select::new([a]).from(t1).from(t2).filter(own));
    let five = tree.text("5");
    let injected = tree.eq(b2, five);

    let options = CompileOptions::new().where_override(t2, injected);
    let compiled = compile_with(&tree, sel, options).unwrap();
    assert!(compiled.text().ends_with("WHERE t2.b = 5 AND t.a = :a"));
}

#[test]
fn test_where_override_without_own_predicate() {
    let mut tree = ExprTree::new();
    let t = table_t(&mut tree);
    let a = col(&tree, t, "a");
    let b = col(&tree, t, "b");
    let zero = tree.text("0");
    let injected = tree.binary(b, ">", zero);
    let sel = tree.select(Select::new([a]));

    let options = CompileOptions::new().where_override(t, injected);
    let compiled = compile_with(&tree, sel, options).unwrap();
    assert_eq!(compiled.text(), "SELECT t.a FROM t WHERE t.b > 0");
}

#[test]
fn test_where_override_groups_or() {
    let mut tree = ExprTree::new();
    let t = table_t(&mut tree);
    let a = col(&tree, t, "a");
    let b = col(&tree, t, "b");
    let null = tree.text("NULL");
    let one = tree.text("1");
    let is_null = tree.binary(b, "IS", null);
    let is_one = tree.eq(b, one);
    let injected = tree.compound(Some("OR"), [is_null, is_one], false);
    let zero = tree.text("0");
    let own = tree.binary(a, ">", zero);
    let sel = tree.select(Select::new([a]).filter(own));

    let options = CompileOptions::new().where_override(t, injected);
    let compiled = compile_with(&tree, sel, options).unwrap();
    assert_eq!(
        compiled.text(),
        "SELECT t.a FROM t WHERE (t.b IS NULL OR t.b = 1) AND t.a > 0"
    );
}

#[test]
fn test_where_overrides_from_several_sources() {
    let mut tree = ExprTree::new();
    let t1 = table_t(&mut tree);
    let t2 = tree.table("t2", [ColumnSpec::new("b", SqlType::Integer)]);
    let a = col(&tree, t1, "a");
    let w1 = tree.text("w1");
    let w2 = tree.text("w2");
    let zero = tree.text("0");
    let own = tree.binary(a, ">", zero);
    let sel = tree.select(Select::new([a]).from(t1).from(t2).filter(own));

    let options = CompileOptions::new()
        .where_override(t1, w1)
        .where_override(t2, w2);
    let compiled = compile_with(&tree, sel, options).unwrap();
    assert_eq!(
        compiled.text(),
        "SELECT t.a FROM t, t2 WHERE w2 AND w1 AND t.a > 0"
    );
}

#[test]
fn test_where_override_bind_collides_with_own_bind() {
    let mut tree = ExprTree::new();
    let t = table_t(&mut tree);
    let a = col(&tree, t, "a");
    let b = col(&tree, t, "b");
    let injected_x = tree.bind("x");
    let injected = tree.eq(b, injected_x);
    let own_x = tree.bind("x");
    let own = tree.eq(a, own_x);
    let sel = tree.select(Select::new([a]).filter(own));

    let options = CompileOptions::new().where_override(t, injected);
    let compiled = compile_with(&tree, sel, options).unwrap();
    assert_eq!(
        compiled.text(),
        "SELECT t.a FROM t WHERE t.b = :x AND t.a = :x_1"
    );
    let keys: Vec<&str> = compiled.binds().keys().collect();
    assert_eq!(keys, vec!["x", "x_1"]);

    let params = compiled.resolve([("x", 1), ("x_1", 2)]).unwrap();
    assert_eq!(params.get("x"), Some(&Value::Int(1)));
    assert_eq!(params.get("x_1"), Some(&Value::Int(2)));
}

#[test]
fn test_where_override_groups_or_binary() {
    let mut tree = ExprTree::new();
    let t = table_t(&mut tree);
    let a = col(&tree, t, "a");
    let b = col(&tree, t, "b");
    let one = tree.text("1");
    let two = tree.text("2");
    let a_is_one = tree.eq(a, one);
    let b_is_two = tree.eq(b, two);
    let either = tree.binary(a_is_one, "OR", b_is_two);
    let own = tree.text("w");
    let sel = tree.select(Select::new([a]).filter(own));

    let options = CompileOptions::new().where_override(t, either);
    let compiled = compile_with(&tree, sel, options).unwrap();
    assert_eq!(
        compiled.text(),
        "SELECT t.a FROM t WHERE (t.a = 1 OR t.b = 2) AND w"
    );
}

#[test]
fn test_override_does_not_leak_into_other_uses() {
    let mut tree = ExprTree::new();
    let t = table_t(&mut tree);
    let a = col(&tree, t, "a");
    let b = col(&tree, t, "b");
    let zero = tree.text("0");
    let own = tree.binary(a, ">", zero);
    let injected = tree.binary(b, ">", zero);
    let inner = tree.select(Select::new([a]).filter(own));
    let sub = tree.alias(inner, "s");
    let s_a = col(&tree, sub, "a");
    // the same predicate node is reused by the outer statement
    let outer = tree.select(Select::new([s_a]).from(sub).filter(own));

    let options = CompileOptions::new().where_override(t, injected);
    let compiled = compile_with(&tree, outer, options).unwrap();
    assert_eq!(
        compiled.text(),
        "SELECT s.a FROM (SELECT t.a FROM t WHERE t.b > 0 AND t.a > 0) s WHERE t.a > 0"
    );
}

#[test]
fn test_compile_time_param_replaces_default() {
    let mut tree = ExprTree::new();
    let t = table_t(&mut tree);
    let a = col(&tree, t, "a");
    let bind = tree.bind_param(BindParam::new("x").with_value(1));
    let pred = tree.eq(a, bind);
    let sel = tree.select(Select::new([a]).filter(pred));

    let compiled = compile_with(&tree, sel, CompileOptions::new().param("x", 3)).unwrap();
    let resolved = compiled.resolve(Vec::<(&str, Value)>::new()).unwrap();
    assert_eq!(resolved.get("x"), Some(&Value::Int(3)));
}

#[test]
fn test_declared_key() {
    let mut tree = ExprTree::new();
    let t = table_t(&mut tree);
    let a = col(&tree, t, "a");
    let bind = tree.bind_param(BindParam::new("a").with_key("a_min"));
    let pred = tree.binary(a, ">=", bind);
    let sel = tree.select(Select::new([a]).filter(pred));

    let compiled = compile(&tree, sel).unwrap();
    assert_eq!(compiled.text(), "SELECT t.a FROM t WHERE t.a >= :a_min");
    let resolved = compiled.resolve([("a", 4)]).unwrap();
    assert_eq!(resolved.get("a_min"), Some(&Value::Int(4)));
}

#[test]
fn test_recompile_is_deterministic() {
    let mut tree = ExprTree::new();
    let t = table_t(&mut tree);
    let a = col(&tree, t, "a");
    let x1 = tree.bind("x");
    let x2 = tree.bind("x");
    let c1 = tree.eq(a, x1);
    let c2 = tree.eq(a, x2);
    let pred = tree.or([c1, c2]);
    let sel = tree.select(Select::new([a]).filter(pred));

    let first = compile(&tree, sel).unwrap();
    let second = compile(&tree, sel).unwrap();
    assert_eq!(first.text(), second.text());
    assert_eq!(first.text(), "SELECT t.a FROM t WHERE (t.a = :x OR t.a = :x_1)");
    assert_eq!(
        first.binds().keys().collect::<Vec<_>>(),
        second.binds().keys().collect::<Vec<_>>()
    );
}

#[test]
fn test_concurrent_compilations_share_tree() {
    let mut tree = ExprTree::new();
    let t = table_t(&mut tree);
    let a = col(&tree, t, "a");
    let bind = tree.bind("a");
    let pred = tree.eq(a, bind);
    let sel = tree.select(Select::new([t]).filter(pred));

    let tree = &tree;
    let texts: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(move || compile(tree, sel).map(|c| c.text().to_string())))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect()
    });
    assert!(texts.iter().all(|t| t == "SELECT t.a, t.b FROM t WHERE t.a = :a"));
}

#[test]
fn test_dangling_reference() {
    let mut tree = ExprTree::new();
    let t = table_t(&mut tree);
    let sel = tree.select(Select::new([NodeId(99)]).from(t));
    let err = compile(&tree, sel).unwrap_err();
    assert!(matches!(err, SqlError::UnresolvedReference { node: 99, .. }));
}

#[test]
fn test_cyclic_reference() {
    let mut tree = ExprTree::new();
    let t = table_t(&mut tree);
    let a = col(&tree, t, "a");
    let first = NodeId(tree.len());
    let second = NodeId(tree.len() + 1);
    tree.push(Node::Binary(Binary {
        left: a,
        operator: "=".into(),
        right: second,
        parens: false,
    }));
    tree.push(Node::Binary(Binary {
        left: a,
        operator: "=".into(),
        right: first,
        parens: false,
    }));
    let sel = tree.select(Select::new([a]).from(t).filter(first));
    let err = compile(&tree, sel).unwrap_err();
    assert!(matches!(
        err,
        SqlError::UnresolvedReference { reason: "cyclic reference", .. }
    ));
}

#[test]
fn test_unsupported_positions() {
    let mut tree = ExprTree::new();
    let t = table_t(&mut tree);
    let a = col(&tree, t, "a");

    let table_as_value = tree.select(Select::new([a]).filter(t));
    let err = compile(&tree, table_as_value).unwrap_err();
    assert!(matches!(
        err,
        SqlError::UnsupportedNodeKind { kind: "table", position: "a value expression" }
    ));

    let column_as_from = tree.select(Select::new([a]).from(a));
    let err = compile(&tree, column_as_from).unwrap_err();
    assert!(matches!(
        err,
        SqlError::UnsupportedNodeKind { kind: "column", position: "a FROM source" }
    ));

    let err = compile(&tree, a).unwrap_err();
    assert!(matches!(
        err,
        SqlError::UnsupportedNodeKind { kind: "column", position: "a statement" }
    ));
}

#[test]
fn test_anonymous_join_side_is_rejected() {
    let mut tree = ExprTree::new();
    let t = table_t(&mut tree);
    let anon = tree.anonymous_table([ColumnSpec::new("q", SqlType::Integer)]);
    let a = col(&tree, t, "a");
    let on = tree.text("1 = 1");
    let join = tree.join(anon, t, on);
    let sel = tree.select(Select::new([a]).from(join));

    let err = compile(&tree, sel).unwrap_err();
    assert!(matches!(
        err,
        SqlError::UnsupportedNodeKind { kind: "anonymous table", position: "a join side" }
    ));
}
