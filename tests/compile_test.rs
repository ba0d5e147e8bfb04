use ansisql::ddl::{create_all, drop_all};
use ansisql::document::StatementDoc;
use ansisql::parser::parse_assignment;
use ansisql::prelude::*;
use pretty_assertions::assert_eq;

const SHOP: &str = r#"{
    "tables": [
        {"name": "users", "columns": [
            {"name": "id", "type": "INTEGER", "primary_key": true},
            {"name": "email", "type": "VARCHAR(120)", "nullable": false, "unique": true}
        ]},
        {"name": "orders", "columns": [
            {"name": "id", "type": "INTEGER", "primary_key": true},
            {"name": "user_id", "type": "INTEGER", "nullable": false},
            {"name": "total", "type": "NUMERIC"},
            {"name": "status", "type": "VARCHAR(16)", "default": "new"}
        ]}
    ],
    "statement": {"select": {
        "items": [{"column": "users.email"}, {"column": "orders.total"}],
        "from": [{"join": {
            "left": {"table": "users"},
            "right": {"table": "orders"},
            "on": {"binary": {"left": {"column": "users.id"}, "op": "=", "right": {"column": "orders.user_id"}}},
            "outer": true
        }}],
        "where": {"and": [
            {"binary": {"left": {"column": "orders.status"}, "op": "=", "right": {"bind": {"name": "status", "value": "paid"}}}},
            {"binary": {"left": {"column": "orders.total"}, "op": ">", "right": {"bind": {"name": "status"}}}}
        ]},
        "order_by": [{"column": "orders.total"}]
    }}
}"#;

#[test]
fn test_document_select_with_join() {
    let lowered = StatementDoc::from_json(SHOP)
        .and_then(StatementDoc::lower)
        .expect("Failed to lower shop document");
    let root = lowered.root.expect("statement");

    let compiled = compile_with(&lowered.tree, root, lowered.options).unwrap();
    assert_eq!(
        compiled.text(),
        "SELECT users.email, orders.total FROM (users LEFT OUTER JOIN orders ON users.id = orders.user_id) \
         WHERE orders.status = :status AND orders.total > :status_1 ORDER BY orders.total"
    );

    let keys: Vec<&str> = compiled.binds().keys().collect();
    assert_eq!(keys, vec!["status", "status_1"]);

    // a shortname override reaches both binds; the unique key targets one
    let (name, value) = parse_assignment("status_1=100").unwrap();
    let params = compiled.resolve([(name, value)]).unwrap();
    assert_eq!(params.get("status"), Some(&Value::String("paid".into())));
    assert_eq!(params.get("status_1"), Some(&Value::Int(100)));

    let err = compiled.resolve(Vec::<(String, Value)>::new()).unwrap_err();
    assert!(matches!(err, SqlError::MissingBindValue(ref k) if k == "status_1"));

    let nulls = compiled
        .resolve_with(Vec::<(String, Value)>::new(), MissingPolicy::Null)
        .unwrap();
    assert_eq!(nulls.get("status_1"), Some(&Value::Null));

    let both = compiled.resolve([("status", "void")]).unwrap();
    assert_eq!(both.get("status"), Some(&Value::String("void".into())));
    assert_eq!(both.get("status_1"), Some(&Value::String("void".into())));
}

#[test]
fn test_document_ddl() {
    let lowered = StatementDoc::from_json(SHOP).unwrap().lower().unwrap();
    assert_eq!(
        create_all(&lowered.tree, &lowered.tables).unwrap(),
        vec![
            "CREATE TABLE users (id INTEGER PRIMARY KEY, email VARCHAR(120) NOT NULL UNIQUE)",
            "CREATE TABLE orders (id INTEGER PRIMARY KEY, user_id INTEGER NOT NULL, total NUMERIC, status VARCHAR(16) DEFAULT 'new')",
        ]
    );
    assert_eq!(
        drop_all(&lowered.tree, &lowered.tables).unwrap(),
        vec!["DROP TABLE orders", "DROP TABLE users"]
    );
}

#[test]
fn test_subquery_alias_with_where_override() {
    let mut tree = ExprTree::new();
    let t = tree.table(
        "t",
        [
            ColumnSpec::new("a", SqlType::Integer),
            ColumnSpec::new("b", SqlType::Integer),
        ],
    );
    let a = tree.column(t, "a").unwrap();
    let b = tree.column(t, "b").unwrap();
    let min = tree.bind("min");
    let inner_pred = tree.binary(b, ">", min);
    let inner = tree.select(Select::new([a, b]).filter(inner_pred));
    let sub = tree.alias(inner, "s");

    let sa = tree.column(sub, "a").unwrap();
    let sb = tree.column(sub, "b").unwrap();
    let max = tree.bind("min");
    let outer_pred = tree.binary(sb, "<", max);
    let outer = tree.select(Select::new([sa]).filter(outer_pred));
    let injected = tree.text("s.a IS NOT NULL");

    let options = CompileOptions::new().where_override(sub, injected);
    let compiled = compile_with(&tree, outer, options).unwrap();
    assert_eq!(
        compiled.text(),
        "SELECT s.a FROM (SELECT t.a, t.b FROM t WHERE t.b > :min) s \
         WHERE s.a IS NOT NULL AND s.b < :min_1"
    );

    // the inner SELECT compiled alone is untouched by the override
    let alone = compile(&tree, inner).unwrap();
    assert_eq!(alone.text(), "SELECT t.a, t.b FROM t WHERE t.b > :min");
    assert_eq!(
        alone.from_text(),
        Some("(SELECT t.a, t.b FROM t WHERE t.b > :min)")
    );
}

#[test]
fn test_update_then_delete() {
    let mut tree = ExprTree::new();
    let t = tree.table(
        "accounts",
        [
            ColumnSpec::new("id", SqlType::Integer).primary_key(),
            ColumnSpec::new("balance", SqlType::Integer).default_value(0),
        ],
    );
    let id = tree.column(t, "id").unwrap();
    let balance = tree.column(t, "balance").unwrap();
    let who = tree.bind("who");
    let pred = tree.eq(id, who);
    let update = tree.update(Update::new(t).set(balance, 10).filter(pred));
    let delete = tree.delete(Delete::new(t).filter(pred));

    let compiled = compile(&tree, update).unwrap();
    assert_eq!(
        compiled.text(),
        "UPDATE accounts SET balance=:balance WHERE accounts.id = :who"
    );
    let params = compiled.resolve([("who", 3), ("balance", 25)]).unwrap();
    let pairs = params.into_vec();
    assert_eq!(
        pairs,
        vec![
            ("balance".to_string(), Value::Int(25)),
            ("who".to_string(), Value::Int(3)),
        ]
    );

    let compiled = compile(&tree, delete).unwrap();
    assert_eq!(compiled.text(), "DELETE FROM accounts WHERE accounts.id = :who");
    assert!(matches!(
        compiled.resolve([("nobody", 1)]),
        Err(SqlError::UnknownBindName(ref n)) if n == "nobody"
    ));
}
