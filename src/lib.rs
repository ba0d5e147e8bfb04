//! # ansisql
//!
//! Compiles a relational expression tree into ANSI SQL text plus a set of
//! named bind parameters.
//!
//! ## Quick Example
//!
//! ```rust
//! use ansisql::prelude::*;
//!
//! let mut tree = ExprTree::new();
//! let t = tree.table(
//!     "t",
//!     [
//!         ColumnSpec::new("a", SqlType::Integer),
//!         ColumnSpec::new("b", SqlType::Integer),
//!     ],
//! );
//! let a = tree.column(t, "a").unwrap();
//! let b = tree.column(t, "b").unwrap();
//! let x = tree.bind("x");
//! let predicate = tree.eq(b, x);
//! let select = tree.select(Select::new([a]).filter(predicate));
//!
//! let compiled = ansisql::compile(&tree, select)?;
//! assert_eq!(compiled.text(), "SELECT t.a FROM t WHERE t.b = :x");
//!
//! let params = compiled.resolve([("x", 5)])?;
//! assert_eq!(params.get("x"), Some(&Value::Int(5)));
//! # Ok::<(), SqlError>(())
//! ```
//!
//! ## Pieces
//!
//! | Module     | Role                                              |
//! |------------|---------------------------------------------------|
//! | `ast`      | Arena expression tree, values, column specs       |
//! | `compiler` | Memoizing renderer, bind registry, resolver       |
//! | `ddl`      | CREATE TABLE / DROP TABLE                         |
//! | `document` | JSON statement documents lowered into a tree      |
//! | `parser`   | `name=value` bind assignments                     |
//! | `config`   | `ansisql.toml`                                    |

pub mod ast;
pub mod compiler;
pub mod config;
pub mod ddl;
pub mod document;
pub mod error;
pub mod parser;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::compiler::{
        CompileOptions, Compiled, MissingPolicy, ResolvedParams, compile, compile_with,
    };
    pub use crate::ddl::{create_table, drop_table};
    pub use crate::error::{SqlError, SqlResult};
}

pub use compiler::{compile, compile_with};
pub use error::{SqlError, SqlResult};
