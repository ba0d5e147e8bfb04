//! Column descriptors used by the DDL generator.

use serde::{Deserialize, Serialize};

use super::values::Value;

/// SQL column types understood by the ANSI dialect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlType {
    SmallInt,
    Integer,
    BigInt,
    Numeric(u32, u32),
    Float,
    Varchar(Option<u32>),
    Text,
    Boolean,
    Date,
    Timestamp,
    /// Any type name passed through verbatim.
    Custom(String),
}

impl std::fmt::Display for SqlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlType::SmallInt => write!(f, "SMALLINT"),
            SqlType::Integer => write!(f, "INTEGER"),
            SqlType::BigInt => write!(f, "BIGINT"),
            SqlType::Numeric(p, s) => write!(f, "NUMERIC({}, {})", p, s),
            SqlType::Float => write!(f, "FLOAT"),
            SqlType::Varchar(Some(n)) => write!(f, "VARCHAR({})", n),
            SqlType::Varchar(None) => write!(f, "VARCHAR"),
            SqlType::Text => write!(f, "TEXT"),
            SqlType::Boolean => write!(f, "BOOLEAN"),
            SqlType::Date => write!(f, "DATE"),
            SqlType::Timestamp => write!(f, "TIMESTAMP"),
            SqlType::Custom(name) => write!(f, "{}", name),
        }
    }
}

impl SqlType {
    /// Map a type name as written in a statement document.
    pub fn from_name(name: &str) -> Self {
        let upper = name.trim().to_ascii_uppercase();
        match upper.as_str() {
            "SMALLINT" => SqlType::SmallInt,
            "INT" | "INTEGER" => SqlType::Integer,
            "BIGINT" => SqlType::BigInt,
            "FLOAT" | "REAL" | "DOUBLE PRECISION" => SqlType::Float,
            "VARCHAR" => SqlType::Varchar(None),
            "TEXT" => SqlType::Text,
            "BOOL" | "BOOLEAN" => SqlType::Boolean,
            "DATE" => SqlType::Date,
            "TIMESTAMP" => SqlType::Timestamp,
            _ => {
                if let Some(len) = upper
                    .strip_prefix("VARCHAR(")
                    .and_then(|rest| rest.strip_suffix(')'))
                    .and_then(|n| n.trim().parse().ok())
                {
                    return SqlType::Varchar(Some(len));
                }
                SqlType::Custom(name.trim().to_string())
            }
        }
    }
}

/// Self-describing column definition: name, type and constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub sql_type: SqlType,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub unique: bool,
    /// Default value; also the bind default when an INSERT/UPDATE omits the column.
    #[serde(default)]
    pub default: Option<Value>,
}

fn default_nullable() -> bool {
    true
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            primary_key: false,
            nullable: true,
            unique: false,
            default: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// The column clause of a CREATE TABLE statement.
    pub fn specification(&self) -> String {
        let mut spec = format!("{} {}", self.name, self.sql_type);
        if self.primary_key {
            spec.push_str(" PRIMARY KEY");
        } else if !self.nullable {
            spec.push_str(" NOT NULL");
        }
        if self.unique {
            spec.push_str(" UNIQUE");
        }
        if let Some(default) = &self.default {
            spec.push_str(" DEFAULT ");
            spec.push_str(&default.to_string());
        }
        spec
    }
}
