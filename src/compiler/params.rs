//! Parameter resolution.
//!
//! Merges caller overrides with the defaults registered at compile time
//! and produces the final `key -> value` set handed to an executor.

use serde::{Deserialize, Serialize};

use super::binds::BindRegistry;
use crate::ast::Value;
use crate::error::{SqlError, SqlResult};

/// What to do with a parameter that has neither an override nor a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingPolicy {
    /// Fail with `MissingBindValue`.
    #[default]
    Error,
    /// Bind SQL NULL.
    Null,
}

/// Final bind values, in registration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedParams {
    entries: Vec<(String, Value)>,
}

impl ResolvedParams {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<(String, Value)> {
        self.entries
    }

    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

/// Resolve bind values against a registry.
///
/// An override name is matched against shortnames first, which reaches
/// every parameter registered under that name. Names that are not a
/// shortname are matched against unique keys and reach exactly one
/// parameter; those win over shortname matches for the same parameter.
pub fn resolve<I, K, V>(
    binds: &BindRegistry,
    overrides: I,
    policy: MissingPolicy,
) -> SqlResult<ResolvedParams>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<Value>,
{
    let mut staged: Vec<Option<Value>> = vec![None; binds.len()];
    let mut by_key = Vec::new();

    for (name, value) in overrides {
        let name = name.as_ref();
        let value = value.into();
        let positions = binds.positions_for_name(name);
        if !positions.is_empty() {
            for &idx in positions {
                staged[idx] = Some(value.clone());
            }
        } else if let Some(idx) = binds.position_of_key(name) {
            by_key.push((idx, value));
        } else {
            return Err(SqlError::UnknownBindName(name.to_string()));
        }
    }
    for (idx, value) in by_key {
        staged[idx] = Some(value);
    }

    let mut entries = Vec::with_capacity(binds.len());
    for (param, staged) in binds.iter().zip(staged) {
        let value = match (staged, &param.value, policy) {
            (Some(v), _, _) => v,
            (None, Some(default), _) => default.clone(),
            (None, None, MissingPolicy::Null) => Value::Null,
            (None, None, MissingPolicy::Error) => {
                return Err(SqlError::MissingBindValue(param.key.clone()));
            }
        };
        entries.push((param.key.clone(), value));
    }

    Ok(ResolvedParams { entries })
}
