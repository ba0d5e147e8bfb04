/// Dialect-specific pieces of SQL text.
pub trait SqlDialect {
    fn name(&self) -> &'static str;

    /// Placeholder emitted for a bind parameter key.
    fn placeholder(&self, key: &str) -> String;

    /// Keyword between the two sides of a join.
    fn join_keyword(&self, outer: bool) -> &'static str;
}

/// The reference ANSI dialect.
pub struct AnsiGenerator;

impl SqlDialect for AnsiGenerator {
    fn name(&self) -> &'static str {
        "ansi"
    }

    fn placeholder(&self, key: &str) -> String {
        format!(":{}", key)
    }

    fn join_keyword(&self, outer: bool) -> &'static str {
        if outer { "LEFT OUTER JOIN" } else { "JOIN" }
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Ansi,
}

impl Dialect {
    pub fn generator(&self) -> Box<dyn SqlDialect> {
        match self {
            Dialect::Ansi => Box::new(AnsiGenerator),
        }
    }
}
