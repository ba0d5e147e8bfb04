//! Bind assignment parser using nom.
//!
//! Parses `name=value` pairs as given on the command line:
//!
//! ```text
//! user_id=42        integer
//! ratio=0.5         float
//! active=true       boolean
//! note=NULL         null
//! name='O''Brien'   quoted string ('' escapes a quote)
//! since=2024-01-31T08:00:00
//! city=Paris        anything else is a bare string
//! ```

use chrono::NaiveDateTime;
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while1},
    character::complete::{char, digit1},
    combinator::{map, map_res, opt, recognize, value},
    multi::many0,
    sequence::{delimited, pair, tuple},
};

use crate::ast::Value;
use crate::error::{SqlError, SqlResult};

/// Parse `name=value`.
pub fn parse_assignment(input: &str) -> SqlResult<(String, Value)> {
    let input = input.trim();
    match parse_name(input) {
        Ok((rest, name)) => match rest.strip_prefix('=') {
            Some(raw) => Ok((name.to_string(), parse_value(raw))),
            None => Err(SqlError::parse(
                input.len() - rest.len(),
                format!("Expected '=' after '{}'", name),
            )),
        },
        Err(_) => Err(SqlError::parse(0, "Expected a parameter name")),
    }
}

/// Parse a literal. Input that is not a complete literal is a bare string.
pub fn parse_value(input: &str) -> Value {
    let input = input.trim();
    match parse_literal(input) {
        Ok(("", v)) => v,
        _ => Value::String(input.to_string()),
    }
}

fn parse_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)
}

fn parse_literal(input: &str) -> IResult<&str, Value> {
    alt((
        map(parse_timestamp, Value::Timestamp),
        map(parse_float, Value::Float),
        map(parse_int, Value::Int),
        value(Value::Bool(true), tag_no_case("true")),
        value(Value::Bool(false), tag_no_case("false")),
        value(Value::Null, tag_no_case("null")),
        map(parse_quoted, Value::String),
    ))(input)
}

fn parse_int(input: &str) -> IResult<&str, i64> {
    map_res(recognize(pair(opt(char('-')), digit1)), str::parse)(input)
}

fn parse_float(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(tuple((opt(char('-')), digit1, char('.'), digit1))),
        str::parse,
    )(input)
}

/// `YYYY-MM-DDTHH:MM:SS` or with a space instead of `T`.
fn parse_timestamp(input: &str) -> IResult<&str, NaiveDateTime> {
    map_res(
        recognize(tuple((
            digit1,
            char('-'),
            digit1,
            char('-'),
            digit1,
            alt((char('T'), char(' '))),
            digit1,
            char(':'),
            digit1,
            char(':'),
            digit1,
        ))),
        |s: &str| NaiveDateTime::parse_from_str(&s.replacen(' ', "T", 1), "%Y-%m-%dT%H:%M:%S"),
    )(input)
}

/// Single-quoted string with `''` as an escaped quote.
fn parse_quoted(input: &str) -> IResult<&str, String> {
    map(
        delimited(
            char('\''),
            many0(alt((
                value("'", tag("''")),
                take_while1(|c: char| c != '\''),
            ))),
            char('\''),
        ),
        |parts: Vec<&str>| parts.concat(),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_numbers() {
        assert_eq!(parse_value("42"), Value::Int(42));
        assert_eq!(parse_value("-7"), Value::Int(-7));
        assert_eq!(parse_value("0.5"), Value::Float(0.5));
    }

    #[test]
    fn test_keywords() {
        assert_eq!(parse_value("true"), Value::Bool(true));
        assert_eq!(parse_value("FALSE"), Value::Bool(false));
        assert_eq!(parse_value("NULL"), Value::Null);
    }

    #[test]
    fn test_quoted_string() {
        assert_eq!(parse_value("'O''Brien'"), Value::String("O'Brien".into()));
        assert_eq!(parse_value("''"), Value::String(String::new()));
    }

    #[test]
    fn test_bare_string() {
        assert_eq!(parse_value("Paris"), Value::String("Paris".into()));
        // a number followed by garbage is not a number
        assert_eq!(parse_value("12abc"), Value::String("12abc".into()));
    }

    #[test]
    fn test_timestamp() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 31)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        assert_eq!(parse_value("2024-01-31T08:00:00"), Value::Timestamp(expected));
        assert_eq!(parse_value("2024-01-31 08:00:00"), Value::Timestamp(expected));
    }

    #[test]
    fn test_assignment() {
        let (name, value) = parse_assignment("user_id=42").unwrap();
        assert_eq!(name, "user_id");
        assert_eq!(value, Value::Int(42));
    }

    #[test]
    fn test_assignment_errors() {
        assert!(matches!(
            parse_assignment("user_id"),
            Err(SqlError::Parse { position: 7, .. })
        ));
        assert!(matches!(
            parse_assignment("=5"),
            Err(SqlError::Parse { position: 0, .. })
        ));
    }
}
