//! Filter compiler.
//!
//! Turns the nested filter expression accepted by the real API into a single
//! [`Predicate`]. Four wire forms are understood and may be mixed freely:
//!
//! - legacy condition: `[field, relation, v1, v2, ...]` or
//!   `[field, relation, [v1, v2, ...]]`
//! - structured condition: `{"relation": .., "path": .., "values": [..]}`
//! - legacy group: `{"filter_operator": "all" | "any", "filters": [..]}`
//! - structured group: `{"logical_operator": "and" | "or", "conditions": [..]}`
//!
//! A bare list at the top level is an implicit `and` group. All errors are
//! raised while compiling, before a single record is looked at.

use crate::error::{Error, Result};
use crate::relation::{Predicate, Relations};
use crate::{Record, Value};
use std::str::FromStr;

/// How a group combines its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

impl FromStr for LogicalOperator {
    type Err = Error;

    /// The documented legacy tokens are `all`/`any`; the server itself
    /// speaks `and`/`or`. Both are accepted, case-sensitively.
    fn from_str(token: &str) -> Result<Self> {
        match token {
            "and" | "all" => Ok(LogicalOperator::And),
            "or" | "any" => Ok(LogicalOperator::Or),
            other => Err(Error::InvalidOperator(other.to_string())),
        }
    }
}

impl LogicalOperator {
    /// Combine predicates under this operator.
    pub fn combine(self, children: Vec<Predicate>) -> Predicate {
        match self {
            LogicalOperator::And => all(children),
            LogicalOperator::Or => any(children),
        }
    }
}

/// True when every child holds; true for no children.
pub fn all(children: Vec<Predicate>) -> Predicate {
    Box::new(move |record| children.iter().all(|p| p(record)))
}

/// True when any child holds; false for no children.
pub fn any(children: Vec<Predicate>) -> Predicate {
    Box::new(move |record| children.iter().any(|p| p(record)))
}

/// Compile a filter expression against a relation registry.
pub fn compile(filters: &Value, relations: &Relations) -> Result<Predicate> {
    Compiler { relations }.group(filters)
}

/// Lazily yield the records matching `filters`, in the order given.
pub fn filter_records<'a, I>(
    filters: &Value,
    relations: &Relations,
    records: I,
) -> Result<impl Iterator<Item = &'a Record>>
where
    I: IntoIterator<Item = &'a Record>,
{
    let predicate = compile(filters, relations)?;
    Ok(records.into_iter().filter(move |record| predicate(*record)))
}

struct Compiler<'r> {
    relations: &'r Relations,
}

impl Compiler<'_> {
    fn group(&self, node: &Value) -> Result<Predicate> {
        let (operator, conditions) = match node {
            Value::Map(map) => match (map.get("logical_operator"), map.get("conditions")) {
                (Some(operator), Some(conditions)) => (operator_token(operator)?, conditions),
                _ => {
                    let operator = match map.get("filter_operator") {
                        Some(operator) => operator_token(operator)?,
                        None => LogicalOperator::And,
                    };
                    let conditions = map.get("filters").ok_or_else(|| {
                        Error::MalformedFilter("group is missing \"filters\"".to_string())
                    })?;
                    (operator, conditions)
                }
            },
            Value::List(_) => (LogicalOperator::And, node),
            other => {
                return Err(Error::MalformedFilter(format!(
                    "expected a list or a group, got {}",
                    other.type_name()
                )))
            }
        };

        let conditions = conditions.as_list().ok_or_else(|| {
            Error::MalformedFilter(format!(
                "group conditions must be a list, got {}",
                conditions.type_name()
            ))
        })?;

        let children = conditions
            .iter()
            .map(|condition| self.condition(condition))
            .collect::<Result<Vec<_>>>()?;

        Ok(operator.combine(children))
    }

    fn condition(&self, node: &Value) -> Result<Predicate> {
        match node {
            Value::Map(map) => {
                if map.contains_key("filter_operator") || map.contains_key("logical_operator") {
                    return self.group(node);
                }
                let relation = string_key(map.get("relation"), "relation")?;
                let field = string_key(map.get("path"), "path")?;
                let values = match map.get("values") {
                    Some(Value::List(values)) => values.as_slice(),
                    Some(value) => std::slice::from_ref(value),
                    None => {
                        return Err(Error::MalformedFilter(
                            "condition is missing \"values\"".to_string(),
                        ))
                    }
                };
                self.relations.build(relation, field, values)
            }
            Value::List(items) => {
                let (field, relation, values) = match items.as_slice() {
                    [field, relation, Value::List(values)] => (field, relation, values.as_slice()),
                    [field, relation, rest @ ..] => (field, relation, rest),
                    _ => {
                        return Err(Error::MalformedFilter(format!(
                            "condition needs a field and a relation, got {} item(s)",
                            items.len()
                        )))
                    }
                };
                let field = string_key(Some(field), "field")?;
                let relation = string_key(Some(relation), "relation")?;
                self.relations.build(relation, field, values)
            }
            other => Err(Error::MalformedFilter(format!(
                "expected a condition, got {}",
                other.type_name()
            ))),
        }
    }
}

fn operator_token(value: &Value) -> Result<LogicalOperator> {
    match value {
        Value::String(token) => token.parse(),
        other => Err(Error::InvalidOperator(other.type_name().to_string())),
    }
}

fn string_key<'a>(value: Option<&'a Value>, what: &str) -> Result<&'a str> {
    match value {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(Error::MalformedFilter(format!(
            "condition {what} must be a string, got {}",
            other.type_name()
        ))),
        None => Err(Error::MalformedFilter(format!("condition is missing {what:?}"))),
    }
}
