//! Filter relations: named constructors that turn `(field, values)` into a
//! predicate over a record.
//!
//! [`Relations`] is an open registry. The standard set is installed by
//! [`Relations::standard`]; callers may register more under new names
//! without touching the compiler.

use crate::coerce::match_types;
use crate::error::{Error, Result};
use crate::{Record, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A compiled test over a single record.
pub type Predicate = Box<dyn Fn(&Record) -> bool>;

/// Builds a predicate from a field name and the filter's values.
pub type RelationFn = Arc<dyn Fn(&str, &[Value]) -> Result<Predicate> + Send + Sync>;

/// Logical negation of a predicate.
pub fn not(predicate: Predicate) -> Predicate {
    Box::new(move |record| !predicate(record))
}

/// Wrap a relation so every predicate it builds is negated.
pub fn negate(relation: RelationFn) -> RelationFn {
    Arc::new(move |field, values| relation(field, values).map(not))
}

/// Registry mapping relation names to constructors.
#[derive(Clone, Default)]
pub struct Relations {
    table: HashMap<String, RelationFn>,
}

impl Relations {
    /// A registry with no relations at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The relations the real server understands.
    pub fn standard() -> Self {
        let mut relations = Self::empty();
        relations.register_with_negation("is", "is_not", is);
        relations.register_with_negation("in", "not_in", is_in);
        relations.register("less_than", less_than);
        relations.register("greater_than", greater_than);
        relations.register("starts_with", starts_with);
        relations.register("ends_with", ends_with);
        relations
    }

    /// Register a relation, replacing any previous one of the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, relation: F)
    where
        F: Fn(&str, &[Value]) -> Result<Predicate> + Send + Sync + 'static,
    {
        self.table.insert(name.into(), Arc::new(relation));
    }

    /// Register a relation and its negation in one go.
    pub fn register_with_negation<F>(
        &mut self,
        name: impl Into<String>,
        negated_name: impl Into<String>,
        relation: F,
    ) where
        F: Fn(&str, &[Value]) -> Result<Predicate> + Send + Sync + 'static,
    {
        let relation: RelationFn = Arc::new(relation);
        self.table.insert(negated_name.into(), negate(Arc::clone(&relation)));
        self.table.insert(name.into(), relation);
    }

    pub fn get(&self, name: &str) -> Option<&RelationFn> {
        self.table.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.table.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Instantiate the named relation.
    pub fn build(&self, name: &str, field: &str, values: &[Value]) -> Result<Predicate> {
        let relation = self
            .get(name)
            .ok_or_else(|| Error::UnknownRelation(name.to_string()))?;
        relation(field, values)
    }
}

impl fmt::Debug for Relations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relations")
            .field("names", &self.names())
            .finish()
    }
}

/// Extract the single value of a one-value relation.
pub fn single<'a>(relation: &str, values: &'a [Value]) -> Result<&'a Value> {
    match values {
        [value] => Ok(value),
        _ => Err(Error::RelationArity {
            relation: relation.to_string(),
            expected: 1,
            got: values.len(),
        }),
    }
}

/// A one-value relation: `test(value, field_value)` after coercion. Absent
/// fields read as null.
fn scalar(field: &str, value: &Value, test: fn(&Value, &Value) -> bool) -> Predicate {
    let field = field.to_string();
    let value = value.clone();
    Box::new(move |record| {
        let actual = record.get(&field).unwrap_or(&Value::Null);
        let (value, actual) = match_types(&value, actual);
        test(&value, &actual)
    })
}

fn is(field: &str, values: &[Value]) -> Result<Predicate> {
    let value = single("is", values)?;
    Ok(scalar(field, value, |value, actual| match value {
        Value::Map(link) => {
            let target = actual.as_map();
            ["type", "id"].iter().all(|key| {
                let expected = link.get(*key);
                let got = target.and_then(|m| m.get(*key));
                match (expected, got) {
                    (Some(a), Some(b)) => a.loose_eq(b),
                    (None, None) => true,
                    _ => false,
                }
            })
        }
        _ => value.loose_eq(actual),
    }))
}

fn is_in(field: &str, values: &[Value]) -> Result<Predicate> {
    let field = field.to_string();
    let values = values.to_vec();
    Ok(Box::new(move |record| {
        let actual = record.get(&field).unwrap_or(&Value::Null);
        values.iter().any(|value| {
            let (value, actual) = match_types(value, actual);
            value.loose_eq(&actual)
        })
    }))
}

fn less_than(field: &str, values: &[Value]) -> Result<Predicate> {
    let value = single("less_than", values)?;
    Ok(scalar(field, value, |value, actual| {
        actual.compare(value) == Some(Ordering::Less)
    }))
}

fn greater_than(field: &str, values: &[Value]) -> Result<Predicate> {
    let value = single("greater_than", values)?;
    Ok(scalar(field, value, |value, actual| {
        actual.compare(value) == Some(Ordering::Greater)
    }))
}

fn starts_with(field: &str, values: &[Value]) -> Result<Predicate> {
    let value = single("starts_with", values)?;
    Ok(scalar(field, value, |value, actual| {
        match (actual.as_str(), value.as_str()) {
            (Some(actual), Some(prefix)) => actual.starts_with(prefix),
            _ => false,
        }
    }))
}

fn ends_with(field: &str, values: &[Value]) -> Result<Predicate> {
    let value = single("ends_with", values)?;
    Ok(scalar(field, value, |value, actual| {
        match (actual.as_str(), value.as_str()) {
            (Some(actual), Some(suffix)) => actual.ends_with(suffix),
            _ => false,
        }
    }))
}
