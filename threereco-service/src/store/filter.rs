use serde_json::Value;

use super::Row;

/// Row predicate, built by the policy compiler and list endpoints and
/// translated by each store backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    True,
    Eq(String, Value),
    In(String, Vec<Value>),
    /// Case-insensitive substring match on the column's text form.
    Like(String, String),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(column.to_string(), value.into())
    }

    pub fn id(id: uuid::Uuid) -> Self {
        Filter::eq("id", id.to_string())
    }

    pub fn one_of<I, V>(column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Filter::In(column.to_string(), values.into_iter().map(Into::into).collect())
    }

    /// Conjunction that drops `True` operands.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut parts: Vec<Filter> = filters
            .into_iter()
            .filter(|f| *f != Filter::True)
            .collect();
        match parts.len() {
            0 => Filter::True,
            1 => parts.remove(0),
            _ => Filter::And(parts),
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Filter::True => true,
            Filter::Eq(column, value) => column_value(row, column) == value,
            Filter::In(column, values) => {
                let current = column_value(row, column);
                values.iter().any(|v| v == current)
            }
            Filter::Like(column, term) => match column_value(row, column) {
                Value::Null => false,
                Value::String(s) => s.to_lowercase().contains(&term.to_lowercase()),
                other => other.to_string().to_lowercase().contains(&term.to_lowercase()),
            },
            Filter::And(filters) => filters.iter().all(|f| f.matches(row)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(row)),
        }
    }
}

fn column_value<'a>(row: &'a Row, column: &str) -> &'a Value {
    row.get(column).unwrap_or(&Value::Null)
}
