//! Entities serialize with lowerCamelCase keys; table columns are snake_case.

use serde_json::Value;

use super::Row;

pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

pub fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Converts a serialized entity into a row. Nested values are left alone.
pub fn object_to_row(value: Value) -> Option<Row> {
    match value {
        Value::Object(map) => Some(map.into_iter().map(|(k, v)| (to_snake_case(&k), v)).collect()),
        _ => None,
    }
}

pub fn row_to_object(row: Row) -> Value {
    Value::Object(row.into_iter().map(|(k, v)| (to_camel_case(&k), v)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_case_conversion() {
        assert_eq!(to_snake_case("primaryOrganizationId"), "primary_organization_id");
        assert_eq!(to_snake_case("type"), "type");
        assert_eq!(to_camel_case("gw_code"), "gwCode");
        assert_eq!(to_camel_case("id"), "id");
    }

    #[test]
    fn test_nested_json_is_untouched() {
        let row = object_to_row(json!({"objectId": "x", "data": {"sellerId": "y"}})).unwrap();

        assert_eq!(row["object_id"], "x");
        assert_eq!(row["data"]["sellerId"], "y");
    }
}
