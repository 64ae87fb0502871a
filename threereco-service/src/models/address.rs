use serde::{Deserialize, Serialize};
use validator::Validate;

/// Postal address, stored as a single jsonb column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[validate(length(min = 1, max = 255))]
    pub line_one: String,
    #[validate(length(max = 255))]
    pub line_two: Option<String>,
    #[validate(length(min = 1, max = 128))]
    pub city: String,
    #[validate(length(min = 1, max = 128))]
    pub province: String,
    #[validate(length(min = 1, max = 128))]
    pub country: String,
    #[validate(length(min = 1, max = 16))]
    pub zip_code: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_camel_case_round_trip_and_validation() {
        let address: Address = serde_json::from_value(json!({
            "lineOne": "12 Long Street",
            "lineTwo": null,
            "city": "Cape Town",
            "province": "Western Cape",
            "country": "South Africa",
            "zipCode": "8001"
        }))
        .unwrap();
        assert!(address.validate().is_ok());
        assert_eq!(serde_json::to_value(&address).unwrap()["zipCode"], "8001");

        let blank = Address {
            city: String::new(),
            ..address
        };
        assert!(blank.validate().is_err());
    }
}
