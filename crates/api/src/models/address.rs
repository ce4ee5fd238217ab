//! Shipping address document.

use serde::{Deserialize, Serialize};

/// A postal address, stored as JSONB on users (default address) and orders (snapshot).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl ShippingAddress {
    /// Maximum length of any single field.
    pub const MAX_FIELD_LENGTH: usize = 200;

    /// Trim every field, drop empty optionals, and check required fields.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first missing or oversized field.
    pub fn normalized(self) -> Result<Self, String> {
        let address = Self {
            full_name: self.full_name.trim().to_owned(),
            line1: self.line1.trim().to_owned(),
            line2: trim_optional(self.line2),
            city: self.city.trim().to_owned(),
            state: trim_optional(self.state),
            postal_code: self.postal_code.trim().to_owned(),
            country: self.country.trim().to_owned(),
            phone: trim_optional(self.phone),
        };

        for (field, value) in [
            ("full_name", address.full_name.as_str()),
            ("line1", address.line1.as_str()),
            ("city", address.city.as_str()),
            ("postal_code", address.postal_code.as_str()),
            ("country", address.country.as_str()),
        ] {
            if value.is_empty() {
                return Err(format!("shipping address {field} is required"));
            }
        }

        let optional = [&address.line2, &address.state, &address.phone];
        let too_long = [
            &address.full_name,
            &address.line1,
            &address.city,
            &address.postal_code,
            &address.country,
        ]
        .into_iter()
        .chain(optional.into_iter().flatten())
        .any(|value| value.chars().count() > Self::MAX_FIELD_LENGTH);

        if too_long {
            return Err(format!(
                "shipping address fields must be at most {} characters",
                Self::MAX_FIELD_LENGTH
            ));
        }

        Ok(address)
    }
}

fn trim_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: " Ada Lovelace ".to_string(),
            line1: "12 St James's Square".to_string(),
            line2: Some("  ".to_string()),
            city: "London".to_string(),
            state: None,
            postal_code: "SW1Y 4JH".to_string(),
            country: "GB".to_string(),
            phone: None,
        }
    }

    #[test]
    fn test_normalized_trims_and_drops_blank_optionals() {
        let normalized = address().normalized().unwrap();
        assert_eq!(normalized.full_name, "Ada Lovelace");
        assert_eq!(normalized.line2, None);
    }

    #[test]
    fn test_normalized_requires_fields() {
        let mut missing_city = address();
        missing_city.city = "   ".to_string();
        let err = missing_city.normalized().unwrap_err();
        assert!(err.contains("city"));
    }

    #[test]
    fn test_normalized_rejects_oversized_fields() {
        let mut long = address();
        long.line1 = "x".repeat(ShippingAddress::MAX_FIELD_LENGTH + 1);
        assert!(long.normalized().is_err());
    }
}
