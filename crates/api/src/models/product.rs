//! Catalog domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shopfront_core::{MAX_MONEY, ProductId, fits_money_column, round_money};

/// A catalog product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub brand: String,
    pub category: String,
    pub price: Decimal,
    pub stock: i32,
    pub image_url: Option<String>,
    pub tags: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Catalog sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

impl ProductSort {
    /// SQL `ORDER BY` clause. The id tiebreaker keeps pagination stable.
    #[must_use]
    pub const fn order_by(self) -> &'static str {
        match self {
            Self::Newest => "created_at DESC, id DESC",
            Self::PriceAsc => "price ASC, id ASC",
            Self::PriceDesc => "price DESC, id DESC",
            Self::Name => "LOWER(name) ASC, id ASC",
        }
    }
}

/// Admin create/update payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub category: String,
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

impl ProductInput {
    pub const MAX_NAME_LENGTH: usize = 200;

    /// Trim text fields, fill in the slug, and check value ranges.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first invalid field.
    pub fn validated(self) -> Result<Self, String> {
        let name = self.name.trim().to_owned();
        if name.is_empty() {
            return Err("name is required".to_owned());
        }
        if name.chars().count() > Self::MAX_NAME_LENGTH {
            return Err(format!(
                "name must be at most {} characters",
                Self::MAX_NAME_LENGTH
            ));
        }
        if self.price.is_sign_negative() {
            return Err("price must not be negative".to_owned());
        }
        if !fits_money_column(self.price) {
            return Err(format!("price must not exceed {MAX_MONEY}"));
        }
        if self.stock < 0 {
            return Err("stock must not be negative".to_owned());
        }

        // Names without ASCII letters or digits (e.g. CJK) get a generated slug
        let slug = [self.slug.as_deref(), Some(name.as_str())]
            .into_iter()
            .flatten()
            .map(slugify)
            .find(|slug| !slug.is_empty())
            .unwrap_or_else(generated_slug);

        let mut tags: Vec<String> = Vec::with_capacity(self.tags.len());
        for tag in self.tags {
            let tag = tag.trim().to_lowercase();
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }

        Ok(Self {
            name,
            slug: Some(slug),
            description: self.description.trim().to_owned(),
            brand: self.brand.trim().to_owned(),
            category: self.category.trim().to_owned(),
            price: round_money(self.price),
            stock: self.stock,
            image_url: self
                .image_url
                .map(|u| u.trim().to_owned())
                .filter(|u| !u.is_empty()),
            tags,
            is_active: self.is_active,
        })
    }

    /// The slug after validation.
    #[must_use]
    pub fn slug(&self) -> &str {
        self.slug.as_deref().unwrap_or_default()
    }
}

fn generated_slug() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("product-{}", id.get(..8).unwrap_or(&id))
}

/// Build a URL slug: lowercase ASCII letters and digits separated by single hyphens.
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input(name: &str) -> ProductInput {
        ProductInput {
            name: name.to_owned(),
            slug: None,
            description: String::new(),
            brand: String::new(),
            category: String::new(),
            price: Decimal::new(1999, 2),
            stock: 3,
            image_url: None,
            tags: Vec::new(),
            is_active: true,
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Trail Runner 2 (Blue)"), "trail-runner-2-blue");
        assert_eq!(slugify("  --Hello,  World!-- "), "hello-world");
        assert_eq!(slugify("Café Crème"), "caf-cr-me");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_validated_generates_slug_from_name() {
        let product = input("  Wool Socks ").validated().unwrap();
        assert_eq!(product.name, "Wool Socks");
        assert_eq!(product.slug(), "wool-socks");
    }

    #[test]
    fn test_validated_normalizes_explicit_slug_and_tags() {
        let mut raw = input("Socks");
        raw.slug = Some("Winter Socks".to_owned());
        raw.tags = vec!["Wool".to_owned(), " wool ".to_owned(), String::new()];
        let product = raw.validated().unwrap();
        assert_eq!(product.slug(), "winter-socks");
        assert_eq!(product.tags, vec!["wool".to_owned()]);
    }

    #[test]
    fn test_validated_rejects_bad_values() {
        assert!(input("   ").validated().is_err());

        let mut negative_price = input("Socks");
        negative_price.price = Decimal::new(-1, 0);
        assert!(negative_price.validated().is_err());

        let mut negative_stock = input("Socks");
        negative_stock.stock = -1;
        assert!(negative_stock.validated().is_err());
    }

    #[test]
    fn test_validated_caps_price_at_column_size() {
        let mut huge = input("Yacht");
        huge.price = Decimal::new(10_000_000_000_000, 0);
        assert_eq!(
            huge.validated().unwrap_err(),
            "price must not exceed 9999999999.99"
        );

        let mut largest = input("Yacht");
        largest.price = MAX_MONEY;
        assert_eq!(largest.validated().unwrap().price, MAX_MONEY);
    }

    #[test]
    fn test_validated_rounds_price_half_away_from_zero() {
        let mut raw = input("Socks");
        raw.price = Decimal::new(1_005, 3);
        assert_eq!(raw.validated().unwrap().price, Decimal::new(1_01, 2));
    }

    #[test]
    fn test_validated_generates_slug_for_non_ascii_names() {
        let product = input("抹茶").validated().unwrap();
        let slug = product.slug();
        assert!(slug.starts_with("product-"), "{slug}");
        assert_eq!(slug.len(), "product-".len() + 8);

        // An unusable explicit slug falls back to the name
        let mut raw = input("Wool Socks");
        raw.slug = Some("!!!".to_owned());
        assert_eq!(raw.validated().unwrap().slug(), "wool-socks");
    }

    #[test]
    fn test_sort_deserializes_snake_case() {
        let sort: ProductSort = serde_json::from_str("\"price_desc\"").unwrap();
        assert_eq!(sort, ProductSort::PriceDesc);
    }
}
