//! Database keys.
//!
//! Every table uses a `SERIAL` primary key. Each entity gets its own `i32`
//! wrapper so a product ID can't be passed where an order ID is expected.

/// Declare an ID type for one entity.
///
/// The generated type is `Copy`, serializes as a bare number, parses from a
/// string (JWT subjects are strings) and, with the `postgres` feature, binds
/// and decodes as an `INTEGER` column.
///
/// ```rust
/// # use shopfront_core::define_id;
/// define_id!(WishlistId);
///
/// let id: WishlistId = "17".parse().unwrap();
/// assert_eq!(id.as_i32(), 17);
/// assert_eq!(serde_json::to_string(&id).unwrap(), "17");
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[cfg_attr(feature = "postgres", derive(::sqlx::Type))]
        #[cfg_attr(feature = "postgres", sqlx(transparent))]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            #[must_use]
            pub const fn as_i32(self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }
    };
}

define_id!(UserId);
define_id!(ProductId);
define_id!(OrderId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let id: ProductId = " 42 ".parse().unwrap();
        assert_eq!(id, ProductId::new(42));
        assert_eq!(id.to_string(), "42");
        assert!("forty-two".parse::<ProductId>().is_err());
    }

    #[test]
    fn test_serializes_as_number() {
        let id = OrderId::new(7);
        assert_eq!(serde_json::to_string(&id).unwrap(), "7");
        assert_eq!(serde_json::from_str::<OrderId>("7").unwrap(), id);
    }

    #[test]
    fn test_ids_sort_numerically() {
        let mut ids = vec![UserId::new(10), UserId::new(2), UserId::new(33)];
        ids.sort();
        assert_eq!(ids, vec![UserId::new(2), UserId::new(10), UserId::new(33)]);
    }
}
