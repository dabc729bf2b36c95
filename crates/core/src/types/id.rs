//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers so an owner ID
//! can never be passed where a member ID is expected.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i64` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_i64()`
/// - `Display` and `FromStr`, so IDs render directly into URL path segments
///   and parse from command-line arguments
/// - `From<i64>` and `Into<i64>` implementations
///
/// # Example
///
/// ```rust
/// # use storefront_sync_core::define_id;
/// define_id!(WishlistId);
/// define_id!(ShelfId);
///
/// let wishlist = WishlistId::new(1);
/// let shelf: ShelfId = "1".parse().unwrap();
///
/// assert_eq!(wishlist.as_i64(), shelf.as_i64());
/// // These are different types, so this won't compile:
/// // let _: WishlistId = shelf;
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
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Create a new ID from an i64 value.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the underlying i64 value.
            #[must_use]
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// The signed-in user a collection is scoped to.
define_id!(OwnerId);
// A product (or other item) tracked inside a collection.
define_id!(MemberId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_bare_number() {
        assert_eq!(MemberId::new(42).to_string(), "42");
        assert_eq!(OwnerId::new(-7).to_string(), "-7");
    }

    #[test]
    fn test_from_str_trims_whitespace() {
        let id: MemberId = " 17 ".parse().unwrap();
        assert_eq!(id, MemberId::new(17));
    }

    #[test]
    fn test_from_str_rejects_garbage() {
        assert!("p1".parse::<MemberId>().is_err());
        assert!("".parse::<OwnerId>().is_err());
    }

    #[test]
    fn test_serde_is_transparent() {
        let json = serde_json::to_string(&OwnerId::new(9)).unwrap();
        assert_eq!(json, "9");

        let parsed: OwnerId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, OwnerId::new(9));
    }
}
