//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing admin ids with application ids. Both are strings: admin
//! ids are operator-visible routing keys, and application ids double as the
//! applicant's capability token.

use uuid::Uuid;

/// Macro to define a type-safe, string-backed ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Into<String>` implementations
/// - `sqlx` `Type`, `Encode`, and `Decode` implementations (with `postgres` feature)
///
/// # Example
///
/// ```rust
/// # use verifydesk_core::define_id;
/// define_id!(ReviewerId);
/// define_id!(TicketId);
///
/// let reviewer = ReviewerId::new("R-1");
/// let ticket = TicketId::new("R-1");
///
/// // These are different types, so this won't compile:
/// // let _: ReviewerId = ticket;
/// assert_eq!(reviewer.as_str(), ticket.as_str());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the ID as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <String as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <String as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let id = <String as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(Self(id))
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <String as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

define_id!(AdminId);
define_id!(ApplicationId);

/// Length of the random suffix of generated admin ids.
const ADMIN_ID_SUFFIX_LEN: usize = 10;

impl AdminId {
    /// Generate a fresh admin id of the form `ADM-XXXXXXXXXX`.
    ///
    /// Operators may also pick their own ids; this is only used when none
    /// is supplied.
    #[must_use]
    pub fn generate() -> Self {
        let suffix: String = Uuid::new_v4()
            .simple()
            .to_string()
            .to_ascii_uppercase()
            .chars()
            .take(ADMIN_ID_SUFFIX_LEN)
            .collect();
        Self(format!("ADM-{suffix}"))
    }
}

impl ApplicationId {
    /// Generate a fresh application id of the form `APP-<uuid v7>`.
    ///
    /// UUID v7 is time-ordered and still carries 74 random bits, which is
    /// what lets the id serve as the applicant's only credential for the
    /// status endpoints.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("APP-{}", Uuid::now_v7().simple()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_application_ids_are_unique_and_prefixed() {
        let a = ApplicationId::generate();
        let b = ApplicationId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("APP-"));
        assert_eq!(a.as_str().len(), 4 + 32);
    }

    #[test]
    fn test_generated_application_ids_are_time_ordered() {
        let first = ApplicationId::generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = ApplicationId::generate();
        assert!(first < second);
    }

    #[test]
    fn test_generated_admin_id_shape() {
        let id = AdminId::generate();
        assert!(id.as_str().starts_with("ADM-"));
        assert_eq!(id.as_str().len(), 4 + ADMIN_ID_SUFFIX_LEN);
    }

    #[test]
    fn test_id_serde_is_transparent() {
        let id = AdminId::new("ADM-alice");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"ADM-alice\"");
    }
}
