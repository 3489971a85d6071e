//! Chat endpoint type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`ChatEndpoint`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    /// The input string is empty (after trimming).
    #[error("chat endpoint cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("chat endpoint must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains whitespace or control characters.
    #[error("chat endpoint must not contain whitespace or control characters")]
    InvalidCharacter,
}

/// An opaque address on the chat transport where an admin can be reached.
///
/// For Slack this is a user id (`U0123ABC`), for Telegram a chat id
/// (`123456789`). The core never interprets it beyond these constraints:
///
/// - Length: 1-128 characters after trimming surrounding whitespace
/// - No inner whitespace or control characters
///
/// ## Examples
///
/// ```
/// use verifydesk_core::ChatEndpoint;
///
/// assert!(ChatEndpoint::parse("U0123ABC").is_ok());
/// assert!(ChatEndpoint::parse(" 123456789 ").is_ok());
///
/// assert!(ChatEndpoint::parse("").is_err());
/// assert!(ChatEndpoint::parse("two words").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ChatEndpoint(String);

impl ChatEndpoint {
    /// Maximum length of an endpoint.
    pub const MAX_LENGTH: usize = 128;

    /// Parse a `ChatEndpoint` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, longer than 128
    /// characters, or contains whitespace/control characters.
    pub fn parse(s: &str) -> Result<Self, EndpointError> {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(EndpointError::Empty);
        }

        if trimmed.chars().count() > Self::MAX_LENGTH {
            return Err(EndpointError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if trimmed
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(EndpointError::InvalidCharacter);
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the endpoint as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the endpoint and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ChatEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ChatEndpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for ChatEndpoint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for ChatEndpoint {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for ChatEndpoint {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(&s)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for ChatEndpoint {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_surrounding_whitespace() {
        let endpoint = ChatEndpoint::parse("  987654321\n").expect("valid endpoint");
        assert_eq!(endpoint.as_str(), "987654321");
    }

    #[test]
    fn test_parse_rejects_empty_and_blank() {
        assert_eq!(ChatEndpoint::parse(""), Err(EndpointError::Empty));
        assert_eq!(ChatEndpoint::parse("   "), Err(EndpointError::Empty));
    }

    #[test]
    fn test_parse_rejects_inner_whitespace() {
        assert_eq!(
            ChatEndpoint::parse("U01 23"),
            Err(EndpointError::InvalidCharacter)
        );
    }

    #[test]
    fn test_parse_rejects_too_long() {
        let long = "9".repeat(ChatEndpoint::MAX_LENGTH + 1);
        assert!(matches!(
            ChatEndpoint::parse(&long),
            Err(EndpointError::TooLong { .. })
        ));
    }

    #[test]
    fn test_negative_telegram_group_ids_are_allowed() {
        assert!(ChatEndpoint::parse("-1001234567890").is_ok());
    }
}
