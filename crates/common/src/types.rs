use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stock-keeping unit code identifying a single purchasable variant.
///
/// Wraps the SKU string to prevent mixing it up with other string-based
/// identifiers such as session tokens or payment references.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sku(String);

impl Sku {
    /// Creates a SKU from any string-like value.
    pub fn new(sku: impl Into<String>) -> Self {
        Self(sku.into())
    }

    /// Returns the SKU code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Sku {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Sku {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Sku {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for Sku {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Storage-assigned identifier for a shopping session row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(i64);

impl SessionId {
    /// Creates a session ID from a raw row identifier.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw row identifier.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for SessionId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Opaque token identifying a shopping session, carried by a client cookie.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Creates a token from any string-like value.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Generates a fresh random token.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Payment reference grouping all reservations touched by one checkout pass.
///
/// A fresh reference is minted per coordination attempt and handed to the
/// payment gateway, so a later confirmation or release can find exactly the
/// rows that attempt produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckoutRef(String);

impl CheckoutRef {
    /// Creates a reference from an existing string.
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Mints a fresh random reference.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the reference as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CheckoutRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CheckoutRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_ref_generate_creates_unique_references() {
        let r1 = CheckoutRef::generate();
        let r2 = CheckoutRef::generate();
        assert_ne!(r1, r2);
    }

    #[test]
    fn session_token_generate_creates_unique_tokens() {
        let t1 = SessionToken::generate();
        let t2 = SessionToken::generate();
        assert_ne!(t1, t2);
    }

    #[test]
    fn sku_serialization_is_transparent() {
        let sku = Sku::new("SKU-001");
        let json = serde_json::to_string(&sku).unwrap();
        assert_eq!(json, "\"SKU-001\"");
        let back: Sku = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sku);
    }

    #[test]
    fn session_id_preserves_value() {
        let id = SessionId::new(42);
        assert_eq!(id.as_i64(), 42);
        assert_eq!(id, SessionId::from(42));
    }
}
