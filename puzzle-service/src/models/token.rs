//! Opaque bearer tokens. Only the SHA-256 of the plaintext is ever stored.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenScope {
    Authentication,
}

impl TokenScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenScope::Authentication => "authentication",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub hash: Vec<u8>,
    pub user_id: i64,
    pub expiry: DateTime<Utc>,
    pub scope: TokenScope,
}

impl Token {
    pub fn is_valid_at(&self, scope: TokenScope, now: DateTime<Utc>) -> bool {
        self.scope == scope && now < self.expiry
    }
}

/// The plaintext half of a freshly issued token, shown to the client once.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expiry: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_valid_until_expiry() {
        let now = Utc::now();
        let token = Token {
            hash: vec![0; 32],
            user_id: 1,
            expiry: now + Duration::seconds(1),
            scope: TokenScope::Authentication,
        };

        assert!(token.is_valid_at(TokenScope::Authentication, now));
        assert!(!token.is_valid_at(TokenScope::Authentication, token.expiry));
        assert!(!token.is_valid_at(TokenScope::Authentication, now + Duration::seconds(2)));
    }
}
