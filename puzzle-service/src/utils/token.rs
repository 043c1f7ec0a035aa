use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::models::{IssuedToken, Token, TokenScope};

/// Random bytes per token; the hex plaintext is twice this long.
pub const TOKEN_BYTES: usize = 32;

/// Mint a token for `user_id`. The plaintext goes to the client, the
/// [`Token`] (hash only) goes to the store.
pub fn generate_token(user_id: i64, ttl: Duration, scope: TokenScope) -> (IssuedToken, Token) {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    let plaintext = hex::encode(bytes);
    let expiry = Utc::now() + ttl;

    let token = Token {
        hash: hash_token(&plaintext),
        user_id,
        expiry,
        scope,
    };

    (
        IssuedToken {
            token: plaintext,
            expiry,
        },
        token,
    )
}

pub fn hash_token(plaintext: &str) -> Vec<u8> {
    Sha256::digest(plaintext.as_bytes()).to_vec()
}

/// Shape check applied before any store lookup.
pub fn is_well_formed(plaintext: &str) -> bool {
    plaintext.len() == TOKEN_BYTES * 2 && plaintext.bytes().all(|b| b.is_ascii_hexdigit())
}
