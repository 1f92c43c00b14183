//! PKCE (Proof Key for Code Exchange) parameter generation per RFC 7636
//!
//! Produces the random `state`/`nonce`/verifier strings used during the
//! authorization flow and derives the S256 code challenge. The verifier is
//! persisted locally and sent during token exchange; the challenge is
//! included in the authorization URL so the authorization server can verify
//! the exchange request came from the same party that initiated the flow.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use sha2::{Digest, Sha256};

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Generate a cryptographically random alphanumeric string of exactly
/// `len` characters.
///
/// Draws from the OS RNG; a machine that cannot provide entropy cannot
/// mint security tokens, so failure there panics rather than degrading.
/// Bytes are rejection-sampled against the alphabet so every character
/// is uniformly distributed.
pub fn random_string(len: usize) -> String {
    let mut rng = rand::rng();
    let mut out = String::with_capacity(len);
    let mut buf = [0u8; 64];
    while out.len() < len {
        rng.fill(&mut buf);
        for &b in &buf {
            // 248 = 4 * 62; bytes at or above it would skew the modulo
            if b >= 248 {
                continue;
            }
            out.push(ALPHABET[(b % 62) as usize] as char);
            if out.len() == len {
                break;
            }
        }
    }
    out
}

/// Compute the S256 code challenge from a verifier.
///
/// `challenge = BASE64URL(SHA256(verifier))`, no padding.
///
/// Deterministic for a given verifier, which is what lets the
/// authorization server match the challenge from the authorization URL
/// against the verifier sent during token exchange.
pub fn code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}
