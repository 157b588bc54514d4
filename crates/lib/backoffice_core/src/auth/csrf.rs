//! Anti-CSRF nonce generation.
//!
//! The nonce is embedded in the access token and handed to the client in the
//! response body; unsafe requests must echo it in `x-csrf-token`.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;

/// Random bytes per nonce.
const NONCE_BYTES: usize = 24;

/// Generate a fresh nonce (24 random bytes, base64url without padding).
pub fn new_csrf_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
