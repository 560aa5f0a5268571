//! RFC 6238 time-based one-time passwords (HMAC-SHA1, 30 second step,
//! 6 digits), as produced by Google Authenticator and similar apps.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

pub const SECRET_BYTES: usize = 20;
pub const STEP_SECONDS: i64 = 30;
pub const DIGITS: u32 = 6;
/// Steps accepted on either side of the current one.
pub const ALLOWED_SKEW: i64 = 1;
pub const ISSUER: &str = "HK Doctor Match";

const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Unpadded RFC 4648 base32.
pub fn base32_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(5) * 8);
    let mut buffer: u32 = 0;
    let mut bits = 0;

    for &byte in bytes {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(BASE32_ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
        }
    }
    if bits > 0 {
        out.push(BASE32_ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize] as char);
    }
    out
}

/// Accepts lower case, spaces and trailing padding.
pub fn base32_decode(text: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits = 0;

    for c in text.chars().filter(|c| !c.is_whitespace() && *c != '=') {
        let upper = c.to_ascii_uppercase() as u8;
        let value = BASE32_ALPHABET.iter().position(|&a| a == upper)? as u32;
        buffer = (buffer << 5) | value;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push(((buffer >> bits) & 0xff) as u8);
        }
    }
    Some(out)
}

pub fn generate_secret() -> String {
    let mut secret = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut secret);
    base32_encode(&secret)
}

fn hotp(key: &[u8], counter: u64) -> Option<u32> {
    let mut mac = HmacSha1::new_from_slice(key).ok()?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = (u32::from(digest[offset]) & 0x7f) << 24
        | u32::from(digest[offset + 1]) << 16
        | u32::from(digest[offset + 2]) << 8
        | u32::from(digest[offset + 3]);

    Some(binary % 10u32.pow(DIGITS))
}

/// The code for `secret` at `at`, zero padded.
pub fn code_at(secret: &str, at: DateTime<Utc>) -> Option<String> {
    let key = base32_decode(secret)?;
    let counter = at.timestamp().div_euclid(STEP_SECONDS);
    let code = hotp(&key, u64::try_from(counter).ok()?)?;
    Some(format!("{:0width$}", code, width = DIGITS as usize))
}

pub fn verify(secret: &str, code: &str, at: DateTime<Utc>) -> bool {
    let code = code.trim();
    if code.len() != DIGITS as usize || !code.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let Some(key) = base32_decode(secret) else {
        return false;
    };

    let current = at.timestamp().div_euclid(STEP_SECONDS);
    (current - ALLOWED_SKEW..=current + ALLOWED_SKEW)
        .filter_map(|counter| u64::try_from(counter).ok())
        .filter_map(|counter| hotp(&key, counter))
        .any(|candidate| format!("{:0width$}", candidate, width = DIGITS as usize) == code)
}

pub fn provisioning_uri(secret: &str, account: &str) -> String {
    format!(
        "otpauth://totp/{issuer}:{account}?secret={secret}&issuer={issuer}&algorithm=SHA1&digits={digits}&period={period}",
        issuer = urlencoding::encode(ISSUER),
        account = urlencoding::encode(account),
        secret = secret,
        digits = DIGITS,
        period = STEP_SECONDS,
    )
}
