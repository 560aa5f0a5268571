//! HS256 session tokens for admin panel and doctor portal accounts.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

use shared_models::auth::{AuthUser, SessionClaims, SessionHeader};

type HmacSha256 = Hmac<Sha256>;

fn sign(signing_input: &str, secret: &str) -> Result<String, String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(signing_input.as_bytes());
    Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
}

/// Issue a signed token for `user` valid for `ttl_hours`.
pub fn issue_token(user: &AuthUser, secret: &str, ttl_hours: i64) -> Result<(String, chrono::DateTime<Utc>), String> {
    if secret.is_empty() {
        return Err("Session secret is not set".to_string());
    }

    let now = Utc::now();
    let expires_at = now + Duration::hours(ttl_hours);

    let header = SessionHeader {
        alg: "HS256".to_string(),
        typ: "JWT".to_string(),
    };
    let claims = SessionClaims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        role: user.role,
        doctor_id: user.doctor_id,
        exp: expires_at.timestamp().max(0) as u64,
        iat: now.timestamp().max(0) as u64,
    };

    let header_json = serde_json::to_string(&header).map_err(|e| e.to_string())?;
    let claims_json = serde_json::to_string(&claims).map_err(|e| e.to_string())?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_json),
        URL_SAFE_NO_PAD.encode(claims_json)
    );
    let signature = sign(&signing_input, secret)?;

    Ok((format!("{}.{}", signing_input, signature), expires_at))
}

pub fn validate_token(token: &str, secret: &str) -> Result<AuthUser, String> {
    if secret.is_empty() {
        return Err("Session secret is not set".to_string());
    }

    // Split token into parts
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err("Invalid token format".to_string());
    }

    let header_b64 = parts[0];
    let claims_b64 = parts[1];
    let signature_b64 = parts[2];

    let signature = match URL_SAFE_NO_PAD.decode(signature_b64) {
        Ok(sig) => sig,
        Err(e) => {
            debug!("Failed to decode signature: {}", e);
            return Err("Invalid signature encoding".to_string());
        }
    };

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(format!("{}.{}", header_b64, claims_b64).as_bytes());

    if mac.verify_slice(&signature).is_err() {
        debug!("Token signature verification failed");
        return Err("Invalid token signature".to_string());
    }

    let claims_json = URL_SAFE_NO_PAD
        .decode(claims_b64)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| "Invalid claims encoding".to_string())?;

    let claims: SessionClaims = match serde_json::from_str(&claims_json) {
        Ok(c) => c,
        Err(e) => {
            debug!("Failed to parse claims: {}", e);
            return Err("Invalid claims format".to_string());
        }
    };

    let now = Utc::now().timestamp().max(0) as u64;
    if claims.exp < now {
        debug!("Token expired at {} (now: {})", claims.exp, now);
        return Err("Token expired".to_string());
    }

    let id: i64 = claims
        .sub
        .parse()
        .map_err(|_| "Invalid subject".to_string())?;

    let user = AuthUser {
        id,
        username: claims.username,
        role: claims.role,
        doctor_id: claims.doctor_id,
        issued_at: Utc.timestamp_opt(claims.iat as i64, 0).single(),
    };

    debug!("Token validated successfully for user: {}", user.username);
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_models::auth::AdminRole;

    fn user() -> AuthUser {
        AuthUser {
            id: 7,
            username: "alice".to_string(),
            role: AdminRole::Admin,
            doctor_id: None,
            issued_at: None,
        }
    }

    #[test]
    fn issued_token_validates() {
        let (token, expires_at) = issue_token(&user(), "secret", 1).unwrap();
        assert!(expires_at > Utc::now());

        let validated = validate_token(&token, "secret").unwrap();
        assert_eq!(validated.id, 7);
        assert_eq!(validated.username, "alice");
        assert_eq!(validated.role, AdminRole::Admin);
    }

    #[test]
    fn rejects_wrong_secret() {
        let (token, _) = issue_token(&user(), "secret", 1).unwrap();
        assert_eq!(validate_token(&token, "other").unwrap_err(), "Invalid token signature");
    }

    #[test]
    fn rejects_expired_token() {
        let (token, _) = issue_token(&user(), "secret", -1).unwrap();
        assert_eq!(validate_token(&token, "secret").unwrap_err(), "Token expired");
    }

    #[test]
    fn rejects_malformed_token() {
        assert_eq!(validate_token("not-a-token", "secret").unwrap_err(), "Invalid token format");
        assert!(issue_token(&user(), "", 1).is_err());
    }
}
