//! Request signing for the ledger node's REST gateway

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::common::errors::{RelayError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Decode hex signing-key material, with or without a `0x` prefix
pub fn decode_key_material(material: &str) -> Result<Vec<u8>> {
    let trimmed = material.trim().trim_start_matches("0x");
    if trimmed.is_empty() {
        return Err(RelayError::Configuration("Empty signing key".to_string()));
    }
    hex::decode(trimmed)
        .map_err(|e| RelayError::Configuration(format!("Signing key is not hex: {}", e)))
}

/// Generate HMAC-SHA256 signature for a ledger request
///
/// # Arguments
/// * `key_material` - Sender's signing-key material (hex)
/// * `timestamp` - Unix timestamp in seconds
/// * `method` - HTTP method (GET, POST, etc.)
/// * `request_path` - API endpoint path
/// * `body` - Request body (empty string for GET requests)
pub fn sign_request(
    key_material: &str,
    timestamp: i64,
    method: &str,
    request_path: &str,
    body: &str,
) -> Result<String> {
    let key_bytes = decode_key_material(key_material)?;

    // timestamp + method + path + body
    let message = format!("{}{}{}{}", timestamp, method.to_uppercase(), request_path, body);

    let mut mac = HmacSha256::new_from_slice(&key_bytes)
        .map_err(|e| RelayError::Internal(format!("Failed to create HMAC: {}", e)))?;
    mac.update(message.as_bytes());

    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// Generate authentication headers for a ledger request
pub fn generate_auth_headers(
    sender: &str,
    key_material: &str,
    method: &str,
    request_path: &str,
    body: &str,
) -> Result<AuthHeaders> {
    let timestamp = chrono::Utc::now().timestamp();
    let signature = sign_request(key_material, timestamp, method, request_path, body)?;

    Ok(AuthHeaders {
        sender: sender.to_string(),
        signature,
        timestamp,
    })
}

/// Authentication headers for ledger requests
#[derive(Debug, Clone)]
pub struct AuthHeaders {
    pub sender: String,
    pub signature: String,
    pub timestamp: i64,
}

impl AuthHeaders {
    /// Add authentication headers to a reqwest RequestBuilder
    pub fn apply_to_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("X-Ledger-Sender", &self.sender)
            .header("X-Ledger-Signature", &self.signature)
            .header("X-Ledger-Timestamp", self.timestamp.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_request_format() {
        let result = sign_request("0x0badc0ffee", 1714564800, "post", "/v1/transactions", "{}");

        assert!(result.is_ok());
        let signature = result.unwrap();
        assert!(BASE64.decode(&signature).is_ok());
        assert_eq!(BASE64.decode(&signature).unwrap().len(), 32);
    }

    #[test]
    fn test_signature_depends_on_body() {
        let a = sign_request("0badc0ffee", 1, "POST", "/v1/transactions", "{\"a\":1}").unwrap();
        let b = sign_request("0badc0ffee", 1, "POST", "/v1/transactions", "{\"a\":2}").unwrap();
        assert_ne!(a, b);
        // Prefix and case of the method do not matter
        let c = sign_request("0x0badc0ffee", 1, "post", "/v1/transactions", "{\"a\":1}").unwrap();
        assert_eq!(a, c);
    }

    #[test]
    fn test_invalid_key_material() {
        assert!(sign_request("not-hex", 1, "POST", "/", "").is_err());
        assert!(sign_request("0x", 1, "POST", "/", "").is_err());
    }

    #[test]
    fn test_generate_auth_headers() {
        let headers =
            generate_auth_headers("0xabc", "0badc0ffee", "POST", "/v1/transactions", "").unwrap();
        assert_eq!(headers.sender, "0xabc");
        assert!(!headers.signature.is_empty());
        assert!(headers.timestamp > 0);
    }
}
