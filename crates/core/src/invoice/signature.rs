//! Signer input for the public sign action.

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::token::hash_bytes;

/// Longest signer name or email the store accepts, in characters.
pub const MAX_SIGNER_FIELD_LEN: usize = 255;

/// Longest textual IP address (IPv6 with an embedded IPv4 tail).
pub const MAX_IP_ADDRESS_LEN: usize = 45;

/// Details submitted with a SIGN token.
///
/// `signature_image` is already normalized (PNG, non-blank, size-capped) and
/// `signed_document` is the rendered document the signer acknowledged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInput {
    /// Signer's full name.
    pub signer_name: String,
    /// Signer's email.
    pub signer_email: String,
    /// Explicit acknowledgement checkbox.
    pub acknowledge: bool,
    /// Normalized signature image.
    pub signature_image: Vec<u8>,
    /// Rendered signed document.
    pub signed_document: Vec<u8>,
    /// Requester IP, if known.
    pub ip_address: Option<String>,
    /// Requester user agent, if known.
    pub user_agent: Option<String>,
}

/// Signer fields after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSignature {
    /// Trimmed name.
    pub signer_name: String,
    /// Trimmed email.
    pub signer_email: String,
    /// SHA-256 hex of the signed document.
    pub document_hash: String,
}

/// Validates signer input and hashes the signed document.
pub fn validate_signature(input: &SignInput) -> Result<ValidatedSignature, LedgerError> {
    let signer_name = input.signer_name.trim();
    let signer_email = input.signer_email.trim();

    if signer_name.is_empty() {
        return Err(LedgerError::validation("signer name is required"));
    }
    if signer_name.chars().count() > MAX_SIGNER_FIELD_LEN {
        return Err(LedgerError::validation(format!(
            "signer name must be at most {MAX_SIGNER_FIELD_LEN} characters"
        )));
    }
    if !is_plausible_email(signer_email) {
        return Err(LedgerError::validation("a valid signer email is required"));
    }
    if signer_email.chars().count() > MAX_SIGNER_FIELD_LEN {
        return Err(LedgerError::validation(format!(
            "signer email must be at most {MAX_SIGNER_FIELD_LEN} characters"
        )));
    }
    if input
        .ip_address
        .as_deref()
        .is_some_and(|ip| ip.chars().count() > MAX_IP_ADDRESS_LEN)
    {
        return Err(LedgerError::validation(format!(
            "ip address must be at most {MAX_IP_ADDRESS_LEN} characters"
        )));
    }
    if !input.acknowledge {
        return Err(LedgerError::validation("acknowledgement is required"));
    }
    if input.signature_image.is_empty() {
        return Err(LedgerError::validation("signature image is required"));
    }
    if input.signed_document.is_empty() {
        return Err(LedgerError::validation("signed document is required"));
    }

    Ok(ValidatedSignature {
        signer_name: signer_name.to_string(),
        signer_email: signer_email.to_string(),
        document_hash: hash_bytes(&input.signed_document),
    })
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> SignInput {
        SignInput {
            signer_name: " Jane Client ".to_string(),
            signer_email: "jane@example.com".to_string(),
            acknowledge: true,
            signature_image: vec![0x89, b'P', b'N', b'G'],
            signed_document: b"%PDF-1.7 signed".to_vec(),
            ip_address: Some("203.0.113.7".to_string()),
            user_agent: None,
        }
    }

    #[test]
    fn test_valid_signature() {
        let validated = validate_signature(&input()).unwrap();
        assert_eq!(validated.signer_name, "Jane Client");
        assert_eq!(validated.document_hash, hash_bytes(b"%PDF-1.7 signed"));
        assert_eq!(validated.document_hash.len(), 64);
    }

    #[test]
    fn test_rejects_missing_fields() {
        let mut no_name = input();
        no_name.signer_name = "  ".to_string();
        assert!(validate_signature(&no_name).is_err());

        let mut bad_email = input();
        bad_email.signer_email = "not-an-email".to_string();
        assert!(validate_signature(&bad_email).is_err());

        let mut no_ack = input();
        no_ack.acknowledge = false;
        assert!(validate_signature(&no_ack).is_err());

        let mut no_image = input();
        no_image.signature_image.clear();
        assert!(validate_signature(&no_image).is_err());
    }

    #[test]
    fn test_rejects_oversized_fields() {
        let mut long_name = input();
        long_name.signer_name = "n".repeat(MAX_SIGNER_FIELD_LEN + 1);
        assert!(matches!(
            validate_signature(&long_name),
            Err(LedgerError::Validation(_))
        ));

        let mut long_email = input();
        long_email.signer_email = format!("{}@example.com", "e".repeat(MAX_SIGNER_FIELD_LEN));
        assert!(matches!(
            validate_signature(&long_email),
            Err(LedgerError::Validation(_))
        ));

        let mut long_ip = input();
        long_ip.ip_address = Some("1".repeat(MAX_IP_ADDRESS_LEN + 1));
        assert!(matches!(
            validate_signature(&long_ip),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn test_accepts_fields_at_their_limit() {
        let mut at_limit = input();
        at_limit.signer_name = format!(" {} ", "ñ".repeat(MAX_SIGNER_FIELD_LEN));
        at_limit.ip_address = Some("0000:0000:0000:0000:0000:ffff:192.168.100.228".to_string());
        assert_eq!(at_limit.ip_address.as_deref().map(str::len), Some(MAX_IP_ADDRESS_LEN));

        let validated = validate_signature(&at_limit).unwrap();
        assert_eq!(validated.signer_name.chars().count(), MAX_SIGNER_FIELD_LEN);

        let mut no_ip = input();
        no_ip.ip_address = None;
        assert!(validate_signature(&no_ip).is_ok());
    }
}
