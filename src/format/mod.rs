//! Payload serialization for boxes.
//!
//! The plaintext inside a box envelope is pretty-printed JSON so that a
//! decrypted box stays human readable and diffable. Empty fields are omitted.

use zeroize::Zeroizing;

use crate::error::BoxError;
use crate::store::SecretBox;

/// Serializes a box into its plaintext payload.
///
/// # Errors
///
/// Returns [`BoxError::MalformedPayload`] if serialization fails.
pub fn encode(secret_box: &SecretBox) -> Result<Zeroizing<Vec<u8>>, BoxError> {
    serde_json::to_vec_pretty(secret_box)
        .map(Zeroizing::new)
        .map_err(|e| BoxError::MalformedPayload(e.to_string()))
}

/// Parses a plaintext payload back into a box.
///
/// # Errors
///
/// Returns [`BoxError::MalformedPayload`] if the payload is not a valid box.
pub fn decode(payload: &[u8]) -> Result<SecretBox, BoxError> {
    serde_json::from_slice(payload).map_err(|e| BoxError::MalformedPayload(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Secret;

    fn sample_box() -> SecretBox {
        let mut b = SecretBox::new("test", "me");

        let mut email = Secret::new("email");
        email.set_login("a@b.com");
        email.set_password("hunter2");
        email.set_url("https://mail.example.com");
        email.set_notes("line one\nline two");
        email.set_item("recovery", "abcd-efgh");
        email.set_item("pin", "0000");
        b.add_secret(email).unwrap();

        b.add_secret(Secret::new("bare")).unwrap();
        b
    }

    #[test]
    fn encode_decode_preserves_every_field() {
        let original = sample_box();
        let payload = encode(&original).unwrap();
        let decoded = decode(&payload).unwrap();

        assert_eq!(decoded, original);
        assert_eq!(decoded.find("email").unwrap().item("pin"), Some("0000"));
    }

    #[test]
    fn empty_fields_are_omitted() {
        let payload = encode(&sample_box()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&payload).unwrap();

        let bare = &value["secrets"][1];
        assert_eq!(bare["name"], "bare");
        assert!(bare.get("login").is_none());
        assert!(bare.get("password").is_none());
        assert!(bare.get("items").is_none());
    }

    #[test]
    fn decode_tolerates_absent_fields() {
        let decoded = decode(b"{}").unwrap();
        assert_eq!(decoded.name(), "");
        assert!(decoded.is_empty());

        let decoded = decode(br#"{"name":"fresh","owner":"me"}"#).unwrap();
        assert_eq!(decoded.name(), "fresh");
        assert!(decoded.is_empty());
    }

    #[test]
    fn decode_accepts_legacy_field_names() {
        let payload = br#"{
            "name": "old",
            "secrets": [{"name": "s", "pwd": "p1", "others": {"cc": "1234"}}]
        }"#;
        let decoded = decode(payload).unwrap();
        let secret = decoded.find("s").unwrap();

        assert_eq!(secret.password(), "p1");
        assert_eq!(secret.item("cc"), Some("1234"));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            decode(b"\x00\x01not json"),
            Err(BoxError::MalformedPayload(_))
        ));
        assert!(matches!(
            decode(br#"{"secrets": "nope"}"#),
            Err(BoxError::MalformedPayload(_))
        ));
    }
}
