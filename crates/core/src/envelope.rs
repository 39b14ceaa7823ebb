//! Envelope format for encrypted fields and the AES-256-GCM step.
//!
//! An encrypted attribute is stored as the map
//! `{v: N "1", edk: B, nonce: B, ct: B}`. The plaintext sealed into `ct` is
//! the field's normal wire value rendered as type-tagged JSON
//! (`{"Type":"S","S":"x"}`), and the AAD binds the ciphertext to the wire
//! attribute name so an envelope cannot be moved between attributes.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{json, Map, Value};

use crate::error::{AccessError, Result};
use crate::value::{AttributeValue, Item};

pub const ENVELOPE_VERSION: &str = "1";
pub const DATA_KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;

const AAD_PREFIX: &str = "dynamap:encrypted:v1|attr=";

/// Stored form of one encrypted value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub wrapped_key: Vec<u8>,
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    pub fn to_attribute(&self) -> AttributeValue {
        AttributeValue::M(Item::from([
            ("v".to_string(), AttributeValue::N(ENVELOPE_VERSION.to_string())),
            ("edk".to_string(), AttributeValue::B(self.wrapped_key.clone())),
            ("nonce".to_string(), AttributeValue::B(self.nonce.clone())),
            ("ct".to_string(), AttributeValue::B(self.ciphertext.clone())),
        ]))
    }

    /// Validates the stored shape of an envelope.
    pub fn from_attribute(value: &AttributeValue) -> Result<Self> {
        let AttributeValue::M(map) = value else {
            return Err(invalid_envelope(format!(
                "expected encrypted envelope map, got {}",
                value.type_tag()
            )));
        };

        let version = match map.get("v") {
            Some(AttributeValue::N(v)) | Some(AttributeValue::S(v)) => v.as_str(),
            _ => "",
        };
        if version != ENVELOPE_VERSION {
            return Err(invalid_envelope("unsupported encrypted envelope version"));
        }

        let bytes = |key: &str| match map.get(key) {
            Some(AttributeValue::B(b)) => Some(b.clone()),
            _ => None,
        };
        let wrapped_key = bytes("edk")
            .filter(|b| !b.is_empty())
            .ok_or_else(|| invalid_envelope("missing encrypted data key"))?;
        let nonce = bytes("nonce")
            .filter(|b| !b.is_empty())
            .ok_or_else(|| invalid_envelope("missing nonce"))?;
        let ciphertext = bytes("ct").ok_or_else(|| invalid_envelope("missing ciphertext"))?;

        Ok(Self {
            wrapped_key,
            nonce,
            ciphertext,
        })
    }
}

fn invalid_envelope(detail: impl std::fmt::Display) -> AccessError {
    AccessError::validation(format!("invalid encrypted envelope: {detail}"))
}

/// Additional authenticated data for one wire attribute.
pub fn aad(attribute_name: &str) -> Vec<u8> {
    format!("{AAD_PREFIX}{attribute_name}").into_bytes()
}

fn cipher(data_key: &[u8]) -> Result<Aes256Gcm> {
    if data_key.len() != DATA_KEY_LEN {
        return Err(AccessError::KeyWrapping {
            code: "InvalidDataKey".to_string(),
            message: format!("unexpected data key plaintext length: {}", data_key.len()),
        });
    }
    Aes256Gcm::new_from_slice(data_key).map_err(|e| AccessError::KeyWrapping {
        code: "InvalidDataKey".to_string(),
        message: format!("aes-gcm init failed: {e}"),
    })
}

fn check_nonce(nonce: &[u8]) -> Result<()> {
    if nonce.len() != NONCE_LEN {
        return Err(invalid_envelope(format!(
            "nonce must be {NONCE_LEN} bytes (got {})",
            nonce.len()
        )));
    }
    Ok(())
}

/// Seals a wire value under `data_key`.
pub fn seal(
    data_key: &[u8],
    wrapped_key: Vec<u8>,
    nonce: &[u8],
    attribute_name: &str,
    value: &AttributeValue,
) -> Result<Envelope> {
    if attribute_name.is_empty() {
        return Err(AccessError::validation("attribute name is empty"));
    }
    if wrapped_key.is_empty() {
        return Err(AccessError::KeyWrapping {
            code: "InvalidDataKey".to_string(),
            message: "key wrapper returned empty ciphertext data key".to_string(),
        });
    }
    check_nonce(nonce)?;

    let plaintext = encode_plaintext(value);
    let aad = aad(attribute_name);
    let ciphertext = cipher(data_key)?
        .encrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: &plaintext,
                aad: &aad,
            },
        )
        .map_err(|_| AccessError::validation(format!("aes-gcm encrypt failed: {attribute_name}")))?;

    Ok(Envelope {
        wrapped_key,
        nonce: nonce.to_vec(),
        ciphertext,
    })
}

/// Opens an envelope with an already unwrapped data key.
pub fn open(data_key: &[u8], attribute_name: &str, envelope: &Envelope) -> Result<AttributeValue> {
    check_nonce(&envelope.nonce)?;
    let aad = aad(attribute_name);
    let plaintext = cipher(data_key)?
        .decrypt(
            Nonce::from_slice(&envelope.nonce),
            Payload {
                msg: &envelope.ciphertext,
                aad: &aad,
            },
        )
        .map_err(|_| AccessError::validation(format!("aes-gcm decrypt failed: {attribute_name}")))?;
    decode_plaintext(&plaintext)
}

/// Type-tagged JSON rendering of a wire value.
pub fn encode_plaintext(value: &AttributeValue) -> Vec<u8> {
    tagged(value).to_string().into_bytes()
}

pub fn decode_plaintext(bytes: &[u8]) -> Result<AttributeValue> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| AccessError::validation(format!("failed to decode attribute value: {e}")))?;
    untagged(&value)
}

fn tagged(value: &AttributeValue) -> Value {
    let tag = value.type_tag();
    let inner = match value {
        AttributeValue::S(s) | AttributeValue::N(s) => json!(s),
        AttributeValue::B(b) => json!(STANDARD.encode(b)),
        AttributeValue::Bool(b) => json!(b),
        AttributeValue::Null => json!(true),
        AttributeValue::L(items) => Value::Array(items.iter().map(tagged).collect()),
        AttributeValue::M(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), tagged(v)))
                .collect::<Map<_, _>>(),
        ),
        AttributeValue::Ss(items) | AttributeValue::Ns(items) => json!(items),
        AttributeValue::Bs(items) => {
            Value::Array(items.iter().map(|b| json!(STANDARD.encode(b))).collect())
        }
    };
    let mut out = Map::new();
    out.insert("Type".to_string(), json!(tag));
    out.insert(tag.to_string(), inner);
    Value::Object(out)
}

fn untagged(value: &Value) -> Result<AttributeValue> {
    let bad = |detail: &str| AccessError::validation(format!("failed to decode attribute value: {detail}"));

    let map = value.as_object().ok_or_else(|| bad("expected an object"))?;
    let tag = map
        .get("Type")
        .and_then(Value::as_str)
        .ok_or_else(|| bad("missing Type"))?;
    let inner = map.get(tag).ok_or_else(|| bad("missing payload"))?;

    let string = |v: &Value| v.as_str().map(str::to_string).ok_or_else(|| bad("expected a string"));
    let bytes = |v: &Value| {
        v.as_str()
            .and_then(|s| STANDARD.decode(s).ok())
            .ok_or_else(|| bad("expected base64 bytes"))
    };
    let list = |v: &Value| v.as_array().cloned().ok_or_else(|| bad("expected an array"));

    Ok(match tag {
        "S" => AttributeValue::S(string(inner)?),
        "N" => AttributeValue::N(string(inner)?),
        "B" => AttributeValue::B(bytes(inner)?),
        "BOOL" => AttributeValue::Bool(inner.as_bool().ok_or_else(|| bad("expected a boolean"))?),
        "NULL" if inner == &Value::Bool(true) => AttributeValue::Null,
        "NULL" => return Err(bad("NULL must be true")),
        "L" => AttributeValue::L(list(inner)?.iter().map(untagged).collect::<Result<_>>()?),
        "M" => {
            let entries = inner.as_object().ok_or_else(|| bad("expected an object"))?;
            let mut item = Item::new();
            for (k, v) in entries {
                item.insert(k.clone(), untagged(v)?);
            }
            AttributeValue::M(item)
        }
        "SS" => AttributeValue::Ss(list(inner)?.iter().map(string).collect::<Result<_>>()?),
        "NS" => AttributeValue::Ns(list(inner)?.iter().map(string).collect::<Result<_>>()?),
        "BS" => AttributeValue::Bs(list(inner)?.iter().map(bytes).collect::<Result<_>>()?),
        other => return Err(bad(&format!("unknown type {other}"))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [7; 32];
    const NONCE: [u8; 12] = [1; 12];

    #[test]
    fn test_seal_then_open() {
        let value = AttributeValue::M(Item::from([
            ("card".to_string(), AttributeValue::S("4111".into())),
            ("raw".to_string(), AttributeValue::Bs(vec![vec![1, 2]])),
        ]));
        let envelope = seal(&KEY, b"wrapped".to_vec(), &NONCE, "payment", &value).unwrap();
        assert_eq!(envelope.nonce, NONCE.to_vec());
        assert_ne!(envelope.ciphertext, encode_plaintext(&value));

        let stored = envelope.to_attribute();
        let parsed = Envelope::from_attribute(&stored).unwrap();
        assert_eq!(open(&KEY, "payment", &parsed).unwrap(), value);
    }

    #[test]
    fn test_aad_binds_attribute_name() {
        let value = AttributeValue::S("secret".into());
        let envelope = seal(&KEY, b"w".to_vec(), &NONCE, "a", &value).unwrap();
        assert!(open(&KEY, "b", &envelope).is_err());
        assert_eq!(aad("a"), b"dynamap:encrypted:v1|attr=a".to_vec());
    }

    #[test]
    fn test_plaintext_is_type_tagged() {
        assert_eq!(
            String::from_utf8(encode_plaintext(&AttributeValue::S("x".into()))).unwrap(),
            r#"{"S":"x","Type":"S"}"#
        );
        assert_eq!(
            String::from_utf8(encode_plaintext(&AttributeValue::B(b"hi".to_vec()))).unwrap(),
            r#"{"B":"aGk=","Type":"B"}"#
        );
        assert!(decode_plaintext(br#"{"S":"x"}"#).is_err());
        assert!(decode_plaintext(br#"{"Type":"NULL","NULL":false}"#).is_err());
        assert!(decode_plaintext(br#"{"Type":"X","X":1}"#).is_err());
    }

    #[test]
    fn test_envelope_shape_validation() {
        let err = Envelope::from_attribute(&AttributeValue::S("plain".into())).unwrap_err();
        assert_eq!(
            err,
            AccessError::validation(
                "invalid encrypted envelope: expected encrypted envelope map, got S"
            )
        );

        let mut stored = Envelope {
            wrapped_key: vec![1],
            nonce: NONCE.to_vec(),
            ciphertext: vec![],
        }
        .to_attribute();
        assert!(Envelope::from_attribute(&stored).is_ok());

        if let AttributeValue::M(map) = &mut stored {
            map.insert("v".into(), AttributeValue::N("2".into()));
        }
        assert!(Envelope::from_attribute(&stored).is_err());
    }

    #[test]
    fn test_bad_key_length_is_a_key_wrapping_error() {
        let err = seal(&[0; 16], b"w".to_vec(), &NONCE, "a", &AttributeValue::Null).unwrap_err();
        assert!(matches!(err, AccessError::KeyWrapping { .. }));
    }
}
