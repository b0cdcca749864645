//! Serde helper: binary fields as standard base64 strings.
//!
//! Use with `#[serde(with = "sealbox_core::b64")]` on any field whose type is
//! `Vec<u8>` or a fixed-size byte array. Decoding rejects strings whose byte
//! length does not fit the target type.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S, T>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: AsRef<[u8]>,
{
    serializer.serialize_str(&STANDARD.encode(value.as_ref()))
}

pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<Vec<u8>>,
{
    let encoded = String::deserialize(deserializer)?;
    let bytes = STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| D::Error::custom(format!("base64 decode: {e}")))?;
    let len = bytes.len();
    T::try_from(bytes).map_err(|_| D::Error::custom(format!("unexpected byte length {len}")))
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        #[serde(with = "crate::b64")]
        blob: Vec<u8>,
        #[serde(with = "crate::b64")]
        salt: [u8; 4],
    }

    #[test]
    fn test_fixed_array_roundtrip() {
        let sample = Sample {
            blob: b"payload".to_vec(),
            salt: [1, 2, 3, 4],
        };
        let json = serde_json::to_string(&sample).unwrap();
        assert!(json.contains("cGF5bG9hZA=="));
        let parsed: Sample = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sample);
    }

    #[test]
    fn test_wrong_array_length_rejected() {
        // "AQID" decodes to three bytes, the field needs four
        let json = r#"{"blob":"","salt":"AQID"}"#;
        let result: Result<Sample, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_base64_rejected() {
        let json = r#"{"blob":"%%%","salt":"AQIDBA=="}"#;
        let result: Result<Sample, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
