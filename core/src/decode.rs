//! Response body decoding.
//!
//! # Design
//! Decoding is two steps. A [`BodyDecoder`] turns raw bytes into a
//! `serde_json::Value`; it is injectable so callers can swap parsing rules.
//! The typed step, `Value` into the registered `T`, is captured as a
//! [`DecodeFn`] at registration time, when `T` is still known statically.
//! Dispatch only ever sees the erased function and downcasts its output.

use std::any::{type_name, Any};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::DecodeError;

/// Parses a raw response payload into a JSON value.
pub trait BodyDecoder: Send + Sync {
    fn decode(&self, body: &[u8]) -> Result<Value, DecodeError>;
}

/// Default decoder backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl BodyDecoder for JsonDecoder {
    fn decode(&self, body: &[u8]) -> Result<Value, DecodeError> {
        Ok(serde_json::from_slice(body)?)
    }
}

/// Type-erased decoding into the type registered for one request name.
pub(crate) type DecodeFn =
    Arc<dyn Fn(&dyn BodyDecoder, &[u8]) -> Result<Box<dyn Any + Send>, DecodeError> + Send + Sync>;

/// Build the erased decoding function for `T`.
pub(crate) fn decode_fn<T>() -> DecodeFn
where
    T: DeserializeOwned + Send + 'static,
{
    Arc::new(
        |decoder: &dyn BodyDecoder, body: &[u8]| -> Result<Box<dyn Any + Send>, DecodeError> {
            let value = decoder.decode(body)?;
            let typed: T = serde_json::from_value(value)?;
            Ok(Box::new(typed))
        },
    )
}

/// Fail unless `T` is the type a request was registered with.
pub(crate) fn ensure_type<T: 'static>(registered: &'static str) -> Result<(), DecodeError> {
    if registered == type_name::<T>() {
        Ok(())
    } else {
        Err(DecodeError::TypeMismatch {
            registered,
            requested: type_name::<T>(),
        })
    }
}

/// Decode `body` with `decode` and recover it as `T`.
///
/// Empty or whitespace-only payloads decode to `None` without consulting the
/// decoder.
pub(crate) fn decode_body<T: 'static>(
    decode: &DecodeFn,
    registered: &'static str,
    decoder: &dyn BodyDecoder,
    body: &[u8],
) -> Result<Option<T>, DecodeError> {
    ensure_type::<T>(registered)?;
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let decoded = (decode.as_ref())(decoder, body)?;
    decoded
        .downcast::<T>()
        .map(|typed| Some(*typed))
        .map_err(|_| DecodeError::TypeMismatch {
            registered,
            requested: type_name::<T>(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    fn decode<T: DeserializeOwned + Send + 'static>(body: &[u8]) -> Result<Option<T>, DecodeError> {
        decode_body::<T>(&decode_fn::<T>(), type_name::<T>(), &JsonDecoder, body)
    }

    #[test]
    fn decodes_into_registered_type() {
        let point = decode::<Point>(br#"{"x":1,"y":2}"#).unwrap();
        assert_eq!(point, Some(Point { x: 1, y: 2 }));
    }

    #[test]
    fn opaque_type_is_json_value() {
        let value = decode::<Value>(br#"{"anything":[1,2]}"#).unwrap().unwrap();
        assert_eq!(value["anything"][1], 2);
    }

    #[test]
    fn empty_body_is_none() {
        assert_eq!(decode::<Point>(b"").unwrap(), None);
        assert_eq!(decode::<Point>(b"  \n").unwrap(), None);
    }

    #[test]
    fn malformed_body_is_an_error() {
        let err = decode::<Point>(b"not json").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn shape_mismatch_is_malformed() {
        let err = decode::<Point>(br#"{"x":"one"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn requesting_another_type_is_a_mismatch() {
        let err = decode_body::<Value>(
            &decode_fn::<Point>(),
            type_name::<Point>(),
            &JsonDecoder,
            br#"{"x":1,"y":2}"#,
        )
        .unwrap_err();
        assert!(matches!(err, DecodeError::TypeMismatch { requested, .. } if requested == type_name::<Value>()));
    }

    #[test]
    fn custom_decoder_is_consulted() {
        struct Wrapping;
        impl BodyDecoder for Wrapping {
            fn decode(&self, body: &[u8]) -> Result<Value, DecodeError> {
                Ok(Value::String(String::from_utf8_lossy(body).into_owned()))
            }
        }

        let text = decode_body::<String>(
            &decode_fn::<String>(),
            type_name::<String>(),
            &Wrapping,
            b"plain text",
        )
        .unwrap();
        assert_eq!(text.as_deref(), Some("plain text"));
    }
}
