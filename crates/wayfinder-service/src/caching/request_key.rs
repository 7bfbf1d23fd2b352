use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::FetchResult;

/// The canonical cache key for a structured request.
///
/// Two requests that are deeply structurally equal produce the same key no
/// matter in which order their properties (or nested properties) were
/// assembled: all object keys are emitted in lexicographic order during
/// serialization, while arrays keep their element order.
///
/// The canonical text is retained to help debugging, and a SHA-256 digest
/// of it is what is actually compared and hashed.
#[derive(Debug, Clone, Eq)]
pub struct RequestKey {
    canonical: Arc<str>,
    hash: [u8; 32],
}

impl PartialEq for RequestKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl std::hash::Hash for RequestKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl RequestKey {
    /// Creates a [`RequestKey`] from any serializable request.
    ///
    /// Serialization failures are unexpected for the plain data types used
    /// as requests and surface as [`FetchError::InternalError`](super::FetchError::InternalError).
    pub fn for_request<R: Serialize>(request: &R) -> FetchResult<Self> {
        let value = serde_json::to_value(request)?;
        let mut canonical = String::new();
        write_canonical(&mut canonical, &value);

        let hash = Sha256::digest(&canonical);
        let hash = <[u8; 32]>::try_from(hash.as_slice()).expect("sha256 outputs 32 bytes");

        Ok(RequestKey {
            canonical: canonical.into(),
            hash,
        })
    }

    /// The canonical serialization this key was derived from.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }
}

/// Writes `value` as compact JSON with object keys sorted lexicographically
/// at every nesting level. Arrays and scalars serialize as-is.
fn write_canonical(out: &mut String, value: &Value) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();

            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let quoted =
                    serde_json::to_string(key).expect("JSON string serialization is infallible");
                out.push_str(&quoted);
                out.push(':');
                write_canonical(out, &map[key.as_str()]);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(out, item);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Stop {
        lat: f64,
        lng: f64,
    }

    #[derive(Serialize)]
    struct Query {
        origin: Stop,
        destination: Stop,
        mode: &'static str,
    }

    // Same fields as `Query`/`Stop`, declared (and thus serialized) in a
    // different order.
    #[derive(Serialize)]
    struct StopReordered {
        lng: f64,
        lat: f64,
    }

    #[derive(Serialize)]
    struct QueryReordered {
        mode: &'static str,
        destination: StopReordered,
        origin: StopReordered,
    }

    #[test]
    fn test_key_order_is_irrelevant() {
        let a = RequestKey::for_request(&Query {
            origin: Stop { lat: 48.2, lng: 16.4 },
            destination: Stop { lat: 52.5, lng: 13.4 },
            mode: "DRIVING",
        })
        .unwrap();

        let b = RequestKey::for_request(&QueryReordered {
            mode: "DRIVING",
            destination: StopReordered { lng: 13.4, lat: 52.5 },
            origin: StopReordered { lng: 16.4, lat: 48.2 },
        })
        .unwrap();

        assert_eq!(a, b);
        assert_eq!(a.canonical(), b.canonical());
        assert_eq!(
            a.canonical(),
            r#"{"destination":{"lat":52.5,"lng":13.4},"mode":"DRIVING","origin":{"lat":48.2,"lng":16.4}}"#
        );
    }

    #[test]
    fn test_array_order_is_significant() {
        let a = RequestKey::for_request(&vec!["x", "y"]).unwrap();
        let b = RequestKey::for_request(&vec!["y", "x"]).unwrap();

        assert_ne!(a, b);
        assert_eq!(a.canonical(), r#"["x","y"]"#);
    }

    #[test]
    fn test_different_values_differ() {
        let a = RequestKey::for_request(&Stop { lat: 1.0, lng: 2.0 }).unwrap();
        let b = RequestKey::for_request(&Stop { lat: 1.0, lng: 3.0 }).unwrap();

        assert_ne!(a, b);
    }

    #[test]
    fn test_scalars_and_nulls() {
        let key = RequestKey::for_request(&serde_json::json!({
            "b": null,
            "a": [1, true, "s"],
        }))
        .unwrap();

        assert_eq!(key.canonical(), r#"{"a":[1,true,"s"],"b":null}"#);
    }
}
