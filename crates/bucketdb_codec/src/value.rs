//! Dynamic value model shared by the encoder, decoder and serde bridge.

use crate::encoder::to_canonical_cbor;

/// A value in the supported CBOR subset.
///
/// Tags are absent. Every `Value` has exactly one canonical byte form; all
/// NaN payloads share the same one.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null (also `None`, `()` and unit structs).
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer in the CBOR range `-2^64 ..= 2^64 - 1`.
    Integer(i128),
    /// Floating point number, written in the shortest exact width.
    Float(f64),
    /// Byte string.
    Bytes(Vec<u8>),
    /// UTF-8 text.
    Text(String),
    /// Ordered sequence.
    Array(Vec<Value>),
    /// Key/value pairs. The encoder sorts them; decoded maps are already sorted.
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Builds a map with pairs in canonical key order.
    ///
    /// Keys that cannot be encoded sort last; the encoder reports them.
    pub fn map(pairs: Vec<(Value, Value)>) -> Self {
        let mut keyed: Vec<(Option<Vec<u8>>, (Value, Value))> = pairs
            .into_iter()
            .map(|pair| (to_canonical_cbor(&pair.0).ok(), pair))
            .collect();
        keyed.sort_by(|a, b| match (&a.0, &b.0) {
            (Some(a), Some(b)) => canonical_order(a, b),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        Value::Map(keyed.into_iter().map(|(_, pair)| pair).collect())
    }

    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Looks up a text key in a map value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(pairs) => pairs
                .iter()
                .find(|(k, _)| matches!(k, Value::Text(text) if text == key))
                .map(|(_, v)| v),
            _ => None,
        }
    }
}

/// Canonical ordering of two encoded items: shorter first, then bytewise.
pub(crate) fn canonical_order(a: &[u8], b: &[u8]) -> std::cmp::Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Integer(n.into())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_sorts_length_first() {
        let map = Value::map(vec![
            (Value::from("abc"), Value::Integer(1)),
            (Value::from("b"), Value::Integer(2)),
            (Value::from("a"), Value::Integer(3)),
        ]);

        let Value::Map(pairs) = map else {
            panic!("expected map");
        };
        let keys: Vec<_> = pairs.into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![Value::from("a"), Value::from("b"), Value::from("abc")]
        );
    }

    #[test]
    fn integers_sort_before_text() {
        let map = Value::map(vec![
            (Value::from("a"), Value::Null),
            (Value::Integer(-1), Value::Null),
            (Value::Integer(7), Value::Null),
        ]);

        let Value::Map(pairs) = map else {
            panic!("expected map");
        };
        assert_eq!(pairs[0].0, Value::Integer(7));
        assert_eq!(pairs[1].0, Value::Integer(-1));
        assert_eq!(pairs[2].0, Value::from("a"));
    }

    #[test]
    fn get_finds_text_keys() {
        let user = Value::map(vec![
            (Value::from("name"), Value::from("alice")),
            (Value::from("age"), Value::Integer(30)),
        ]);
        assert_eq!(user.get("age"), Some(&Value::Integer(30)));
        assert_eq!(user.get("email"), None);
        assert_eq!(Value::Null.get("age"), None);
        assert!(Value::Null.is_null());
    }
}
