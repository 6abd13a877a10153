use std::{collections::BTreeMap, fmt};

use bytes::Bytes;

/// Canonical comparison value for message bodies.
///
/// Both the expected bodies pulled from the source and the bodies arriving at
/// the sink are converted into a `Payload` before they are compared. Equality
/// is structural: lists compare element-wise in order, maps compare by key,
/// `Bytes` compare byte-for-byte. `Int(1)` and `Float(1.0)` are different
/// payloads, and `Text` never equals `Bytes` even when the bytes are valid
/// UTF-8.
///
/// # Example
///
/// ```rust
/// use testpoint::Payload;
///
/// assert_eq!(Payload::from("hello"), Payload::Text("hello".into()));
/// assert_eq!(Payload::from(vec![1i64, 2]), Payload::List(vec![1i64.into(), 2i64.into()]));
/// assert_ne!(Payload::from("a"), Payload::from(&b"a"[..]));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Payload {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Bytes),
    List(Vec<Payload>),
    Map(BTreeMap<String, Payload>),
}

impl Payload {
    /// Short name of the variant, used in mismatch reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Null => "null",
            Payload::Bool(_) => "bool",
            Payload::Int(_) => "int",
            Payload::Float(_) => "float",
            Payload::Text(_) => "text",
            Payload::Bytes(_) => "bytes",
            Payload::List(_) => "list",
            Payload::Map(_) => "map",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Payload::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Null => write!(f, "null"),
            Payload::Bool(b) => write!(f, "{b}"),
            Payload::Int(i) => write!(f, "{i}"),
            Payload::Float(x) => write!(f, "{x:?}"),
            Payload::Text(s) => write!(f, "{s:?}"),
            Payload::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Payload::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Payload::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k:?}: {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<()> for Payload {
    fn from(_: ()) -> Self {
        Payload::Null
    }
}

impl From<bool> for Payload {
    fn from(value: bool) -> Self {
        Payload::Bool(value)
    }
}

macro_rules! from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Payload {
                fn from(value: $t) -> Self {
                    Payload::Int(i64::from(value))
                }
            }
        )*
    };
}

from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Payload {
    fn from(value: f32) -> Self {
        Payload::Float(f64::from(value))
    }
}

impl From<f64> for Payload {
    fn from(value: f64) -> Self {
        Payload::Float(value)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Payload::Text(value.to_owned())
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::Text(value)
    }
}

impl From<&String> for Payload {
    fn from(value: &String) -> Self {
        Payload::Text(value.clone())
    }
}

impl From<Bytes> for Payload {
    fn from(value: Bytes) -> Self {
        Payload::Bytes(value)
    }
}

impl From<&[u8]> for Payload {
    fn from(value: &[u8]) -> Self {
        Payload::Bytes(Bytes::copy_from_slice(value))
    }
}

// `Vec<u8>` is a byte buffer, not a list of integers.
impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Payload::Bytes(Bytes::from(value))
    }
}

macro_rules! from_list {
    ($($t:ty),*) => {
        $(
            impl From<Vec<$t>> for Payload {
                fn from(value: Vec<$t>) -> Self {
                    Payload::List(value.into_iter().map(Payload::from).collect())
                }
            }
        )*
    };
}

from_list!(Payload, bool, i8, i16, i32, i64, u16, u32, f32, f64, &str, String, Bytes);

impl<T: Into<Payload>> From<Option<T>> for Payload {
    fn from(value: Option<T>) -> Self {
        value.map_or(Payload::Null, Into::into)
    }
}

impl<V: Into<Payload>> From<BTreeMap<String, V>> for Payload {
    fn from(value: BTreeMap<String, V>) -> Self {
        Payload::Map(value.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

#[cfg(feature = "serde")]
impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Payload::Null,
            Value::Bool(b) => Payload::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Payload::Int(i),
                None => Payload::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Payload::Text(s),
            Value::Array(items) => Payload::List(items.into_iter().map(Payload::from).collect()),
            Value::Object(entries) => {
                Payload::Map(entries.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}
