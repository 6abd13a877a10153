use std::fmt;

use crate::{ExtractError, Message, Payload};

/// Turns a message body into the [`Payload`] used for comparison.
///
/// The same extractor is applied to the expected messages pulled from the
/// source and to the live messages arriving at the sink, so both sides are
/// compared in one canonical form.
///
/// Closures with the signature `Fn(&Message<B>) -> Result<Payload, ExtractError>`
/// implement this trait, which is the usual way to coerce bodies:
///
/// ```rust
/// use testpoint::{Extract, ExtractError, Message, Payload};
///
/// let trimmed = |m: &Message<String>| -> Result<Payload, ExtractError> {
///     Ok(Payload::from(m.body().trim()))
/// };
/// assert_eq!(
///     trimmed.extract(&Message::new(" hi ".to_string())).unwrap(),
///     Payload::from("hi"),
/// );
/// ```
pub trait Extract<B>: Send + Sync + 'static {
    fn extract(&self, message: &Message<B>) -> Result<Payload, ExtractError>;
}

impl<B, F> Extract<B> for F
where
    F: Fn(&Message<B>) -> Result<Payload, ExtractError> + Send + Sync + 'static,
{
    fn extract(&self, message: &Message<B>) -> Result<Payload, ExtractError> {
        self(message)
    }
}

/// Default extractor: the message body itself, converted into a [`Payload`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl<B> Extract<B> for Identity
where
    B: Clone + Into<Payload>,
{
    fn extract(&self, message: &Message<B>) -> Result<Payload, ExtractError> {
        Ok(message.body().clone().into())
    }
}

/// Extractor that reads UTF-8 text out of binary bodies.
///
/// Useful when the expected bodies come from files (bytes) but the live
/// traffic carries strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8;

impl<B> Extract<B> for Utf8
where
    B: AsRef<[u8]>,
{
    fn extract(&self, message: &Message<B>) -> Result<Payload, ExtractError> {
        std::str::from_utf8(message.body().as_ref())
            .map(Payload::from)
            .map_err(ExtractError::new)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "identity")
    }
}

impl fmt::Display for Utf8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "utf8")
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[test]
    fn identity_converts_body() {
        let payload = Identity.extract(&Message::new("hello")).unwrap();
        assert_eq!(payload, Payload::from("hello"));
    }

    #[test]
    fn utf8_decodes_bytes() {
        let message = Message::new(Bytes::from_static(b"world"));
        assert_eq!(Utf8.extract(&message).unwrap(), Payload::from("world"));
    }

    #[test]
    fn utf8_rejects_invalid_bytes() {
        let message = Message::new(vec![0xffu8, 0xfe]);
        assert!(Utf8.extract(&message).is_err());
    }

    #[test]
    fn closures_are_extractors() {
        let upper = |m: &Message<&'static str>| -> Result<Payload, ExtractError> {
            Ok(Payload::from(m.body().to_uppercase()))
        };
        assert_eq!(upper.extract(&Message::new("ab")).unwrap(), Payload::from("AB"));
    }

    #[test]
    fn closures_can_fail() {
        let strict = |m: &Message<i64>| -> Result<Payload, ExtractError> {
            if *m.body() < 0 {
                Err(ExtractError::new("negative body"))
            } else {
                Ok(Payload::from(*m.body()))
            }
        };
        assert_eq!(
            strict.extract(&Message::new(-1)).unwrap_err().reason(),
            "negative body"
        );
    }
}
