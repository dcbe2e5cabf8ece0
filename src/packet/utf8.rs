//! Text <-> "byte string" transform.
//!
//! A byte string holds one char per byte of the text's UTF-8 encoding, every
//! char in `U+0000..=U+00FF`. Its char count therefore equals the UTF-8 byte
//! length of the unencoded text, which is what length-prefixed text payloads
//! count.

use crate::error::ByteStringError;

#[must_use]
pub fn encode(text: &str) -> String { text.bytes().map(char::from).collect() }

pub fn decode(bytes: &str) -> Result<String, ByteStringError> {
    let raw = bytes
        .chars()
        .map(|c| u8::try_from(c).map_err(|_| ByteStringError::NotAByte(c)))
        .collect::<Result<Vec<u8>, _>>()?;
    String::from_utf8(raw).map_err(|_| ByteStringError::InvalidUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_is_unchanged() {
        assert_eq!(encode("4hello"), "4hello");
        assert_eq!(decode("4hello").unwrap(), "4hello");
    }

    #[test]
    fn multibyte_chars_expand_to_bytes() {
        let encoded = encode("é☃");
        assert_eq!(encoded, "\u{c3}\u{a9}\u{e2}\u{98}\u{83}");
        assert_eq!(encoded.chars().count(), "é☃".len());
        assert_eq!(decode(&encoded).unwrap(), "é☃");
    }

    #[test]
    fn rejects_non_bytes_and_bad_sequences() {
        assert_eq!(decode("☃"), Err(ByteStringError::NotAByte('☃')));
        assert_eq!(decode("\u{c3}"), Err(ByteStringError::InvalidUtf8));
    }
}
