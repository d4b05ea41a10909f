//! Decoded barcode payload.
//!
//! No symbology validation: any non-empty decoded string is a barcode. Separator
//! characters are kept verbatim.

use std::fmt;

/// Immutable, non-empty decoded symbol payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BarcodeValue(String);

impl BarcodeValue {
    /// Returns `None` for an empty decode.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BarcodeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BarcodeValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn barcode_new() {
        let b = BarcodeValue::new("ABC-123/7").unwrap();
        assert_eq!(b.as_str(), "ABC-123/7");
        assert_eq!(b.to_string(), "ABC-123/7");
    }

    #[test]
    fn barcode_rejects_empty() {
        assert!(BarcodeValue::new("").is_none());
    }

    #[test]
    fn barcode_keeps_whitespace() {
        let b = BarcodeValue::new(" ").unwrap();
        assert_eq!(b.as_str(), " ");
    }
}
