use std::fmt;
use std::str::FromStr;

use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, EncodeError};

/// Text encoding declared for a request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BodyEncoding {
    #[default]
    #[serde(rename = "UTF-8")]
    Utf8,
    #[serde(rename = "Shift_JIS")]
    ShiftJis,
    #[serde(rename = "EUC-JP")]
    EucJp,
    #[serde(rename = "ISO-2022-JP")]
    Iso2022Jp,
    #[serde(rename = "windows-1252")]
    Windows1252,
}

impl BodyEncoding {
    pub const ALL: [BodyEncoding; 5] = [
        BodyEncoding::Utf8,
        BodyEncoding::ShiftJis,
        BodyEncoding::EucJp,
        BodyEncoding::Iso2022Jp,
        BodyEncoding::Windows1252,
    ];

    pub fn label(&self) -> &'static str {
        self.encoding().name()
    }

    fn encoding(&self) -> &'static Encoding {
        match self {
            BodyEncoding::Utf8 => encoding_rs::UTF_8,
            BodyEncoding::ShiftJis => encoding_rs::SHIFT_JIS,
            BodyEncoding::EucJp => encoding_rs::EUC_JP,
            BodyEncoding::Iso2022Jp => encoding_rs::ISO_2022_JP,
            BodyEncoding::Windows1252 => encoding_rs::WINDOWS_1252,
        }
    }

    /// Decode `bytes` strictly. Malformed input is an error, never replaced.
    pub fn decode(&self, bytes: &[u8]) -> Result<String, DecodeError> {
        self.encoding()
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|text| text.into_owned())
            .ok_or(DecodeError { encoding: self.label() })
    }

    /// Encode `text`. Characters the encoding cannot represent are an error.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>, EncodeError> {
        let (bytes, _, had_unmappable) = self.encoding().encode(text);
        if had_unmappable {
            return Err(EncodeError { encoding: self.label() });
        }
        Ok(bytes.into_owned())
    }
}

impl fmt::Display for BodyEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BodyEncoding {
    type Err = String;

    /// Accepts any WHATWG label for a supported encoding (`sjis`, `utf8`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let encoding = Encoding::for_label(s.trim().as_bytes())
            .ok_or_else(|| format!("unknown encoding `{s}`"))?;
        BodyEncoding::ALL
            .into_iter()
            .find(|candidate| candidate.encoding() == encoding)
            .ok_or_else(|| format!("unsupported encoding `{s}`"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_round_trip() {
        let bytes = BodyEncoding::Utf8.encode("{\"name\":\"café\"}").unwrap();
        assert_eq!(BodyEncoding::Utf8.decode(&bytes).unwrap(), "{\"name\":\"café\"}");
    }

    #[test]
    fn test_shift_jis_round_trip() {
        let bytes = BodyEncoding::ShiftJis.encode("こんにちは").unwrap();
        assert_eq!(bytes[..2], [0x82, 0xb1]);
        assert_eq!(BodyEncoding::ShiftJis.decode(&bytes).unwrap(), "こんにちは");
    }

    #[test]
    fn test_invalid_bytes_fail_instead_of_replacing() {
        let err = BodyEncoding::Utf8.decode(&[0x66, 0xff, 0x6f]).unwrap_err();
        assert_eq!(err.encoding, "UTF-8");
        assert!(BodyEncoding::ShiftJis.decode(&[0x82]).is_err());
    }

    #[test]
    fn test_unmappable_text_fails_to_encode() {
        let err = BodyEncoding::Windows1252.encode("日本").unwrap_err();
        assert_eq!(err.encoding, "windows-1252");
    }

    #[test]
    fn test_from_label() {
        assert_eq!("Shift_JIS".parse::<BodyEncoding>().unwrap(), BodyEncoding::ShiftJis);
        assert_eq!("sjis".parse::<BodyEncoding>().unwrap(), BodyEncoding::ShiftJis);
        assert_eq!("utf-8".parse::<BodyEncoding>().unwrap(), BodyEncoding::Utf8);
        assert!("utf-16le".parse::<BodyEncoding>().is_err());
    }
}
