use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::error::{CodecResult, FormatError};

const SCHEME: &str = "data:";
const BASE64_MARKER: &str = ";base64";

/// Codec between raw payloads and their portable (data URI) form.
pub struct PortableCodec;

impl PortableCodec {
    /// Encode `bytes` tagged with `mime` as `data:<mime>;base64,<payload>`.
    ///
    /// Each `/`-separated segment of the MIME string is percent-encoded, so
    /// ordinary types (`image/png`, `audio/x-m4a`) are emitted verbatim while
    /// separators such as `,` or `;` inside the MIME cannot break parsing.
    pub fn encode(bytes: &[u8], mime: &str) -> String {
        let mime = mime
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let payload = BASE64.encode(bytes);
        let mut out = String::with_capacity(SCHEME.len() + mime.len() + BASE64_MARKER.len() + 1 + payload.len());
        out.push_str(SCHEME);
        out.push_str(&mime);
        out.push_str(BASE64_MARKER);
        out.push(',');
        out.push_str(&payload);
        out
    }

    /// Decode a portable form back into `(bytes, mime)`.
    ///
    /// Non-base64 data URIs are accepted too; their payload is
    /// percent-decoded.
    pub fn decode(text: &str) -> CodecResult<(Vec<u8>, String)> {
        let (header, payload) = split(text)?;
        match header.strip_suffix(BASE64_MARKER) {
            Some(mime) => {
                let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
                let bytes = BASE64
                    .decode(compact.as_bytes())
                    .map_err(|e| FormatError::InvalidBase64(e.to_string()))?;
                Ok((bytes, decode_mime(mime)?))
            }
            None => {
                let bytes = urlencoding::decode_binary(payload.as_bytes()).into_owned();
                Ok((bytes, decode_mime(header)?))
            }
        }
    }

    /// The MIME type of a portable form, without decoding its payload.
    pub fn peek_mime(text: &str) -> CodecResult<String> {
        let (header, _) = split(text)?;
        decode_mime(header.strip_suffix(BASE64_MARKER).unwrap_or(header))
    }
}

fn split(text: &str) -> CodecResult<(&str, &str)> {
    let rest = match text.get(..SCHEME.len()) {
        Some(scheme) if scheme.eq_ignore_ascii_case(SCHEME) => &text[SCHEME.len()..],
        _ => return Err(FormatError::MissingScheme),
    };
    rest.split_once(',').ok_or(FormatError::MissingSeparator)
}

fn decode_mime(raw: &str) -> CodecResult<String> {
    urlencoding::decode(raw)
        .map(|mime| mime.into_owned())
        .map_err(|e| FormatError::InvalidMime(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encodes_common_types_verbatim() {
        let text = PortableCodec::encode(&[0x89, b'P', b'N', b'G'], "image/png");
        assert_eq!(text, "data:image/png;base64,iVBORw==");
        let text = PortableCodec::encode(b"", "audio/x-m4a");
        assert_eq!(text, "data:audio/x-m4a;base64,");
    }

    #[test]
    fn decodes_what_it_encodes() {
        let text = PortableCodec::encode(b"\x00\x01\xff", "audio/ogg");
        let (bytes, mime) = PortableCodec::decode(&text).unwrap();
        assert_eq!(bytes, b"\x00\x01\xff");
        assert_eq!(mime, "audio/ogg");
    }

    #[test]
    fn mime_with_separators_survives() {
        let mime = "text/plain; charset=utf-8, odd;base64";
        let text = PortableCodec::encode(b"abc", mime);
        let (bytes, decoded) = PortableCodec::decode(&text).unwrap();
        assert_eq!(bytes, b"abc");
        assert_eq!(decoded, mime);
        assert_eq!(PortableCodec::peek_mime(&text).unwrap(), mime);
    }

    #[test]
    fn accepts_plain_data_uri() {
        let (bytes, mime) = PortableCodec::decode("data:text/plain,hello%20world").unwrap();
        assert_eq!(bytes, b"hello world");
        assert_eq!(mime, "text/plain");
    }

    #[test]
    fn tolerates_whitespace_in_base64() {
        let (bytes, _) = PortableCodec::decode("data:image/gif;base64,aGVs\nbG8=").unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let (bytes, _) = PortableCodec::decode("DATA:image/png;base64,aGk=").unwrap();
        assert_eq!(bytes, b"hi");
    }

    #[test]
    fn rejects_missing_scheme() {
        assert_eq!(
            PortableCodec::decode("image/png;base64,aGk=").unwrap_err(),
            FormatError::MissingScheme
        );
        assert_eq!(PortableCodec::decode("").unwrap_err(), FormatError::MissingScheme);
    }

    #[test]
    fn rejects_missing_separator() {
        assert_eq!(
            PortableCodec::decode("data:image/png;base64").unwrap_err(),
            FormatError::MissingSeparator
        );
    }

    #[test]
    fn rejects_bad_base64() {
        let err = PortableCodec::decode("data:image/png;base64,@@@").unwrap_err();
        assert!(matches!(err, FormatError::InvalidBase64(_)));
    }

    #[test]
    fn rejects_non_utf8_mime() {
        let err = PortableCodec::decode("data:image/%FF;base64,aGk=").unwrap_err();
        assert!(matches!(err, FormatError::InvalidMime(_)));
    }

    proptest! {
        #[test]
        fn roundtrip_any_payload_and_mime(
            bytes in proptest::collection::vec(any::<u8>(), 0..512),
            mime in any::<String>(),
        ) {
            let text = PortableCodec::encode(&bytes, &mime);
            let (decoded, decoded_mime) = PortableCodec::decode(&text).unwrap();
            prop_assert_eq!(decoded, bytes);
            prop_assert_eq!(decoded_mime, mime);
        }
    }
}
