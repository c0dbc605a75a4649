//! Byte-level helpers for reading chapter exports.

use std::borrow::Cow;

use memchr::memmem;

/// How far into a file the XML declaration is looked for.
const DECLARATION_WINDOW: usize = 128;

/// Decode a chapter file to text.
///
/// UTF-8 is tried first (a BOM is honoured). Exports that are not valid UTF-8
/// are decoded with the encoding named in their XML declaration, or as
/// Windows-1252 when there is none or it is unknown.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let (text, _, malformed) = encoding_rs::UTF_8.decode(bytes);
    if !malformed {
        return text;
    }

    let declared = extract_xml_encoding(bytes)
        .and_then(|label| encoding_rs::Encoding::for_label(label.as_bytes()));
    let encoding = declared.unwrap_or(encoding_rs::WINDOWS_1252);
    let (text, _, _) = encoding.decode(bytes);
    text
}

/// The `encoding` pseudo-attribute of a leading `<?xml ...?>` declaration.
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    let head = &bytes[..bytes.len().min(DECLARATION_WINDOW)];
    let start = memmem::find(head, b"<?xml")?;
    let declaration = &head[start..];
    let declaration = &declaration[..memmem::find(declaration, b"?>")?];

    let key = declaration
        .windows(8)
        .position(|w| w.eq_ignore_ascii_case(b"encoding"))?;
    let rest = declaration[key + 8..].trim_ascii_start();
    let rest = rest.strip_prefix(b"=")?.trim_ascii_start();

    let (&quote, value) = rest.split_first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let end = memchr::memchr(quote, value)?;
    std::str::from_utf8(&value[..end]).ok()
}
