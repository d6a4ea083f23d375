use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use super::catalog;
use super::codec::ExifBlock;
use crate::model::{MetadataMap, RawValue};
use crate::normalize::{self, clean_text, split_delimited};

/// Charset marker some cameras put in front of UserComment.
static CHARSET_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(ASCII|UNICODE|JIS)\s*\x00+").expect("valid charset prefix regex")
});

/// Flatten an EXIF block into `name → value`.
///
/// IFDs are walked in [`Ifd`](super::Ifd) order, so on a name collision the
/// later IFD wins. Tags the catalog does not know are stored under
/// `"{ifd}:0x{TAG}"`.
pub fn decode(block: &ExifBlock) -> MetadataMap {
    let mut collected: BTreeMap<String, RawValue> = BTreeMap::new();
    for (&ifd, tags) in &block.ifds {
        for (&tag, raw) in tags {
            let name = catalog::display_name(ifd, tag);
            let value = preprocess(&name, raw.clone());
            collected.insert(name, value);
        }
    }
    normalize::normalize_map(collected)
}

fn preprocess(name: &str, raw: RawValue) -> RawValue {
    if name.starts_with("XP") {
        return xp_field(raw);
    }
    // TIFF stores the XMP packet as BYTE, not ASCII
    let raw = match raw {
        RawValue::IntArray(ints) if name == "XMLPacket" => match int_bytes(&ints) {
            Some(bytes) => RawValue::ByteBuffer(bytes),
            None => RawValue::IntArray(ints),
        },
        other => other,
    };
    match raw {
        RawValue::ByteBuffer(bytes) => {
            let text = String::from_utf8_lossy(&bytes);
            if name == "UserComment" {
                RawValue::Text(user_comment(&text))
            } else {
                RawValue::Text(clean_text(&text))
            }
        }
        other => other,
    }
}

/// Windows XP* tags: UTF-16LE text, possibly a `;`-separated list.
fn xp_field(raw: RawValue) -> RawValue {
    let bytes = match raw {
        RawValue::ByteBuffer(bytes) => bytes,
        RawValue::IntArray(ints) => match int_bytes(&ints) {
            Some(bytes) => bytes,
            None => return RawValue::IntArray(ints),
        },
        other => return other,
    };

    let text = utf16le_lossy(&bytes);
    let mut parts = split_delimited(text.trim_end_matches('\0'));
    match parts.len() {
        0 => RawValue::Text(String::new()),
        1 => RawValue::Text(parts.remove(0)),
        _ => RawValue::List(parts.into_iter().map(RawValue::Text).collect()),
    }
}

fn int_bytes(ints: &[i64]) -> Option<Vec<u8>> {
    ints.iter().map(|&i| u8::try_from(i).ok()).collect()
}

/// UTF-16LE decode that drops invalid units and a dangling odd byte.
fn utf16le_lossy(bytes: &[u8]) -> String {
    let units = bytes.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]]));
    char::decode_utf16(units).filter_map(Result::ok).collect()
}

fn user_comment(text: &str) -> String {
    let stripped = CHARSET_PREFIX.replace(text, "");
    clean_text(stripped.trim_end_matches('\0').trim())
}
