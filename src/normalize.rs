//! Canonicalization of raw tag values into JSON-safe [`NormalizedValue`]s.
//!
//! [`normalize`] is pure and total: every [`RawValue`] shape has a
//! deterministic result, and feeding a normalized value back in (via
//! `RawValue::from`) returns an equal value.

use std::collections::BTreeMap;

use crate::model::{MetadataMap, NormalizedValue, RawValue};

/// A text decoder over raw bytes. `None` means the bytes are not valid in
/// that encoding.
pub type TextDecoder = fn(&[u8]) -> Option<String>;

/// Decoders tried, in order, on byte buffers.
pub const BUFFER_DECODERS: [TextDecoder; 4] = [utf8, utf16le, utf16be, latin1];

/// Decoders tried, in order, on integer arrays that look like bytes.
/// UTF-16LE goes first because that is how the Windows XP* tags arrive.
pub const BYTE_ARRAY_DECODERS: [TextDecoder; 3] = [utf16le, utf8, latin1];

pub fn utf8(bytes: &[u8]) -> Option<String> {
    std::str::from_utf8(bytes).ok().map(str::to_string)
}

pub fn utf16le(bytes: &[u8]) -> Option<String> {
    utf16(bytes, u16::from_le_bytes)
}

pub fn utf16be(bytes: &[u8]) -> Option<String> {
    utf16(bytes, u16::from_be_bytes)
}

pub fn latin1(bytes: &[u8]) -> Option<String> {
    Some(bytes.iter().map(|&b| b as char).collect())
}

fn utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units = bytes.chunks_exact(2).map(|c| unit([c[0], c[1]]));
    char::decode_utf16(units).collect::<Result<String, _>>().ok()
}

/// Run `decoders` in order and return the first successful decode.
pub fn decode_first(bytes: &[u8], decoders: &[TextDecoder]) -> Option<String> {
    decoders.iter().find_map(|decode| decode(bytes))
}

/// Drop trailing NULs, then every C0 control other than `\t` and `\n`,
/// plus DEL.
pub fn clean_text(s: &str) -> String {
    s.trim_end_matches('\0')
        .chars()
        .filter(|&c| !matches!(c, '\x00'..='\x08' | '\x0b'..='\x1f' | '\x7f'))
        .collect()
}

/// Short hex summary for bytes no decoder accepted.
pub fn hex_summary(bytes: &[u8]) -> String {
    let prefix: String = bytes.iter().take(16).map(|b| format!("{b:02x}")).collect();
    let ellipsis = if bytes.len() > 16 { "..." } else { "" };
    format!("<bytes {} bytes: {prefix}{ellipsis}>", bytes.len())
}

/// Split on `;`, `,` and NUL, trimming parts and dropping empty ones.
pub fn split_delimited(s: &str) -> Vec<String> {
    s.split([';', ',', '\0'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reduce a `{namespace}local` key to `local`.
pub fn strip_namespace(key: &str) -> &str {
    match key.rfind('}') {
        Some(pos) => &key[pos + 1..],
        None => key,
    }
}

fn round8(x: f64) -> f64 {
    (x * 1e8).round() / 1e8
}

/// Value of a rational, rounded to 8 decimal places. A zero denominator
/// yields 0; `None` when the quotient is not a finite number.
pub fn rational(num: i64, den: i64) -> Option<f64> {
    if den == 0 {
        return Some(0.0);
    }
    let value = round8(num as f64 / den as f64);
    value.is_finite().then_some(value)
}

/// Normalize one raw value.
pub fn normalize(value: RawValue) -> NormalizedValue {
    match value {
        RawValue::ByteBuffer(bytes) => match decode_first(&bytes, &BUFFER_DECODERS) {
            Some(text) => NormalizedValue::Text(clean_text(&text)),
            None => NormalizedValue::Text(hex_summary(&bytes)),
        },
        RawValue::NestedMap(entries) => NormalizedValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (strip_namespace(&k).to_string(), normalize(v)))
                .collect(),
        ),
        RawValue::RationalPair(num, den) => normalize_rational(num, den),
        RawValue::IntArray(ints) => normalize_int_array(ints),
        RawValue::RationalArray(pairs) => normalize_rational_array(pairs),
        RawValue::List(items) => NormalizedValue::List(items.into_iter().map(normalize).collect()),
        RawValue::Integer(i) => NormalizedValue::Number(i as f64),
        RawValue::Float(f) => NormalizedValue::Number(f),
        RawValue::Text(s) => NormalizedValue::Text(s),
    }
}

/// Normalize every value of a flat map, namespace-stripping its keys.
pub fn normalize_map<I>(entries: I) -> MetadataMap
where
    I: IntoIterator<Item = (String, RawValue)>,
{
    let mut out = BTreeMap::new();
    for (key, value) in entries {
        out.insert(strip_namespace(&key).to_string(), normalize(value));
    }
    out
}

fn normalize_rational(num: i64, den: i64) -> NormalizedValue {
    match rational(num, den) {
        Some(v) => NormalizedValue::Number(v),
        None => NormalizedValue::List(vec![
            NormalizedValue::Number(num as f64),
            NormalizedValue::Number(den as f64),
        ]),
    }
}

fn normalize_int_array(ints: Vec<i64>) -> NormalizedValue {
    if let [num, den] = ints[..] {
        return normalize_rational(num, den);
    }
    if !ints.is_empty() && ints.iter().all(|i| (0..=255).contains(i)) {
        let bytes: Vec<u8> = ints.iter().map(|&i| i as u8).collect();
        if let Some(text) = decode_first(&bytes, &BYTE_ARRAY_DECODERS) {
            return byte_string(clean_text(&text));
        }
    }
    NormalizedValue::List(ints.into_iter().map(|i| NormalizedValue::Number(i as f64)).collect())
}

fn byte_string(text: String) -> NormalizedValue {
    if text.chars().count() <= 2 {
        return NormalizedValue::Text(text);
    }
    let mut parts = split_delimited(&text);
    match parts.len() {
        0 => NormalizedValue::Text(text),
        1 => NormalizedValue::Text(parts.remove(0)),
        _ => NormalizedValue::List(parts.into_iter().map(NormalizedValue::Text).collect()),
    }
}

fn normalize_rational_array(pairs: Vec<(i64, i64)>) -> NormalizedValue {
    let floats: Option<Vec<f64>> = pairs.iter().map(|&(n, d)| rational(n, d)).collect();
    match floats {
        Some(f) if f.len() == 3 => NormalizedValue::Number(f[0] + f[1] / 60.0 + f[2] / 3600.0),
        Some(f) => NormalizedValue::List(f.into_iter().map(NormalizedValue::Number).collect()),
        None => NormalizedValue::List(
            pairs.into_iter().map(|(n, d)| normalize_rational(n, d)).collect(),
        ),
    }
}
