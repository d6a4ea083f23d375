use exif::experimental::Writer;
use exif::{Context, Field, In, Rational, Reader, SRational, Tag, Value};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;

use super::catalog::{self, Ifd, TagKind};
use crate::error::{MetadataError, Phase, Result};
use crate::model::RawValue;

/// EXIF tags of one image, grouped by IFD, plus the embedded JPEG thumbnail
/// referenced from the 1st IFD.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExifBlock {
    pub ifds: BTreeMap<Ifd, BTreeMap<u16, RawValue>>,
    pub thumbnail: Option<Vec<u8>>,
}

impl ExifBlock {
    pub fn get(&self, ifd: Ifd, tag: u16) -> Option<&RawValue> {
        self.ifds.get(&ifd)?.get(&tag)
    }

    pub fn insert(&mut self, ifd: Ifd, tag: u16, value: RawValue) {
        self.ifds.entry(ifd).or_default().insert(tag, value);
    }

    pub fn remove(&mut self, ifd: Ifd, tag: u16) -> Option<RawValue> {
        self.ifds.get_mut(&ifd)?.remove(&tag)
    }

    pub fn tag_count(&self) -> usize {
        self.ifds.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tag_count() == 0 && self.thumbnail.is_none()
    }
}

/// Pixel payload for a single uncompressed TIFF strip.
#[derive(Debug, Clone, Copy)]
pub struct Strip<'a> {
    pub width: u32,
    pub height: u32,
    /// Samples per pixel.
    pub samples: u16,
    /// 8 or 16. Sixteen-bit samples in `data` are big-endian, matching the
    /// byte order [`write_tiff`] writes.
    pub bits_per_sample: u16,
    /// 1 = BlackIsZero, 2 = RGB.
    pub photometric: u16,
    pub has_alpha: bool,
    pub data: &'a [u8],
}

// ============================================================================
// Reading
// ============================================================================

/// Read the EXIF block of an image file.
///
/// Returns `Ok(None)` when the container has no EXIF at all. Fields that
/// fail to parse are skipped; the rest of the block is still returned.
pub fn read_block(path: &Path) -> Result<Option<ExifBlock>> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let result = Reader::new()
        .continue_on_error(true)
        .read_from_container(&mut reader)
        .or_else(|e| {
            e.distill_partial_result(|errors| {
                for err in errors {
                    log::debug!("Skipping unreadable EXIF field in {}: {err}", path.display());
                }
            })
        });

    match result {
        Ok(exif) => Ok(Some(block_from(&exif))),
        Err(exif::Error::NotFound(_)) => {
            log::debug!("No EXIF data found in {}", path.display());
            Ok(None)
        }
        Err(e) => Err(MetadataError::decode(Phase::Exif, e)),
    }
}

/// Parse raw TIFF-structured EXIF bytes (no `Exif\0\0` prefix).
pub fn decode_tiff(data: Vec<u8>) -> Result<ExifBlock> {
    let exif = Reader::new()
        .read_raw(data)
        .map_err(|e| MetadataError::decode(Phase::Exif, e))?;
    Ok(block_from(&exif))
}

fn block_from(exif: &exif::Exif) -> ExifBlock {
    let mut block = ExifBlock::default();
    let mut thumb_offset = None;
    let mut thumb_length = None;

    for field in exif.fields() {
        let Some(ifd) = ifd_of(field) else {
            log::debug!("Ignoring field {} outside the known IFDs", field.tag);
            continue;
        };
        let tag = field.tag.number();

        if ifd == Ifd::First {
            match tag {
                catalog::JPEG_INTERCHANGE_FORMAT => thumb_offset = field.value.get_uint(0),
                catalog::JPEG_INTERCHANGE_FORMAT_LENGTH => thumb_length = field.value.get_uint(0),
                _ => {}
            }
        }

        match raw_value(&field.value) {
            Some(raw) => block.insert(ifd, tag, raw),
            None => log::debug!("Skipping {ifd}:0x{tag:04X}: unknown value type"),
        }
    }

    if let (Some(offset), Some(length)) = (thumb_offset, thumb_length) {
        let (start, end) = (offset as usize, offset as usize + length as usize);
        block.thumbnail = exif.buf().get(start..end).map(<[u8]>::to_vec);
    }

    block
}

fn ifd_of(field: &Field) -> Option<Ifd> {
    match (field.tag.context(), field.ifd_num) {
        (Context::Tiff, In::PRIMARY) => Some(Ifd::Zeroth),
        (Context::Tiff, In::THUMBNAIL) => Some(Ifd::First),
        (Context::Exif, In::PRIMARY) => Some(Ifd::Exif),
        (Context::Gps, In::PRIMARY) => Some(Ifd::Gps),
        (Context::Interop, In::PRIMARY) => Some(Ifd::Interop),
        _ => None,
    }
}

fn ints<T: Copy + Into<i64>>(values: &[T]) -> RawValue {
    match values {
        [single] => RawValue::Integer((*single).into()),
        _ => RawValue::IntArray(values.iter().map(|&v| v.into()).collect()),
    }
}

fn rationals(pairs: Vec<(i64, i64)>) -> RawValue {
    if let [(num, den)] = pairs[..] {
        return RawValue::RationalPair(num, den);
    }
    RawValue::RationalArray(pairs)
}

fn floats(values: Vec<f64>) -> RawValue {
    if let [single] = values[..] {
        return RawValue::Float(single);
    }
    RawValue::List(values.into_iter().map(RawValue::Float).collect())
}

fn raw_value(value: &Value) -> Option<RawValue> {
    let raw = match value {
        Value::Byte(v) => ints(v),
        Value::SByte(v) => ints(v),
        Value::Short(v) => ints(v),
        Value::SShort(v) => ints(v),
        Value::Long(v) => ints(v),
        Value::SLong(v) => ints(v),
        Value::Ascii(strings) => RawValue::ByteBuffer(strings.join(&0u8)),
        Value::Undefined(bytes, _) => RawValue::ByteBuffer(bytes.clone()),
        Value::Rational(v) => {
            rationals(v.iter().map(|r| (i64::from(r.num), i64::from(r.denom))).collect())
        }
        Value::SRational(v) => {
            rationals(v.iter().map(|r| (i64::from(r.num), i64::from(r.denom))).collect())
        }
        Value::Float(v) => floats(v.iter().map(|&f| f64::from(f)).collect()),
        Value::Double(v) => floats(v.clone()),
        _ => return None,
    };
    Some(raw)
}

// ============================================================================
// Writing
// ============================================================================

/// Convert a block into codec fields.
///
/// Each value is written with the TIFF type the catalog records for its tag
/// (or one inferred from the value for unknown tags). Values that do not
/// fit that type are skipped with a warning. Pointers and offsets are left
/// out; the writer computes them.
pub fn to_fields(block: &ExifBlock) -> Vec<Field> {
    let mut fields = Vec::new();
    for (&ifd, tags) in &block.ifds {
        for (&tag, raw) in tags {
            if catalog::is_layout_tag(ifd, tag) {
                continue;
            }
            let kind = catalog::lookup(ifd, tag)
                .map(|d| d.kind)
                .unwrap_or_else(|| infer_kind(raw));
            match encode_value(raw, kind) {
                Some(value) => fields.push(Field {
                    tag: Tag(context_of(ifd), tag),
                    ifd_num: in_of(ifd),
                    value,
                }),
                None => log::warn!(
                    "Skipping EXIF tag {}: value does not fit {kind:?}",
                    catalog::display_name(ifd, tag)
                ),
            }
        }
    }
    fields
}

/// Serialize a block to TIFF-structured bytes, ready for a JPEG APP1
/// segment (without the `Exif\0\0` prefix).
pub fn serialize(block: &ExifBlock) -> Result<Vec<u8>> {
    let fields = to_fields(block);
    let mut writer = Writer::new();
    for field in &fields {
        writer.push_field(field);
    }
    if let Some(thumb) = &block.thumbnail {
        writer.set_jpeg(thumb, In::THUMBNAIL);
    }

    let mut buf = Cursor::new(Vec::new());
    writer
        .write(&mut buf, false)
        .map_err(|e| MetadataError::encode(Phase::Exif, e))?;
    Ok(buf.into_inner())
}

/// Write a complete single-strip TIFF file carrying `block` as its tags.
/// Pixel-layout tags already in the block are replaced by ones describing
/// `strip`.
pub fn write_tiff(block: &ExifBlock, strip: &Strip) -> Result<Vec<u8>> {
    let mut fields: Vec<Field> = to_fields(block)
        .into_iter()
        .filter(|f| {
            !(f.ifd_num == In::PRIMARY
                && f.tag.context() == Context::Tiff
                && catalog::is_structural_tag(Ifd::Zeroth, f.tag.number()))
        })
        .collect();
    fields.extend(strip_fields(strip));

    let strips = [strip.data];
    let mut writer = Writer::new();
    for field in &fields {
        writer.push_field(field);
    }
    writer.set_strips(&strips, In::PRIMARY);
    if let Some(thumb) = &block.thumbnail {
        writer.set_jpeg(thumb, In::THUMBNAIL);
    }

    let mut buf = Cursor::new(Vec::new());
    writer
        .write(&mut buf, false)
        .map_err(|e| MetadataError::encode(Phase::Exif, e))?;
    Ok(buf.into_inner())
}

fn strip_fields(strip: &Strip) -> Vec<Field> {
    let primary = |tag: u16, value: Value| Field {
        tag: Tag(Context::Tiff, tag),
        ifd_num: In::PRIMARY,
        value,
    };
    let mut fields = vec![
        primary(catalog::IMAGE_WIDTH, Value::Long(vec![strip.width])),
        primary(catalog::IMAGE_LENGTH, Value::Long(vec![strip.height])),
        primary(
            catalog::BITS_PER_SAMPLE,
            Value::Short(vec![strip.bits_per_sample; strip.samples as usize]),
        ),
        primary(catalog::COMPRESSION, Value::Short(vec![1])),
        primary(catalog::PHOTOMETRIC_INTERPRETATION, Value::Short(vec![strip.photometric])),
        primary(catalog::SAMPLES_PER_PIXEL, Value::Short(vec![strip.samples])),
        primary(catalog::ROWS_PER_STRIP, Value::Long(vec![strip.height])),
        primary(catalog::PLANAR_CONFIGURATION, Value::Short(vec![1])),
    ];
    if strip.has_alpha {
        // 2 = unassociated alpha
        fields.push(primary(catalog::EXTRA_SAMPLES, Value::Short(vec![2])));
    }
    fields
}

fn context_of(ifd: Ifd) -> Context {
    match ifd {
        Ifd::Zeroth | Ifd::First => Context::Tiff,
        Ifd::Exif => Context::Exif,
        Ifd::Gps => Context::Gps,
        Ifd::Interop => Context::Interop,
    }
}

fn in_of(ifd: Ifd) -> In {
    match ifd {
        Ifd::First => In::THUMBNAIL,
        _ => In::PRIMARY,
    }
}

/// Best TIFF type for a value whose tag the catalog does not know.
fn infer_kind(raw: &RawValue) -> TagKind {
    match raw {
        RawValue::ByteBuffer(_) | RawValue::NestedMap(_) => TagKind::Undefined,
        RawValue::Text(_) => TagKind::Ascii,
        RawValue::Integer(i) if *i < 0 => TagKind::SLong,
        RawValue::Integer(_) => TagKind::Long,
        RawValue::IntArray(v) if v.iter().any(|i| *i < 0) => TagKind::SLong,
        RawValue::IntArray(_) => TagKind::Long,
        RawValue::RationalPair(n, d) if *n < 0 || *d < 0 => TagKind::SRational,
        RawValue::RationalArray(v) if v.iter().any(|(n, d)| *n < 0 || *d < 0) => {
            TagKind::SRational
        }
        RawValue::RationalPair(..) | RawValue::RationalArray(_) => TagKind::Rational,
        RawValue::Float(_) | RawValue::List(_) => TagKind::Double,
    }
}

fn raw_ints(raw: &RawValue) -> Option<Vec<i64>> {
    match raw {
        RawValue::Integer(i) => Some(vec![*i]),
        RawValue::IntArray(v) => Some(v.clone()),
        RawValue::List(items) => items
            .iter()
            .map(|item| match item {
                RawValue::Integer(i) => Some(*i),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

fn raw_bytes(raw: &RawValue) -> Option<Vec<u8>> {
    match raw {
        RawValue::ByteBuffer(b) => Some(b.clone()),
        RawValue::Text(s) => Some(s.as_bytes().to_vec()),
        _ => narrow(&raw_ints(raw)?),
    }
}

fn raw_pairs(raw: &RawValue) -> Option<Vec<(i64, i64)>> {
    match raw {
        RawValue::RationalPair(n, d) => Some(vec![(*n, *d)]),
        RawValue::RationalArray(v) => Some(v.clone()),
        RawValue::IntArray(v) if v.len() == 2 => Some(vec![(v[0], v[1])]),
        RawValue::Integer(i) => Some(vec![(*i, 1)]),
        _ => None,
    }
}

fn raw_floats(raw: &RawValue) -> Option<Vec<f64>> {
    match raw {
        RawValue::Float(f) => Some(vec![*f]),
        RawValue::List(items) => items
            .iter()
            .map(|item| match item {
                RawValue::Float(f) => Some(*f),
                RawValue::Integer(i) => Some(*i as f64),
                _ => None,
            })
            .collect(),
        _ => Some(raw_ints(raw)?.into_iter().map(|i| i as f64).collect()),
    }
}

fn narrow<T: TryFrom<i64>>(values: &[i64]) -> Option<Vec<T>> {
    values.iter().map(|&v| T::try_from(v).ok()).collect()
}

fn narrow_pairs<T: TryFrom<i64>>(pairs: &[(i64, i64)]) -> Option<Vec<(T, T)>> {
    pairs
        .iter()
        .map(|&(n, d)| Some((T::try_from(n).ok()?, T::try_from(d).ok()?)))
        .collect()
}

fn encode_value(raw: &RawValue, kind: TagKind) -> Option<Value> {
    let value = match kind {
        TagKind::Ascii => {
            let mut bytes = raw_bytes(raw)?;
            while bytes.last() == Some(&0) {
                bytes.pop();
            }
            Value::Ascii(vec![bytes])
        }
        TagKind::Byte => Value::Byte(raw_bytes(raw)?),
        TagKind::Undefined => Value::Undefined(raw_bytes(raw)?, 0),
        TagKind::SByte => Value::SByte(narrow(&raw_ints(raw)?)?),
        TagKind::Short => Value::Short(narrow(&raw_ints(raw)?)?),
        TagKind::SShort => Value::SShort(narrow(&raw_ints(raw)?)?),
        TagKind::Long => Value::Long(narrow(&raw_ints(raw)?)?),
        TagKind::SLong => Value::SLong(narrow(&raw_ints(raw)?)?),
        TagKind::Rational => Value::Rational(
            narrow_pairs::<u32>(&raw_pairs(raw)?)?
                .into_iter()
                .map(|(num, denom)| Rational { num, denom })
                .collect(),
        ),
        TagKind::SRational => Value::SRational(
            narrow_pairs::<i32>(&raw_pairs(raw)?)?
                .into_iter()
                .map(|(num, denom)| SRational { num, denom })
                .collect(),
        ),
        TagKind::Float => Value::Float(raw_floats(raw)?.into_iter().map(|f| f as f32).collect()),
        TagKind::Double => Value::Double(raw_floats(raw)?),
    };
    Some(value)
}
