use image::{ColorType, ImageDecoder, ImageFormat, ImageReader};
use img_parts::jpeg::{Jpeg, JpegSegment};
use img_parts::png::{Png, PngChunk};
use img_parts::{Bytes, ImageEXIF};
use std::fs;
use std::path::Path;

use crate::error::{MetadataError, Phase, Result};
use crate::exif::{self, ExifBlock, Strip};
use crate::model::GeneralInfo;

pub const EXIF_PREFIX: &[u8] = b"Exif\0\0";
pub const XMP_HEADER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
const XMP_EXTENSION_HEADER: &[u8] = b"http://ns.adobe.com/xmp/extension/\0";
const IPTC_HEADER: &[u8] = b"Photoshop 3.0\0";
const APP1: u8 = 0xE1;
const APP13: u8 = 0xED;

/// iTXt keyword (with its terminator) marking an XMP packet in PNG.
pub const PNG_XMP_KEYWORD: &[u8] = b"XML:com.adobe.xmp\0";
const CHUNK_IHDR: [u8; 4] = *b"IHDR";
const CHUNK_ITXT: [u8; 4] = *b"iTXt";
const CHUNK_TEXT: [u8; 4] = *b"tEXt";
const CHUNK_ZTXT: [u8; 4] = *b"zTXt";
const CHUNK_EXIF: [u8; 4] = *b"eXIf";

/// Container format of a supported image file.
///
/// # Example
///
/// ```rust
/// use imgmeta::container::ImageKind;
/// use std::path::Path;
///
/// assert_eq!(ImageKind::from_path(Path::new("IMG_0001.JPG")), Some(ImageKind::Jpeg));
/// assert_eq!(ImageKind::from_path(Path::new("scan.tif")), Some(ImageKind::Tiff));
/// assert_eq!(ImageKind::from_path(Path::new("clip.webp")), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// JPEG: EXIF and XMP in APP1 segments
    Jpeg,
    /// PNG: XMP in an iTXt chunk; EXIF is read but never written
    Png,
    /// TIFF: tags and XMLPacket written by re-encoding a single strip
    Tiff,
    /// GIF: passthrough only
    Gif,
    /// BMP: passthrough only
    Bmp,
}

impl ImageKind {
    /// Determine the image kind from a file path extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "tif" | "tiff" => Some(Self::Tiff),
            "gif" => Some(Self::Gif),
            "bmp" => Some(Self::Bmp),
            _ => None,
        }
    }

    /// Whether an EXIF block can be read from this container.
    pub fn carries_exif(self) -> bool {
        matches!(self, Self::Jpeg | Self::Png | Self::Tiff)
    }

    /// Whether edited EXIF is written back. PNG, GIF and BMP are copied
    /// unchanged during the EXIF phase.
    pub fn writes_exif(self) -> bool {
        matches!(self, Self::Jpeg | Self::Tiff)
    }
}

// ============================================================================
// General info
// ============================================================================

/// Format, pixel size, channel layout and byte size of an image.
pub fn general_info(path: &Path) -> Result<GeneralInfo> {
    let file_size = fs::metadata(path)?.len();
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let format = reader.format().map(format_name);
    let decoder = reader
        .into_decoder()
        .map_err(|e| MetadataError::decode(Phase::General, e))?;
    let (width, height) = decoder.dimensions();

    Ok(GeneralInfo {
        format,
        size: Some([width, height]),
        mode: Some(mode_name(decoder.color_type())),
        file_size,
    })
}

fn format_name(format: ImageFormat) -> String {
    format!("{format:?}").to_uppercase()
}

/// Conventional channel-layout name for a color type.
pub fn mode_name(color: ColorType) -> String {
    match color {
        ColorType::L8 => "L".into(),
        ColorType::La8 => "LA".into(),
        ColorType::Rgb8 => "RGB".into(),
        ColorType::Rgba8 => "RGBA".into(),
        ColorType::L16 => "I;16".into(),
        ColorType::La16 => "LA;16".into(),
        ColorType::Rgb16 => "RGB;16".into(),
        ColorType::Rgba16 => "RGBA;16".into(),
        ColorType::Rgb32F => "RGB;F".into(),
        ColorType::Rgba32F => "RGBA;F".into(),
        other => format!("{other:?}"),
    }
}

// ============================================================================
// Reading containers
// ============================================================================

pub(crate) fn read_jpeg(path: &Path, phase: Phase) -> Result<Jpeg> {
    let bytes = fs::read(path)?;
    Jpeg::from_bytes(Bytes::from(bytes)).map_err(|e| MetadataError::decode(phase, format!("Failed to parse JPEG: {e}")))
}

pub(crate) fn read_png(path: &Path, phase: Phase) -> Result<Png> {
    let bytes = fs::read(path)?;
    Png::from_bytes(Bytes::from(bytes)).map_err(|e| MetadataError::decode(phase, format!("Failed to parse PNG: {e}")))
}

/// The XMP packet stored in a JPEG APP1 segment, if any.
pub fn jpeg_xmp(jpeg: &Jpeg) -> Option<String> {
    let pos = find_xmp_segment_pos(jpeg.segments())?;
    let contents = jpeg.segments()[pos].contents();
    Some(String::from_utf8_lossy(&contents[XMP_HEADER.len()..]).into_owned())
}

/// The XMP packet stored in a PNG `iTXt` chunk, if any.
pub fn png_xmp(png: &Png) -> Option<String> {
    png.chunks()
        .iter()
        .filter(|c| c.kind() == CHUNK_ITXT)
        .find_map(|c| itxt_xmp_text(c.contents()))
        .map(|text| String::from_utf8_lossy(text).into_owned())
}

/// Text of an uncompressed XMP iTXt chunk: keyword, compression flag and
/// method, language tag, translated keyword, then the packet.
fn itxt_xmp_text(data: &[u8]) -> Option<&[u8]> {
    let rest = data.strip_prefix(PNG_XMP_KEYWORD)?;
    let (&compressed, rest) = rest.split_first()?;
    if compressed != 0 {
        log::debug!("Skipping compressed XMP iTXt chunk");
        return None;
    }
    let (_method, rest) = rest.split_first()?;
    let lang_end = rest.iter().position(|&b| b == 0)?;
    let rest = &rest[lang_end + 1..];
    let translated_end = rest.iter().position(|&b| b == 0)?;
    Some(&rest[translated_end + 1..])
}

fn is_xmp_itxt(chunk: &PngChunk) -> bool {
    chunk.kind() == CHUNK_ITXT && chunk.contents().starts_with(PNG_XMP_KEYWORD)
}

/// Find the position of the EXIF APP1 segment.
fn find_exif_segment_pos(segments: &[JpegSegment]) -> Option<usize> {
    segments
        .iter()
        .position(|s| s.marker() == APP1 && s.contents().starts_with(EXIF_PREFIX))
}

/// Find the position of the XMP APP1 segment.
fn find_xmp_segment_pos(segments: &[JpegSegment]) -> Option<usize> {
    segments
        .iter()
        .position(|s| s.marker() == APP1 && s.contents().starts_with(XMP_HEADER))
}

// ============================================================================
// Writing
// ============================================================================

/// Write `block` into `target`, taking pixels and other segments from
/// `source`. `source` and `target` may be the same file.
///
/// PNG, GIF and BMP get a plain copy.
pub fn embed_exif(source: &Path, target: &Path, kind: ImageKind, block: &ExifBlock) -> Result<()> {
    match kind {
        ImageKind::Jpeg => {
            let mut jpeg = read_jpeg(source, Phase::Exif)?;
            let tiff = if block.is_empty() { None } else { Some(exif::serialize(block)?) };
            set_jpeg_exif(&mut jpeg, tiff);
            fs::write(target, jpeg.encoder().bytes())?;
        }
        ImageKind::Tiff => {
            let bytes = reencode_tiff(source, block, Phase::Exif)?;
            fs::write(target, bytes)?;
        }
        ImageKind::Png | ImageKind::Gif | ImageKind::Bmp => {
            log::debug!("EXIF is not written to {kind:?} files, copying unchanged");
            copy_if_needed(source, target)?;
        }
    }
    Ok(())
}

/// Replace (or remove, for `None`) the EXIF APP1 segment, keeping it where
/// the old one was so it stays ahead of the XMP segment.
fn set_jpeg_exif(jpeg: &mut Jpeg, tiff: Option<Vec<u8>>) {
    let orig_exif_pos = find_exif_segment_pos(jpeg.segments());
    let Some(tiff) = tiff else {
        jpeg.set_exif(None);
        return;
    };
    jpeg.set_exif(Some(Bytes::from(tiff)));

    // set_exif() inserts at a fixed position, which may be after XMP APP1.
    if let Some(new_pos) = find_exif_segment_pos(jpeg.segments()) {
        let target_pos = orig_exif_pos.unwrap_or(1);
        if target_pos < new_pos {
            let segments = jpeg.segments_mut();
            let seg = segments.remove(new_pos);
            segments.insert(target_pos, seg);
        }
    }
}

/// Embed an XMP packet into `path` in place.
pub fn embed_xmp(path: &Path, kind: ImageKind, packet: &str) -> Result<()> {
    match kind {
        ImageKind::Jpeg => {
            let mut jpeg = read_jpeg(path, Phase::Xmp)?;
            set_jpeg_xmp(&mut jpeg, packet);
            fs::write(path, jpeg.encoder().bytes())?;
        }
        ImageKind::Png => {
            let mut png = read_png(path, Phase::Xmp)?;
            set_png_xmp(&mut png, packet);
            fs::write(path, png.encoder().bytes())?;
        }
        ImageKind::Tiff => {
            let mut block = exif::read_block(path)?.unwrap_or_default();
            block.insert(
                exif::Ifd::Zeroth,
                exif::catalog::XML_PACKET,
                crate::model::RawValue::ByteBuffer(packet.as_bytes().to_vec()),
            );
            let bytes = reencode_tiff(path, &block, Phase::Xmp)?;
            fs::write(path, bytes)?;
        }
        ImageKind::Gif | ImageKind::Bmp => {
            return Err(MetadataError::encode(
                Phase::Xmp,
                format!("XMP embedding is not supported for {kind:?} files"),
            ));
        }
    }
    Ok(())
}

fn set_jpeg_xmp(jpeg: &mut Jpeg, packet: &str) {
    let mut contents = Vec::with_capacity(XMP_HEADER.len() + packet.len());
    contents.extend_from_slice(XMP_HEADER);
    contents.extend_from_slice(packet.as_bytes());
    let new_segment = JpegSegment::new_with_contents(APP1, Bytes::from(contents));

    let segments = jpeg.segments_mut();
    if let Some(pos) = find_xmp_segment_pos(segments) {
        segments[pos] = new_segment;
    } else {
        // Insert after EXIF APP1 or at position 2
        let insert_pos = find_exif_segment_pos(segments)
            .map(|p| p + 1)
            .unwrap_or(2)
            .min(segments.len());
        segments.insert(insert_pos, new_segment);
    }
}

fn set_png_xmp(png: &mut Png, packet: &str) {
    let mut data = Vec::with_capacity(PNG_XMP_KEYWORD.len() + 4 + packet.len());
    data.extend_from_slice(PNG_XMP_KEYWORD);
    data.push(0); // compression flag
    data.push(0); // compression method
    data.push(0); // language tag
    data.push(0); // translated keyword
    data.extend_from_slice(packet.as_bytes());
    let chunk = PngChunk::new(CHUNK_ITXT, Bytes::from(data));

    let chunks = png.chunks_mut();
    chunks.retain(|c| !is_xmp_itxt(c));
    let insert_pos = chunks
        .iter()
        .position(|c| c.kind() == CHUNK_IHDR)
        .map(|p| p + 1)
        .unwrap_or(0);
    chunks.insert(insert_pos, chunk);
}

/// Decode `source` and write it back as a single uncompressed strip
/// carrying `block`. Eight- and sixteen-bit integer images keep their
/// sample depth; anything else fails rather than losing precision.
fn reencode_tiff(source: &Path, block: &ExifBlock, phase: Phase) -> Result<Vec<u8>> {
    let img = image::open(source).map_err(|e| MetadataError::encode(phase, e))?;
    let (width, height) = (img.width(), img.height());
    let color = img.color();

    let (samples, photometric, bits_per_sample, data) = match color {
        ColorType::L8 => (1, 1, 8, img.into_luma8().into_raw()),
        ColorType::La8 => (2, 1, 8, img.into_luma_alpha8().into_raw()),
        ColorType::Rgb8 => (3, 2, 8, img.into_rgb8().into_raw()),
        ColorType::Rgba8 => (4, 2, 8, img.into_rgba8().into_raw()),
        ColorType::L16 => (1, 1, 16, be_bytes(img.into_luma16().into_raw())),
        ColorType::La16 => (2, 1, 16, be_bytes(img.into_luma_alpha16().into_raw())),
        ColorType::Rgb16 => (3, 2, 16, be_bytes(img.into_rgb16().into_raw())),
        ColorType::Rgba16 => (4, 2, 16, be_bytes(img.into_rgba16().into_raw())),
        other => {
            return Err(MetadataError::encode(
                phase,
                format!("cannot re-encode {} TIFF without losing precision", mode_name(other)),
            ));
        }
    };
    let strip = Strip {
        width,
        height,
        samples,
        bits_per_sample,
        photometric,
        has_alpha: color.has_alpha(),
        data: &data,
    };
    exif::write_tiff(block, &strip).map_err(|e| match e {
        MetadataError::EncodeFailure { message, .. } => MetadataError::encode(phase, message),
        other => other,
    })
}

fn be_bytes(samples: Vec<u16>) -> Vec<u8> {
    samples.into_iter().flat_map(u16::to_be_bytes).collect()
}

fn copy_if_needed(source: &Path, target: &Path) -> Result<()> {
    if source != target {
        fs::copy(source, target)?;
    }
    Ok(())
}

// ============================================================================
// Stripping
// ============================================================================

/// Remove embedded metadata from `source`, writing the result to `target`.
///
/// JPEG loses its EXIF, XMP and IPTC segments, PNG its `eXIf` and text
/// chunks, both without touching pixel data. TIFF is re-encoded with
/// pixel-layout tags only. Returns the number of entries removed, or `None`
/// for formats that are only copied.
pub fn strip(source: &Path, target: &Path, kind: ImageKind) -> Result<Option<usize>> {
    match kind {
        ImageKind::Jpeg => {
            let mut jpeg = read_jpeg(source, Phase::General)?;
            let segments = jpeg.segments_mut();
            let before = segments.len();
            segments.retain(|s| !is_metadata_segment(s));
            let removed = before - segments.len();
            fs::write(target, jpeg.encoder().bytes())?;
            Ok(Some(removed))
        }
        ImageKind::Png => {
            let mut png = read_png(source, Phase::General)?;
            let chunks = png.chunks_mut();
            let before = chunks.len();
            chunks.retain(|c| ![CHUNK_EXIF, CHUNK_ITXT, CHUNK_TEXT, CHUNK_ZTXT].contains(&c.kind()));
            let removed = before - chunks.len();
            fs::write(target, png.encoder().bytes())?;
            Ok(Some(removed))
        }
        ImageKind::Tiff => {
            let removed = exif::read_block(source)?
                .map(|b| {
                    b.ifds
                        .iter()
                        .flat_map(|(&ifd, tags)| tags.keys().map(move |&t| (ifd, t)))
                        .filter(|&(ifd, t)| {
                            !exif::catalog::is_structural_tag(ifd, t)
                                && !exif::catalog::is_layout_tag(ifd, t)
                        })
                        .count()
                })
                .unwrap_or(0);
            let bytes = reencode_tiff(source, &ExifBlock::default(), Phase::General)?;
            fs::write(target, bytes)?;
            Ok(Some(removed))
        }
        ImageKind::Gif | ImageKind::Bmp => {
            copy_if_needed(source, target)?;
            Ok(None)
        }
    }
}

fn is_metadata_segment(segment: &JpegSegment) -> bool {
    let contents = segment.contents();
    match segment.marker() {
        APP1 => {
            contents.starts_with(EXIF_PREFIX)
                || contents.starts_with(XMP_HEADER)
                || contents.starts_with(XMP_EXTENSION_HEADER)
        }
        APP13 => contents.starts_with(IPTC_HEADER),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exif::{Ifd, catalog};
    use crate::model::RawValue;
    use tempfile::TempDir;

    fn rgb_image(dir: &TempDir, name: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        image::RgbImage::from_pixel(4, 3, image::Rgb([200, 100, 50]))
            .save(&path)
            .unwrap();
        path
    }

    fn make_block() -> ExifBlock {
        let mut block = ExifBlock::default();
        block.insert(Ifd::Zeroth, catalog::MAKE, RawValue::ByteBuffer(b"Canon".to_vec()));
        block.insert(Ifd::Zeroth, catalog::ARTIST, RawValue::ByteBuffer(b"Jane".to_vec()));
        block
    }

    // ── ImageKind ────────────────────────────────────────────────────

    #[test]
    fn image_kind_from_extension() {
        assert_eq!(ImageKind::from_path(Path::new("a.JPEG")), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_path(Path::new("a.png")), Some(ImageKind::Png));
        assert_eq!(ImageKind::from_path(Path::new("a.TIFF")), Some(ImageKind::Tiff));
        assert_eq!(ImageKind::from_path(Path::new("a.gif")), Some(ImageKind::Gif));
        assert_eq!(ImageKind::from_path(Path::new("a.bmp")), Some(ImageKind::Bmp));
        assert_eq!(ImageKind::from_path(Path::new("a.heic")), None);
        assert_eq!(ImageKind::from_path(Path::new("noext")), None);
    }

    #[test]
    fn only_jpeg_and_tiff_write_exif() {
        assert!(ImageKind::Jpeg.writes_exif());
        assert!(ImageKind::Tiff.writes_exif());
        assert!(!ImageKind::Png.writes_exif());
        assert!(ImageKind::Png.carries_exif());
        assert!(!ImageKind::Bmp.carries_exif());
    }

    // ── general info ─────────────────────────────────────────────────

    #[test]
    fn general_info_reports_size_and_mode() {
        let dir = TempDir::new().unwrap();
        let path = rgb_image(&dir, "a.png");
        let info = general_info(&path).unwrap();
        assert_eq!(info.format.as_deref(), Some("PNG"));
        assert_eq!(info.size, Some([4, 3]));
        assert_eq!(info.mode.as_deref(), Some("RGB"));
        assert_eq!(info.file_size, fs::metadata(&path).unwrap().len());
    }

    #[test]
    fn mode_names() {
        assert_eq!(mode_name(ColorType::L8), "L");
        assert_eq!(mode_name(ColorType::Rgba8), "RGBA");
        assert_eq!(mode_name(ColorType::L16), "I;16");
    }

    // ── iTXt parsing ─────────────────────────────────────────────────

    #[test]
    fn itxt_text_skips_header_fields() {
        let mut data = PNG_XMP_KEYWORD.to_vec();
        data.extend_from_slice(&[0, 0]);
        data.extend_from_slice(b"en\0XMP\0<x:xmpmeta/>");
        assert_eq!(itxt_xmp_text(&data), Some(&b"<x:xmpmeta/>"[..]));
    }

    #[test]
    fn compressed_itxt_is_ignored() {
        let mut data = PNG_XMP_KEYWORD.to_vec();
        data.extend_from_slice(&[1, 0, 0, 0]);
        assert_eq!(itxt_xmp_text(&data), None);
    }

    // ── JPEG ─────────────────────────────────────────────────────────

    #[test]
    fn jpeg_exif_and_xmp_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = rgb_image(&dir, "a.jpg");

        embed_exif(&path, &path, ImageKind::Jpeg, &make_block()).unwrap();
        embed_xmp(&path, ImageKind::Jpeg, "<x:xmpmeta>one</x:xmpmeta>").unwrap();
        embed_xmp(&path, ImageKind::Jpeg, "<x:xmpmeta>two</x:xmpmeta>").unwrap();

        let jpeg = read_jpeg(&path, Phase::Xmp).unwrap();
        let exif_pos = find_exif_segment_pos(jpeg.segments()).unwrap();
        let xmp_pos = find_xmp_segment_pos(jpeg.segments()).unwrap();
        assert!(exif_pos < xmp_pos);
        assert_eq!(jpeg_xmp(&jpeg).as_deref(), Some("<x:xmpmeta>two</x:xmpmeta>"));

        let block = exif::read_block(&path).unwrap().unwrap();
        assert_eq!(
            block.get(Ifd::Zeroth, catalog::ARTIST),
            Some(&RawValue::ByteBuffer(b"Jane".to_vec()))
        );
        assert!(image::open(&path).is_ok());
    }

    #[test]
    fn empty_block_removes_jpeg_exif() {
        let dir = TempDir::new().unwrap();
        let path = rgb_image(&dir, "a.jpg");
        embed_exif(&path, &path, ImageKind::Jpeg, &make_block()).unwrap();
        embed_exif(&path, &path, ImageKind::Jpeg, &ExifBlock::default()).unwrap();
        assert!(exif::read_block(&path).unwrap().is_none());
    }

    #[test]
    fn strip_jpeg_drops_metadata_segments() {
        let dir = TempDir::new().unwrap();
        let path = rgb_image(&dir, "a.jpg");
        let out = dir.path().join("clean.jpg");
        embed_exif(&path, &path, ImageKind::Jpeg, &make_block()).unwrap();
        embed_xmp(&path, ImageKind::Jpeg, "<x:xmpmeta/>").unwrap();

        assert_eq!(strip(&path, &out, ImageKind::Jpeg).unwrap(), Some(2));
        let jpeg = read_jpeg(&out, Phase::General).unwrap();
        assert!(jpeg_xmp(&jpeg).is_none());
        assert!(jpeg.exif().is_none());
        assert!(image::open(&out).is_ok());
    }

    // ── PNG ──────────────────────────────────────────────────────────

    #[test]
    fn png_exif_write_is_a_copy() {
        let dir = TempDir::new().unwrap();
        let path = rgb_image(&dir, "a.png");
        let out = dir.path().join("b.png");
        embed_exif(&path, &out, ImageKind::Png, &make_block()).unwrap();
        assert_eq!(fs::read(&path).unwrap(), fs::read(&out).unwrap());
    }

    #[test]
    fn png_xmp_is_replaced_not_duplicated() {
        let dir = TempDir::new().unwrap();
        let path = rgb_image(&dir, "a.png");
        embed_xmp(&path, ImageKind::Png, "<x:xmpmeta>one</x:xmpmeta>").unwrap();
        embed_xmp(&path, ImageKind::Png, "<x:xmpmeta>two</x:xmpmeta>").unwrap();

        let png = read_png(&path, Phase::Xmp).unwrap();
        assert_eq!(png.chunks().iter().filter(|c| is_xmp_itxt(c)).count(), 1);
        assert_eq!(png_xmp(&png).as_deref(), Some("<x:xmpmeta>two</x:xmpmeta>"));
        assert!(image::open(&path).is_ok());

        assert_eq!(strip(&path, &path, ImageKind::Png).unwrap(), Some(1));
        assert!(png_xmp(&read_png(&path, Phase::Xmp).unwrap()).is_none());
    }

    // ── TIFF ─────────────────────────────────────────────────────────

    #[test]
    fn tiff_reencode_carries_tags_and_packet() {
        let dir = TempDir::new().unwrap();
        let path = rgb_image(&dir, "a.tif");

        embed_exif(&path, &path, ImageKind::Tiff, &make_block()).unwrap();
        embed_xmp(&path, ImageKind::Tiff, "<x:xmpmeta/>").unwrap();

        let block = exif::read_block(&path).unwrap().unwrap();
        assert_eq!(
            block.get(Ifd::Zeroth, catalog::MAKE),
            Some(&RawValue::ByteBuffer(b"Canon".to_vec()))
        );
        assert!(block.get(Ifd::Zeroth, catalog::XML_PACKET).is_some());

        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (4, 3));
        assert_eq!(img.to_rgb8().get_pixel(0, 0), &image::Rgb([200, 100, 50]));
    }

    #[test]
    fn sixteen_bit_tiff_keeps_its_precision() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deep.tif");
        let pixel = image::Rgb([40000u16, 1234, 65535]);
        image::ImageBuffer::from_pixel(4, 3, pixel).save(&path).unwrap();

        embed_exif(&path, &path, ImageKind::Tiff, &make_block()).unwrap();
        embed_xmp(&path, ImageKind::Tiff, "<x:xmpmeta/>").unwrap();

        let img = image::open(&path).unwrap();
        assert_eq!(img.color(), ColorType::Rgb16);
        assert_eq!(img.to_rgb16().get_pixel(3, 2), &pixel);
        assert_eq!(general_info(&path).unwrap().mode.as_deref(), Some("RGB;16"));
    }

    #[test]
    fn strip_tiff_keeps_pixels() {
        let dir = TempDir::new().unwrap();
        let path = rgb_image(&dir, "a.tif");
        embed_exif(&path, &path, ImageKind::Tiff, &make_block()).unwrap();

        assert_eq!(strip(&path, &path, ImageKind::Tiff).unwrap(), Some(2));
        let block = exif::read_block(&path).unwrap().unwrap();
        assert!(block.get(Ifd::Zeroth, catalog::MAKE).is_none());
        assert!(image::open(&path).is_ok());
    }

    // ── passthrough formats ──────────────────────────────────────────

    #[test]
    fn bmp_rejects_xmp_and_strip_is_a_copy() {
        let dir = TempDir::new().unwrap();
        let path = rgb_image(&dir, "a.bmp");
        let err = embed_xmp(&path, ImageKind::Bmp, "<x:xmpmeta/>").unwrap_err();
        assert_eq!(err.phase(), Some(Phase::Xmp));

        let out = dir.path().join("b.bmp");
        assert_eq!(strip(&path, &out, ImageKind::Bmp).unwrap(), None);
        assert!(out.exists());
    }
}
