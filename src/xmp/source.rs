use std::fs;
use std::path::Path;

use crate::container::{self, ImageKind};
use crate::error::{Phase, Result};
use crate::exif::{self, Ifd, catalog};
use crate::model::RawValue;

const PACKET_START: &[u8] = b"<x:xmpmeta";
const PACKET_END: &[u8] = b"</x:xmpmeta>";

/// A way of locating the raw XMP packet inside an image file.
///
/// Sources are tried in order by [`first_packet`]; the first one that
/// returns a packet wins.
pub trait XmpSource: Send + Sync {
    /// Short identifier, as used in the `xmp.sources` config list.
    fn name(&self) -> &str;

    /// The raw packet, or `Ok(None)` if this source finds nothing.
    fn packet(&self, path: &Path) -> Result<Option<String>>;
}

/// Reads the container's dedicated XMP slot: JPEG APP1, PNG `iTXt`, or the
/// TIFF `XMLPacket` tag.
pub struct SegmentXmpSource;

impl XmpSource for SegmentXmpSource {
    fn name(&self) -> &str {
        "segment"
    }

    fn packet(&self, path: &Path) -> Result<Option<String>> {
        let Some(kind) = ImageKind::from_path(path) else {
            return Ok(None);
        };
        match kind {
            ImageKind::Jpeg => Ok(container::jpeg_xmp(&container::read_jpeg(path, Phase::Xmp)?)),
            ImageKind::Png => Ok(container::png_xmp(&container::read_png(path, Phase::Xmp)?)),
            ImageKind::Tiff => Ok(exif::read_block(path)?
                .and_then(|block| block.get(Ifd::Zeroth, catalog::XML_PACKET).and_then(packet_text))),
            ImageKind::Gif | ImageKind::Bmp => Ok(None),
        }
    }
}

/// Scans the whole file for an `<x:xmpmeta>` element, wherever it is.
pub struct ScanXmpSource;

impl XmpSource for ScanXmpSource {
    fn name(&self) -> &str {
        "scan"
    }

    fn packet(&self, path: &Path) -> Result<Option<String>> {
        let data = fs::read(path)?;
        Ok(find_packet(&data))
    }
}

/// Build a source by its config name.
pub fn source_by_name(name: &str) -> Option<Box<dyn XmpSource>> {
    match name {
        "segment" => Some(Box::new(SegmentXmpSource)),
        "scan" => Some(Box::new(ScanXmpSource)),
        _ => None,
    }
}

/// Try each source in order and return the first packet found.
///
/// A failing source does not stop the chain. If no source finds a packet,
/// the last failure (if any) is returned.
pub fn first_packet(sources: &[Box<dyn XmpSource>], path: &Path) -> Result<Option<String>> {
    let mut last_err = None;
    for source in sources {
        match source.packet(path) {
            Ok(Some(packet)) => {
                log::debug!("XMP packet found by {} source", source.name());
                return Ok(Some(packet));
            }
            Ok(None) => {}
            Err(e) => {
                log::warn!("XMP source {} failed on {}: {e}", source.name(), path.display());
                last_err = Some(e);
            }
        }
    }
    match last_err {
        Some(e) => Err(e),
        None => Ok(None),
    }
}

/// The byte range from the first `<x:xmpmeta` to the first `</x:xmpmeta>`
/// after it, decoded leniently as UTF-8.
pub fn find_packet(data: &[u8]) -> Option<String> {
    let start = find(data, PACKET_START)?;
    let end = start + find(&data[start..], PACKET_END)? + PACKET_END.len();
    Some(String::from_utf8_lossy(&data[start..end]).into_owned())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn packet_text(raw: &RawValue) -> Option<String> {
    let bytes = match raw {
        RawValue::ByteBuffer(bytes) => bytes.clone(),
        RawValue::IntArray(ints) => ints.iter().map(|&i| u8::try_from(i).ok()).collect::<Option<_>>()?,
        RawValue::Text(text) => return Some(text.clone()),
        _ => return None,
    };
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetadataError;
    use tempfile::TempDir;

    struct FailingSource;

    impl XmpSource for FailingSource {
        fn name(&self) -> &str {
            "failing"
        }

        fn packet(&self, _path: &Path) -> Result<Option<String>> {
            Err(MetadataError::decode(Phase::Xmp, "boom"))
        }
    }

    // ── find_packet ──────────────────────────────────────────────────

    #[test]
    fn finds_packet_between_markers() {
        let data = b"\xFF\xD8junk<x:xmpmeta xmlns:x=\"adobe:ns:meta/\">body</x:xmpmeta>trailing";
        assert_eq!(
            find_packet(data).as_deref(),
            Some("<x:xmpmeta xmlns:x=\"adobe:ns:meta/\">body</x:xmpmeta>")
        );
    }

    #[test]
    fn end_marker_before_start_is_ignored() {
        let data = b"</x:xmpmeta><x:xmpmeta>a</x:xmpmeta>";
        assert_eq!(find_packet(data).as_deref(), Some("<x:xmpmeta>a</x:xmpmeta>"));
    }

    #[test]
    fn missing_end_marker_yields_none() {
        assert!(find_packet(b"<x:xmpmeta>unterminated").is_none());
        assert!(find_packet(b"").is_none());
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let data = b"<x:xmpmeta>\xFF</x:xmpmeta>";
        assert_eq!(find_packet(data).as_deref(), Some("<x:xmpmeta>\u{FFFD}</x:xmpmeta>"));
    }

    // ── sources ──────────────────────────────────────────────────────

    #[test]
    fn scan_source_reads_any_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blob.gif");
        fs::write(&path, b"GIF89a<x:xmpmeta>x</x:xmpmeta>").unwrap();
        assert_eq!(
            ScanXmpSource.packet(&path).unwrap().as_deref(),
            Some("<x:xmpmeta>x</x:xmpmeta>")
        );
        assert_eq!(SegmentXmpSource.packet(&path).unwrap(), None);
    }

    #[test]
    fn segment_source_reads_jpeg_app1() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.jpg");
        image::RgbImage::new(4, 4).save(&path).unwrap();
        assert_eq!(SegmentXmpSource.packet(&path).unwrap(), None);

        container::embed_xmp(&path, ImageKind::Jpeg, "<x:xmpmeta>j</x:xmpmeta>").unwrap();
        assert_eq!(
            SegmentXmpSource.packet(&path).unwrap().as_deref(),
            Some("<x:xmpmeta>j</x:xmpmeta>")
        );
    }

    #[test]
    fn segment_source_reads_tiff_xml_packet() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.tif");
        image::RgbImage::new(4, 4).save(&path).unwrap();
        container::embed_xmp(&path, ImageKind::Tiff, "<x:xmpmeta>t</x:xmpmeta>").unwrap();
        assert_eq!(
            SegmentXmpSource.packet(&path).unwrap().as_deref(),
            Some("<x:xmpmeta>t</x:xmpmeta>")
        );
    }

    #[test]
    fn sources_by_name() {
        assert_eq!(source_by_name("segment").unwrap().name(), "segment");
        assert_eq!(source_by_name("scan").unwrap().name(), "scan");
        assert!(source_by_name("exiftool").is_none());
    }

    // ── chain ────────────────────────────────────────────────────────

    #[test]
    fn chain_falls_through_failures() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.bin");
        fs::write(&path, b"<x:xmpmeta>ok</x:xmpmeta>").unwrap();

        let sources: Vec<Box<dyn XmpSource>> = vec![Box::new(FailingSource), Box::new(ScanXmpSource)];
        assert_eq!(
            first_packet(&sources, &path).unwrap().as_deref(),
            Some("<x:xmpmeta>ok</x:xmpmeta>")
        );
    }

    #[test]
    fn chain_reports_last_failure_when_nothing_found() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.bin");
        fs::write(&path, b"no packet here").unwrap();

        let sources: Vec<Box<dyn XmpSource>> = vec![Box::new(FailingSource), Box::new(ScanXmpSource)];
        assert!(first_packet(&sources, &path).is_err());

        let sources: Vec<Box<dyn XmpSource>> = vec![Box::new(ScanXmpSource)];
        assert_eq!(first_packet(&sources, &path).unwrap(), None);
    }
}
