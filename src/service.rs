//! Read, write, strip and export orchestration.
//!
//! Every call validates the path first: a missing file or an unsupported
//! extension is returned as `Err` before any codec runs. After that, each
//! phase (general info, EXIF, XMP) runs on its own. A phase failure is
//! logged and recorded in the result's `last_error`, and the remaining
//! phases still run.

use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::container::{self, ImageKind};
use crate::error::{MetadataError, Phase, Result};
use crate::exif::{self, ExifBlock};
use crate::model::{EditRequest, MetadataBundle, MetadataMap};
use crate::xmp::{self, ScanXmpSource, SegmentXmpSource, XmpSource};

/// Outcome of [`MetadataService::write`].
#[derive(Debug, Default)]
pub struct WriteResult {
    /// Where the edited image was written.
    pub target: PathBuf,
    pub exif_ok: bool,
    pub xmp_ok: bool,
    /// The most recent phase failure, if any.
    pub last_error: Option<MetadataError>,
}

impl WriteResult {
    pub fn is_complete(&self) -> bool {
        self.exif_ok && self.xmp_ok
    }
}

/// What [`MetadataService::write`] would do, without touching any file.
#[derive(Debug)]
pub struct WritePlan {
    pub target: PathBuf,
    /// The EXIF block that would be written; `None` for formats whose EXIF
    /// is copied unchanged.
    pub exif: Option<ExifBlock>,
    pub xmp_packet: String,
}

/// Outcome of [`MetadataService::strip`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StripResult {
    pub output: PathBuf,
    /// Number of segments, chunks or tags removed; `None` when the format
    /// has no strippable metadata and the file was only copied.
    pub removed: Option<usize>,
}

impl StripResult {
    pub fn supported(&self) -> bool {
        self.removed.is_some()
    }
}

/// Stateless metadata engine over a fixed chain of XMP sources.
///
/// # Example
///
/// ```rust,no_run
/// use imgmeta::model::EditRequest;
/// use imgmeta::service::MetadataService;
/// use std::path::Path;
///
/// let service = MetadataService::default();
/// let bundle = service.read(Path::new("photo.jpg"))?;
/// println!("{}", serde_json::to_string_pretty(&bundle)?);
///
/// let edit = EditRequest { headline: Some("Harbour at dusk".into()), ..Default::default() };
/// let result = service.write(Path::new("photo.jpg"), &edit, None)?;
/// assert!(result.exif_ok);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct MetadataService {
    sources: Vec<Box<dyn XmpSource>>,
}

impl Default for MetadataService {
    fn default() -> Self {
        Self::new(vec![Box::new(SegmentXmpSource), Box::new(ScanXmpSource)])
    }
}

impl MetadataService {
    pub fn new(sources: Vec<Box<dyn XmpSource>>) -> Self {
        Self { sources }
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    // ========================================================================
    // Reading
    // ========================================================================

    /// Read general info, EXIF and XMP from `path`.
    pub fn read(&self, path: &Path) -> Result<MetadataBundle> {
        let kind = validate(path)?;
        let mut bundle = MetadataBundle::default();

        match container::general_info(path) {
            Ok(general) => bundle.general = general,
            Err(e) => {
                bundle.general.file_size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
                record(&mut bundle.last_error, path, in_phase(e, Phase::General, false));
            }
        }

        if kind.carries_exif() {
            match exif::read_block(path) {
                Ok(Some(block)) => bundle.exif = exif::decoder::decode(&block),
                Ok(None) => {}
                Err(e) => record(&mut bundle.last_error, path, in_phase(e, Phase::Exif, false)),
            }
        }

        match xmp::first_packet(&self.sources, path) {
            Ok(Some(packet)) => bundle.xmp = xmp::decoder::decode(&packet),
            Ok(None) => {}
            Err(e) => record(&mut bundle.last_error, path, in_phase(e, Phase::Xmp, false)),
        }

        Ok(bundle)
    }

    // ========================================================================
    // Writing
    // ========================================================================

    /// Build the EXIF block and XMP packet an edit would produce.
    pub fn plan(&self, path: &Path, edit: &EditRequest) -> Result<WritePlan> {
        let kind = validate(path)?;
        let exif = if kind.writes_exif() {
            let existing = exif::read_block(path)?.unwrap_or_default();
            Some(exif::encoder::encode(&existing, edit))
        } else {
            None
        };
        Ok(WritePlan {
            target: path.to_path_buf(),
            exif,
            xmp_packet: xmp::encoder::encode(edit),
        })
    }

    /// Apply `edit` to `path`, writing to `output` (or in place).
    ///
    /// The EXIF phase always runs first and produces the target file; the
    /// XMP phase then edits the target in place.
    pub fn write(&self, path: &Path, edit: &EditRequest, output: Option<&Path>) -> Result<WriteResult> {
        let kind = validate(path)?;
        let target = output.unwrap_or(path).to_path_buf();
        let mut result = WriteResult { target: target.clone(), ..Default::default() };

        match write_exif(path, &target, kind, edit) {
            Ok(()) => result.exif_ok = true,
            Err(e) => {
                record(&mut result.last_error, path, in_phase(e, Phase::Exif, true));
                // The XMP phase edits the target, which must mirror the source.
                if target != path {
                    if let Err(e) = fs::copy(path, &target) {
                        record(&mut result.last_error, path, in_phase(e.into(), Phase::Exif, true));
                    }
                }
            }
        }

        let packet = xmp::encoder::encode(edit);
        match container::embed_xmp(&target, kind, &packet) {
            Ok(()) => result.xmp_ok = true,
            Err(e) => record(&mut result.last_error, path, in_phase(e, Phase::Xmp, true)),
        }

        if result.is_complete() {
            log::info!("Metadata written to {}", target.display());
        }
        Ok(result)
    }

    // ========================================================================
    // Stripping and export
    // ========================================================================

    /// Remove embedded metadata, writing to `output` (or in place).
    pub fn strip(&self, path: &Path, output: Option<&Path>) -> Result<StripResult> {
        let kind = validate(path)?;
        let target = output.unwrap_or(path).to_path_buf();
        let removed = container::strip(path, &target, kind)?;
        match removed {
            Some(n) => log::info!("Removed {n} metadata entries from {}", path.display()),
            None => log::warn!("{kind:?} has no strippable metadata, copied {}", path.display()),
        }
        Ok(StripResult { output: target, removed })
    }

    /// Write the bundle of `path` to `out` as pretty-printed JSON.
    pub fn export_json(&self, path: &Path, out: &Path) -> Result<MetadataBundle> {
        let bundle = self.read(path)?;
        let json = serde_json::to_string_pretty(&bundle).map_err(std::io::Error::other)?;
        fs::write(out, json)?;
        Ok(bundle)
    }

    /// Write the bundle of `path` to `out` as a plain-text report.
    pub fn export_text(&self, path: &Path, out: &Path) -> Result<MetadataBundle> {
        let bundle = self.read(path)?;
        fs::write(out, text_report(path, &bundle))?;
        Ok(bundle)
    }
}

/// Hard checks that run before any codec: existence, then extension.
fn validate(path: &Path) -> Result<ImageKind> {
    if !path.exists() {
        return Err(MetadataError::NotFound(path.to_path_buf()));
    }
    ImageKind::from_path(path).ok_or_else(|| {
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default();
        MetadataError::UnsupportedFormat(ext)
    })
}

fn write_exif(source: &Path, target: &Path, kind: ImageKind, edit: &EditRequest) -> Result<()> {
    if !kind.writes_exif() {
        return container::embed_exif(source, target, kind, &ExifBlock::default());
    }
    let existing = exif::read_block(source)?.unwrap_or_default();
    let block = exif::encoder::encode(&existing, edit);
    container::embed_exif(source, target, kind, &block)
}

/// Attach a phase to errors that do not carry one (I/O, mostly).
fn in_phase(err: MetadataError, phase: Phase, writing: bool) -> MetadataError {
    match err {
        e if e.phase().is_some() || e.is_hard() => e,
        e if writing => MetadataError::encode(phase, e),
        e => MetadataError::decode(phase, e),
    }
}

fn record(slot: &mut Option<MetadataError>, path: &Path, err: MetadataError) {
    log::warn!("{}: {err}", path.display());
    *slot = Some(err);
}

fn text_report(path: &Path, bundle: &MetadataBundle) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Metadata for: {}", path.display());
    let _ = writeln!(out, "Exported: {}", chrono::Local::now().to_rfc3339());
    let _ = writeln!(out, "{}\n", "=".repeat(60));

    let general = serde_json::to_value(&bundle.general)
        .ok()
        .and_then(|v| v.as_object().cloned())
        .unwrap_or_default();
    if !general.is_empty() {
        let _ = writeln!(out, "\nGENERAL\n{}", "-".repeat(40));
        for (key, value) in &general {
            let _ = writeln!(out, "  {key}: {}", json_text(value));
        }
    }
    section(&mut out, "EXIF", &bundle.exif);
    section(&mut out, "XMP", &bundle.xmp);
    out
}

fn section(out: &mut String, title: &str, map: &MetadataMap) {
    if map.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{title}\n{}", "-".repeat(40));
    for (key, value) in map {
        let _ = writeln!(out, "  {key}: {value}");
    }
}

fn json_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exif::{Ifd, catalog};
    use crate::model::{NormalizedValue, RawValue, TextOrList};
    use img_parts::ImageEXIF;
    use tempfile::TempDir;

    fn sample(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        image::RgbImage::from_pixel(6, 4, image::Rgb([10, 20, 30])).save(&path).unwrap();
        path
    }

    fn text(s: &str) -> NormalizedValue {
        NormalizedValue::Text(s.to_string())
    }

    fn full_edit() -> EditRequest {
        EditRequest {
            headline: Some("Harbour".into()),
            creator: Some(TextOrList::from("Jane Doe")),
            rights: Some("CC-BY".into()),
            subject: Some(TextOrList::from("boats; sea")),
            description: Some("Boats at dusk".into()),
            ..Default::default()
        }
    }

    // ── hard failures ────────────────────────────────────────────────

    #[test]
    fn missing_file_is_not_found() {
        let err = MetadataService::default().read(Path::new("/no/such/file.jpg")).unwrap_err();
        assert!(matches!(err, MetadataError::NotFound(_)));
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "hello").unwrap();
        let err = MetadataService::default().read(&path).unwrap_err();
        match err {
            MetadataError::UnsupportedFormat(ext) => assert_eq!(ext, ".txt"),
            other => panic!("unexpected error: {other}"),
        }
    }

    // ── read ─────────────────────────────────────────────────────────

    #[test]
    fn plain_image_has_general_info_only() {
        let dir = TempDir::new().unwrap();
        let path = sample(&dir, "a.png");
        let bundle = MetadataService::default().read(&path).unwrap();
        assert_eq!(bundle.general.size, Some([6, 4]));
        assert_eq!(bundle.general.mode.as_deref(), Some("RGB"));
        assert!(bundle.exif.is_empty());
        assert!(bundle.xmp.is_empty());
        assert!(bundle.last_error.is_none());
    }

    #[test]
    fn corrupt_file_records_errors_but_returns_bundle() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.jpg");
        fs::write(&path, b"not a jpeg <x:xmpmeta><oops</x:xmpmeta>").unwrap();

        let bundle = MetadataService::default().read(&path).unwrap();
        assert!(bundle.last_error.is_some());
        assert_eq!(bundle.general.file_size, fs::metadata(&path).unwrap().len());
        // XMP decoding still ran on the scanned packet
        assert!(bundle.xmp.contains_key("xmp_packet"));
    }

    // ── write ────────────────────────────────────────────────────────

    #[test]
    fn jpeg_write_then_read_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = sample(&dir, "a.jpg");
        let service = MetadataService::default();

        let result = service.write(&path, &full_edit(), None).unwrap();
        assert!(result.exif_ok && result.xmp_ok, "{:?}", result.last_error);

        let bundle = service.read(&path).unwrap();
        assert_eq!(bundle.exif["ImageDescription"], text("Harbour"));
        assert_eq!(bundle.exif["Artist"], text("Jane Doe"));
        assert_eq!(bundle.exif["Copyright"], text("CC-BY"));
        assert_eq!(bundle.exif["UserComment"], text("Boats at dusk"));
        assert_eq!(bundle.exif["XPSubject"], NormalizedValue::List(vec![text("boats"), text("sea")]));

        assert_eq!(bundle.xmp["Headline"], text("Harbour"));
        assert_eq!(bundle.xmp["creator"], NormalizedValue::List(vec![text("Jane Doe")]));
        assert_eq!(bundle.xmp["rights"], text("CC-BY"));
        assert_eq!(bundle.xmp["description"], text("Boats at dusk"));
        assert_eq!(bundle.general.size, Some([6, 4]));
    }

    #[test]
    fn write_to_output_leaves_source_alone() {
        let dir = TempDir::new().unwrap();
        let path = sample(&dir, "a.jpg");
        let before = fs::read(&path).unwrap();
        let out = dir.path().join("out.jpg");

        let result = MetadataService::default().write(&path, &full_edit(), Some(&out)).unwrap();
        assert_eq!(result.target, out);
        assert_eq!(fs::read(&path).unwrap(), before);
        assert!(out.exists());
    }

    #[test]
    fn png_exif_is_passthrough_but_xmp_is_written() {
        let dir = TempDir::new().unwrap();
        let path = sample(&dir, "a.png");
        let service = MetadataService::default();

        let result = service.write(&path, &full_edit(), None).unwrap();
        assert!(result.exif_ok && result.xmp_ok);
        let bundle = service.read(&path).unwrap();
        assert!(bundle.exif.is_empty());
        assert_eq!(bundle.xmp["Headline"], text("Harbour"));
    }

    #[test]
    fn gif_xmp_failure_does_not_block_exif_phase() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.gif");
        image::RgbaImage::from_pixel(6, 4, image::Rgba([10, 20, 30, 255])).save(&path).unwrap();
        let out = dir.path().join("b.gif");

        let result = MetadataService::default().write(&path, &full_edit(), Some(&out)).unwrap();
        assert!(result.exif_ok);
        assert!(!result.xmp_ok);
        assert_eq!(result.last_error.as_ref().and_then(|e| e.phase()), Some(Phase::Xmp));
        assert_eq!(fs::read(&path).unwrap(), fs::read(&out).unwrap());
    }

    #[test]
    fn corrupt_jpeg_fails_both_phases_without_err() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.jpg");
        fs::write(&path, b"garbage").unwrap();

        let result = MetadataService::default().write(&path, &full_edit(), None).unwrap();
        assert!(!result.exif_ok);
        assert!(!result.xmp_ok);
        assert!(result.last_error.is_some());
    }

    #[test]
    fn exif_failure_replaces_stale_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.jpg");
        image::RgbImage::from_pixel(8, 8, image::Rgb([10, 20, 30])).save(&path).unwrap();
        let mut jpeg = img_parts::jpeg::Jpeg::from_bytes(fs::read(&path).unwrap().into()).unwrap();
        jpeg.set_exif(Some(img_parts::Bytes::from_static(b"XX\0\x2anot a tiff header")));
        fs::write(&path, jpeg.encoder().bytes()).unwrap();

        let out = dir.path().join("out.jpg");
        image::RgbImage::from_pixel(2, 2, image::Rgb([0, 0, 0])).save(&out).unwrap();

        let result = MetadataService::default().write(&path, &full_edit(), Some(&out)).unwrap();
        assert!(!result.exif_ok);
        assert!(result.xmp_ok);
        assert_eq!(image::image_dimensions(&out).unwrap(), (8, 8));
        assert_eq!(result.last_error.as_ref().and_then(|e| e.phase()), Some(Phase::Exif));
    }

    #[test]
    fn purge_removes_software_tag_on_write() {
        let dir = TempDir::new().unwrap();
        let path = sample(&dir, "a.jpg");
        let mut block = ExifBlock::default();
        block.insert(Ifd::Zeroth, catalog::MAKE, RawValue::ByteBuffer(b"Canon".to_vec()));
        block.insert(Ifd::Zeroth, catalog::SOFTWARE, RawValue::ByteBuffer(b"Editor".to_vec()));
        container::embed_exif(&path, &path, ImageKind::Jpeg, &block).unwrap();

        let service = MetadataService::default();
        let edit = EditRequest { rights: Some("C".into()), ..Default::default() };
        service.write(&path, &edit, None).unwrap();

        let bundle = service.read(&path).unwrap();
        assert_eq!(bundle.exif["Make"], text("Canon"));
        assert_eq!(bundle.exif["Copyright"], text("C"));
        assert!(!bundle.exif.contains_key("Software"));
    }

    #[test]
    fn plan_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let path = sample(&dir, "a.jpg");
        let before = fs::read(&path).unwrap();

        let plan = MetadataService::default().plan(&path, &full_edit()).unwrap();
        let block = plan.exif.unwrap();
        assert!(block.get(Ifd::Zeroth, catalog::ARTIST).is_some());
        assert!(plan.xmp_packet.contains("Harbour"));
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    // ── strip and export ─────────────────────────────────────────────

    #[test]
    fn strip_removes_written_metadata() {
        let dir = TempDir::new().unwrap();
        let path = sample(&dir, "a.jpg");
        let service = MetadataService::default();
        service.write(&path, &full_edit(), None).unwrap();

        let out = dir.path().join("clean.jpg");
        let result = service.strip(&path, Some(&out)).unwrap();
        assert!(result.supported());

        let bundle = service.read(&out).unwrap();
        assert!(bundle.exif.is_empty());
        assert!(bundle.xmp.is_empty());
    }

    #[test]
    fn strip_bmp_is_a_copy() {
        let dir = TempDir::new().unwrap();
        let path = sample(&dir, "a.bmp");
        let out = dir.path().join("b.bmp");
        let result = MetadataService::default().strip(&path, Some(&out)).unwrap();
        assert!(!result.supported());
        assert_eq!(fs::read(&path).unwrap(), fs::read(&out).unwrap());
    }

    #[test]
    fn export_json_writes_bundle_shape() {
        let dir = TempDir::new().unwrap();
        let path = sample(&dir, "a.jpg");
        let service = MetadataService::default();
        service.write(&path, &full_edit(), None).unwrap();

        let out = dir.path().join("a.json");
        service.export_json(&path, &out).unwrap();
        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(json["general"]["size"], serde_json::json!([6, 4]));
        assert_eq!(json["exif"]["Artist"], "Jane Doe");
        assert_eq!(json["xmp"]["rights"], "CC-BY");
        assert!(json.get("last_error").is_none());
    }

    #[test]
    fn export_text_has_sections() {
        let dir = TempDir::new().unwrap();
        let path = sample(&dir, "a.jpg");
        let service = MetadataService::default();
        service.write(&path, &full_edit(), None).unwrap();

        let out = dir.path().join("a.txt");
        service.export_text(&path, &out).unwrap();
        let report = fs::read_to_string(&out).unwrap();
        assert!(report.starts_with(&format!("Metadata for: {}\nExported: ", path.display())));
        assert!(report.contains(&format!("{}\n\n", "=".repeat(60))));
        assert!(report.contains(&format!("\nEXIF\n{}\n", "-".repeat(40))));
        assert!(report.contains("  Artist: Jane Doe\n"));
        assert!(report.contains("  subject: boats, sea\n"));
        assert!(report.contains("  format: JPEG\n"));
    }
}
