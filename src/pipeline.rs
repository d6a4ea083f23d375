use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use walkdir::WalkDir;

use crate::config::Config;
use crate::container::ImageKind;
use crate::model::EditRequest;
use crate::service::MetadataService;
use crate::xmp::{self, XmpSource};

/// The result of writing one image in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    pub path: PathBuf,
    /// Where the edited image went (the same path for in-place writes).
    pub target: PathBuf,
    pub exif_ok: bool,
    pub xmp_ok: bool,
    pub error: Option<String>,
}

impl BatchItem {
    fn failed(path: &Path, target: PathBuf, error: String) -> Self {
        Self {
            path: path.to_path_buf(),
            target,
            exif_ok: false,
            xmp_ok: false,
            error: Some(error),
        }
    }
}

/// Outcome of [`write_batch`].
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub items: Vec<BatchItem>,
    /// `true` if the cancel flag stopped the batch before every path ran.
    pub cancelled: bool,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|i| i.exif_ok && i.xmp_ok).count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.succeeded()
    }
}

/// Collect supported image files from the given paths.
///
/// Accepts a mix of file paths and directory paths. Directories are walked
/// recursively (following symlinks). Only files with supported image extensions
/// are included (see [`ImageKind`] for the full list).
///
/// # Example
///
/// ```rust,no_run
/// use imgmeta::pipeline::collect_images;
/// use std::path::PathBuf;
///
/// let images = collect_images(&[
///     PathBuf::from("photo.jpg"),       // single file
///     PathBuf::from("./photos/"),        // entire directory
/// ]);
/// println!("Found {} images", images.len());
/// ```
pub fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_supported_image(path) {
                images.push(path.clone());
            } else {
                log::warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let p = entry.path();
                if p.is_file() && is_supported_image(p) {
                    images.push(p.to_path_buf());
                }
            }
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    images
}

/// Check if a file has a supported image extension.
pub fn is_supported_image(path: &Path) -> bool {
    ImageKind::from_path(path).is_some()
}

/// Create a backup of the original file.
pub fn backup_file(path: &Path) -> Result<PathBuf> {
    let backup_path = path.with_extension(format!(
        "{}.bak",
        path.extension().unwrap_or_default().to_string_lossy()
    ));

    if !backup_path.exists() {
        std::fs::copy(path, &backup_path).context("Failed to create backup")?;
        log::debug!("Backup created: {}", backup_path.display());
    }

    Ok(backup_path)
}

/// Where the edited copy of `path` goes: `output_dir/<file name>`, or
/// `None` to write in place.
pub fn output_path_for(path: &Path, output_dir: Option<&Path>) -> Option<PathBuf> {
    let dir = output_dir?;
    Some(dir.join(path.file_name()?))
}

/// Build the XMP source chain from configuration.
///
/// Sources are tried in the order listed in `xmp.sources`; unknown names
/// are skipped with a warning.
pub fn build_xmp_sources(config: &Config) -> Vec<Box<dyn XmpSource>> {
    let mut sources = Vec::new();
    for name in &config.xmp.sources {
        match xmp::source_by_name(name) {
            Some(source) => sources.push(source),
            None => log::warn!("Unknown XMP source in config: {name}"),
        }
    }
    if sources.is_empty() {
        log::warn!("No XMP sources configured, XMP will not be read");
    }
    sources
}

/// Build a [`MetadataService`] over the configured XMP sources.
pub fn build_service(config: &Config) -> MetadataService {
    MetadataService::new(build_xmp_sources(config))
}

/// Apply one edit to every path, one file at a time.
///
/// `cancel` is checked before each file; a file already being written is
/// always finished. With `output.dry_run` set, nothing is written and each
/// item reports whether the edit could be planned.
///
/// # Example
///
/// ```rust,no_run
/// use imgmeta::config::Config;
/// use imgmeta::model::EditRequest;
/// use imgmeta::pipeline::{build_service, collect_images, write_batch};
/// use std::path::PathBuf;
/// use std::sync::atomic::AtomicBool;
///
/// let config = Config::default();
/// let service = build_service(&config);
/// let images = collect_images(&[PathBuf::from("./photos")]);
/// let edit = EditRequest { rights: Some("© 2024 Jane Doe".into()), ..Default::default() };
///
/// let summary = write_batch(&service, &images, &edit, &config, &AtomicBool::new(false));
/// println!("{} written, {} failed", summary.succeeded(), summary.failed());
/// ```
pub fn write_batch(
    service: &MetadataService,
    paths: &[PathBuf],
    edit: &EditRequest,
    config: &Config,
    cancel: &AtomicBool,
) -> BatchSummary {
    write_batch_with(service, paths, edit, config, cancel, |_| {})
}

/// [`write_batch`], calling `on_item` as each file finishes.
pub fn write_batch_with(
    service: &MetadataService,
    paths: &[PathBuf],
    edit: &EditRequest,
    config: &Config,
    cancel: &AtomicBool,
    mut on_item: impl FnMut(&BatchItem),
) -> BatchSummary {
    let mut summary = BatchSummary::default();
    let output_dir = config.write.output_dir.as_deref();

    for (i, path) in paths.iter().enumerate() {
        if cancel.load(Ordering::Relaxed) {
            log::warn!("Batch cancelled after {i} of {} files", paths.len());
            summary.cancelled = true;
            break;
        }
        log::info!("[{}/{}] {}", i + 1, paths.len(), path.display());
        let item = write_one(service, path, edit, config, output_dir);
        on_item(&item);
        summary.items.push(item);
    }

    summary
}

fn write_one(
    service: &MetadataService,
    path: &Path,
    edit: &EditRequest,
    config: &Config,
    output_dir: Option<&Path>,
) -> BatchItem {
    let output = output_path_for(path, output_dir);
    let target = output.clone().unwrap_or_else(|| path.to_path_buf());

    if config.output.dry_run {
        return match service.plan(path, edit) {
            Ok(plan) => {
                let tags = plan.exif.as_ref().map(|b| b.tag_count()).unwrap_or(0);
                log::info!(
                    "  [dry run] {tags} EXIF tags and a {}-byte XMP packet would go to {}",
                    plan.xmp_packet.len(),
                    target.display()
                );
                BatchItem {
                    path: path.to_path_buf(),
                    target,
                    exif_ok: true,
                    xmp_ok: true,
                    error: None,
                }
            }
            Err(e) => BatchItem::failed(path, target, e.to_string()),
        };
    }

    if let Some(dir) = output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            return BatchItem::failed(path, target, format!("Failed to create output directory: {e}"));
        }
    } else if config.output.backup_originals {
        if let Err(e) = backup_file(path) {
            log::warn!("Failed to backup {}: {e}", path.display());
        }
    }

    match service.write(path, edit, output.as_deref()) {
        Ok(result) => BatchItem {
            path: path.to_path_buf(),
            target: result.target,
            exif_ok: result.exif_ok,
            xmp_ok: result.xmp_ok,
            error: result.last_error.map(|e| e.to_string()),
        },
        Err(e) => {
            log::warn!("  {e}");
            BatchItem::failed(path, target, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn real_jpeg(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        image::RgbImage::new(4, 4).save(&path).unwrap();
        path
    }

    fn edit() -> EditRequest {
        EditRequest {
            headline: Some("Batch".into()),
            ..Default::default()
        }
    }

    // ── is_supported_image ───────────────────────────────────────────

    #[test]
    fn supported_image_extensions() {
        for name in ["a.jpg", "a.JPEG", "a.png", "a.tif", "a.TIFF", "a.gif", "a.bmp"] {
            assert!(is_supported_image(Path::new(name)), "{name}");
        }
    }

    #[test]
    fn unsupported_image_extensions() {
        for name in ["a.webp", "a.heic", "a.txt", "noext"] {
            assert!(!is_supported_image(Path::new(name)), "{name}");
        }
    }

    // ── collect_images ───────────────────────────────────────────────

    #[test]
    fn collect_images_single_file() {
        let dir = TempDir::new().unwrap();
        let jpg = dir.path().join("test.jpg");
        fs::write(&jpg, b"fake").unwrap();

        let images = collect_images(&[jpg.clone()]);
        assert_eq!(images, vec![jpg]);
    }

    #[test]
    fn collect_images_skips_unsupported() {
        let dir = TempDir::new().unwrap();
        let txt = dir.path().join("readme.txt");
        fs::write(&txt, b"hello").unwrap();

        assert!(collect_images(&[txt]).is_empty());
    }

    #[test]
    fn collect_images_directory_recursive() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();

        fs::write(dir.path().join("a.jpg"), b"fake").unwrap();
        fs::write(sub.join("b.png"), b"fake").unwrap();
        fs::write(sub.join("c.txt"), b"fake").unwrap();
        fs::write(sub.join("d.heic"), b"fake").unwrap();

        let images = collect_images(&[dir.path().to_path_buf()]);
        assert_eq!(images.len(), 2);
    }

    #[test]
    fn collect_images_nonexistent_path() {
        assert!(collect_images(&[PathBuf::from("/nonexistent/path")]).is_empty());
    }

    // ── output paths and backups ─────────────────────────────────────

    #[test]
    fn output_path_joins_file_name() {
        let out = output_path_for(Path::new("/photos/a.jpg"), Some(Path::new("/out")));
        assert_eq!(out, Some(PathBuf::from("/out/a.jpg")));
        assert_eq!(output_path_for(Path::new("/photos/a.jpg"), None), None);
    }

    #[test]
    fn backup_keeps_extension() {
        let dir = TempDir::new().unwrap();
        let jpg = dir.path().join("a.jpg");
        fs::write(&jpg, b"original").unwrap();

        let backup = backup_file(&jpg).unwrap();
        assert_eq!(backup, dir.path().join("a.jpg.bak"));
        assert_eq!(fs::read(&backup).unwrap(), b"original");

        // An existing backup is never overwritten
        fs::write(&jpg, b"changed").unwrap();
        backup_file(&jpg).unwrap();
        assert_eq!(fs::read(&backup).unwrap(), b"original");
    }

    // ── build_xmp_sources ────────────────────────────────────────────

    #[test]
    fn xmp_sources_follow_config_order() {
        let mut config = Config::default();
        config.xmp.sources = vec!["scan".into(), "bogus".into(), "segment".into()];
        let names: Vec<String> = build_xmp_sources(&config)
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(names, vec!["scan", "segment"]);
    }

    // ── write_batch ──────────────────────────────────────────────────

    #[test]
    fn batch_writes_every_file() {
        let dir = TempDir::new().unwrap();
        let paths = vec![real_jpeg(dir.path(), "a.jpg"), real_jpeg(dir.path(), "b.jpg")];
        let config = Config::default();
        let service = build_service(&config);

        let summary = write_batch(&service, &paths, &edit(), &config, &AtomicBool::new(false));
        assert!(!summary.cancelled);
        assert_eq!(summary.succeeded(), 2);
        assert!(dir.path().join("a.jpg.bak").exists());

        let bundle = service.read(&paths[1]).unwrap();
        assert_eq!(bundle.xmp["Headline"].as_text(), Some("Batch"));
    }

    #[test]
    fn batch_records_failures_and_continues() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("gone.jpg");
        let paths = vec![missing, real_jpeg(dir.path(), "ok.jpg")];
        let mut config = Config::default();
        config.output.backup_originals = false;

        let summary = write_batch(&build_service(&config), &paths, &edit(), &config, &AtomicBool::new(false));
        assert_eq!(summary.items.len(), 2);
        assert!(summary.items[0].error.as_deref().unwrap().contains("File not found"));
        assert!(summary.items[1].exif_ok && summary.items[1].xmp_ok);
        assert_eq!(summary.failed(), 1);
    }

    #[test]
    fn cancelled_batch_stops_before_next_file() {
        let dir = TempDir::new().unwrap();
        let path = real_jpeg(dir.path(), "a.jpg");
        let before = fs::read(&path).unwrap();
        let config = Config::default();

        let summary = write_batch(&build_service(&config), &[path.clone()], &edit(), &config, &AtomicBool::new(true));
        assert!(summary.cancelled);
        assert!(summary.items.is_empty());
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn cancelling_mid_batch_finishes_the_current_file_only() {
        let dir = TempDir::new().unwrap();
        let first = real_jpeg(dir.path(), "a.jpg");
        let second = real_jpeg(dir.path(), "b.jpg");
        let untouched = fs::read(&second).unwrap();
        let mut config = Config::default();
        config.output.backup_originals = false;
        let cancel = AtomicBool::new(false);

        let paths = [first.clone(), second.clone()];
        let summary = write_batch_with(&build_service(&config), &paths, &edit(), &config, &cancel, |_| {
            cancel.store(true, Ordering::Relaxed);
        });

        assert!(summary.cancelled);
        assert_eq!(summary.items.len(), 1);
        assert_eq!(summary.items[0].path, first);
        assert_eq!(summary.succeeded(), 1);
        assert_eq!(fs::read(&second).unwrap(), untouched);
    }

    #[test]
    fn output_dir_leaves_originals_untouched() {
        let dir = TempDir::new().unwrap();
        let path = real_jpeg(dir.path(), "a.jpg");
        let before = fs::read(&path).unwrap();
        let mut config = Config::default();
        config.write.output_dir = Some(dir.path().join("edited"));

        let summary = write_batch(&build_service(&config), &[path.clone()], &edit(), &config, &AtomicBool::new(false));
        assert_eq!(summary.items[0].target, dir.path().join("edited").join("a.jpg"));
        assert!(summary.items[0].target.exists());
        assert_eq!(fs::read(&path).unwrap(), before);
        assert!(!dir.path().join("a.jpg.bak").exists());
    }

    #[test]
    fn dry_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = real_jpeg(dir.path(), "a.jpg");
        let before = fs::read(&path).unwrap();
        let mut config = Config::default();
        config.output.dry_run = true;

        let summary = write_batch(&build_service(&config), &[path.clone()], &edit(), &config, &AtomicBool::new(false));
        assert_eq!(summary.succeeded(), 1);
        assert_eq!(fs::read(&path).unwrap(), before);
        assert!(!dir.path().join("a.jpg.bak").exists());
    }
}
