use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use imgmeta::model::{EditRequest, MetadataBundle, MetadataMap, NormalizedValue, TextOrList};
use imgmeta::service::MetadataService;
use imgmeta::{config, pipeline};

#[derive(Parser, Debug)]
#[command(
    name = "imgmeta",
    version,
    about = "Read, edit and strip EXIF/XMP metadata in JPEG, PNG, TIFF, GIF and BMP images"
)]
struct Cli {
    /// Image files or directories to process
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Display all metadata and exit (the default when no edit is given)
    #[arg(long)]
    show: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Export each image's metadata as JSON into DIR
    #[arg(long = "export-json", value_name = "DIR")]
    export_json: Option<PathBuf>,

    /// Export each image's metadata as a text report into DIR
    #[arg(long = "export-text", value_name = "DIR")]
    export_text: Option<PathBuf>,

    /// Remove all EXIF/XMP/IPTC metadata from the image(s)
    #[arg(long)]
    strip: bool,

    /// Load the edit request from a JSON file
    #[arg(long, value_name = "FILE")]
    edit: Option<PathBuf>,

    /// Headline (ImageDescription, photoshop:Headline)
    #[arg(long)]
    headline: Option<String>,

    /// Creator(s), comma or semicolon separated (Artist, dc:creator)
    #[arg(long)]
    creator: Option<String>,

    /// Copyright notice (Copyright, dc:rights)
    #[arg(long)]
    rights: Option<String>,

    /// Keywords, comma or semicolon separated (XPSubject, dc:subject)
    #[arg(long)]
    subject: Option<String>,

    /// Description (UserComment, dc:description)
    #[arg(long)]
    description: Option<String>,

    /// Creation date (DateTimeOriginal, xmp:CreateDate)
    #[arg(long = "date-created")]
    date_created: Option<String>,

    /// Keep EXIF tags that are not on the camera allow-list
    #[arg(long = "keep-non-camera")]
    keep_non_camera: bool,

    /// Write edited copies into DIR instead of modifying files in place
    #[arg(long = "output-dir", value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Preview changes without writing to files
    #[arg(long)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Build the edit request: the `--edit` file first, then flags on top.
    fn edit_request(&self, config: &config::Config) -> Result<Option<EditRequest>> {
        let mut edit = match &self.edit {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read edit file {}", path.display()))?;
                serde_json::from_str(&contents).context("Failed to parse edit file")?
            }
            None => EditRequest {
                purge_non_camera: config.write.purge_non_camera,
                ..Default::default()
            },
        };

        let flags_given = [
            &self.headline,
            &self.creator,
            &self.rights,
            &self.subject,
            &self.description,
            &self.date_created,
        ]
        .iter()
        .any(|f| f.is_some());
        if self.edit.is_none() && !flags_given {
            return Ok(None);
        }

        if let Some(v) = &self.headline {
            edit.headline = Some(v.clone());
        }
        if let Some(v) = &self.creator {
            edit.creator = Some(TextOrList::from(v.as_str()));
        }
        if let Some(v) = &self.rights {
            edit.rights = Some(v.clone());
        }
        if let Some(v) = &self.subject {
            edit.subject = Some(TextOrList::from(v.as_str()));
        }
        if let Some(v) = &self.description {
            edit.description = Some(v.clone());
        }
        if let Some(v) = &self.date_created {
            edit.date_created = Some(v.clone());
        }
        if self.keep_non_camera {
            edit.purge_non_camera = false;
        }
        Ok(Some(edit))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = config::Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => config::Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    if cli.paths.is_empty() {
        anyhow::bail!("No input files or directories specified. Use --help for usage.");
    }

    // Load config and apply CLI overrides
    let mut config = config::Config::load(cli.config.as_deref())?;
    if cli.dry_run {
        config.output.dry_run = true;
    }
    if let Some(dir) = &cli.output_dir {
        config.write.output_dir = Some(dir.clone());
    }

    let images = pipeline::collect_images(&cli.paths);
    if images.is_empty() {
        anyhow::bail!("No supported image files found in the specified paths.");
    }
    log::info!("Found {} image(s)", images.len());

    let service = pipeline::build_service(&config);
    log::debug!("XMP sources: {}", service.source_names().join(" → "));

    if cli.export_json.is_some() || cli.export_text.is_some() {
        return export(&service, &images, cli.export_json.as_deref(), cli.export_text.as_deref());
    }

    if cli.strip {
        return strip(&service, &images, &config);
    }

    let edit = cli.edit_request(&config)?;
    match edit {
        Some(edit) if !cli.show => write(&service, &images, &edit, &config, cli.json),
        _ => show(&service, &images, cli.json),
    }
}

// ============================================================================
// Modes
// ============================================================================

fn show(service: &MetadataService, images: &[PathBuf], json: bool) -> Result<()> {
    let mut bundles = Vec::new();
    for path in images {
        match service.read(path) {
            Ok(bundle) => {
                if !json {
                    print_bundle(path, &bundle);
                }
                bundles.push(serde_json::json!({
                    "path": path.display().to_string(),
                    "metadata": bundle,
                }));
            }
            Err(e) => log::error!("{e}"),
        }
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&bundles)?);
    }
    Ok(())
}

fn export(
    service: &MetadataService,
    images: &[PathBuf],
    json_dir: Option<&Path>,
    text_dir: Option<&Path>,
) -> Result<()> {
    for dir in [json_dir, text_dir].into_iter().flatten() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let mut failed = 0;
    for path in images {
        let stem = path.file_stem().unwrap_or_default().to_string_lossy();
        if let Some(dir) = json_dir {
            let out = dir.join(format!("{stem}_metadata.json"));
            match service.export_json(path, &out) {
                Ok(_) => log::info!("Exported {}", out.display()),
                Err(e) => {
                    log::error!("{}: {e}", path.display());
                    failed += 1;
                }
            }
        }
        if let Some(dir) = text_dir {
            let out = dir.join(format!("{stem}_metadata.txt"));
            match service.export_text(path, &out) {
                Ok(_) => log::info!("Exported {}", out.display()),
                Err(e) => {
                    log::error!("{}: {e}", path.display());
                    failed += 1;
                }
            }
        }
    }
    log::info!("Done: {failed} export(s) failed");
    Ok(())
}

fn strip(service: &MetadataService, images: &[PathBuf], config: &config::Config) -> Result<()> {
    let output_dir = config.write.output_dir.as_deref();
    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    for path in images {
        let output = pipeline::output_path_for(path, output_dir);
        if config.output.dry_run {
            log::info!("[dry run] would strip {}", path.display());
            continue;
        }
        if output.is_none() && config.output.backup_originals {
            if let Err(e) = pipeline::backup_file(path) {
                log::warn!("Failed to backup {}: {e}", path.display());
            }
        }
        match service.strip(path, output.as_deref()) {
            Ok(result) if result.supported() => log::info!("Stripped: {}", result.output.display()),
            Ok(result) => log::warn!("Nothing to strip, copied: {}", result.output.display()),
            Err(e) => log::error!("Failed to strip {}: {e}", path.display()),
        }
    }
    Ok(())
}

fn write(
    service: &MetadataService,
    images: &[PathBuf],
    edit: &EditRequest,
    config: &config::Config,
    json: bool,
) -> Result<()> {
    if edit.is_empty() {
        log::warn!("Edit request sets no fields, only the purge policy will apply");
    }
    if config.output.dry_run {
        log::info!("DRY RUN, no files will be modified");
        for path in images {
            match service.plan(path, edit) {
                Ok(plan) => print_plan(path, &plan),
                Err(e) => log::error!("{}: {e}", path.display()),
            }
        }
        return Ok(());
    }

    let cancel = AtomicBool::new(false);
    let summary = pipeline::write_batch_with(service, images, edit, config, &cancel, |item| {
        match &item.error {
            Some(err) => log::error!("  {}: {err}", item.path.display()),
            None => log::debug!("  wrote {}", item.target.display()),
        }
    });

    if json {
        let json_results: Vec<serde_json::Value> = summary
            .items
            .iter()
            .map(|r| {
                serde_json::json!({
                    "path": r.path.display().to_string(),
                    "target": r.target.display().to_string(),
                    "exif_ok": r.exif_ok,
                    "xmp_ok": r.xmp_ok,
                    "error": r.error,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&json_results)?);
    }

    log::info!(
        "Done: {} succeeded, {} failed out of {} images",
        summary.succeeded(),
        summary.failed(),
        images.len()
    );
    Ok(())
}

// ============================================================================
// Display
// ============================================================================

const GREEN: &str = "\x1b[32m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

const TAG_WIDTH: usize = 22;
/// Value column width before wrapping.
const VAL_WIDTH: usize = 46;

/// Existing values print plain; values a write would set print green with a
/// trailing `*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowStyle {
    Current,
    Pending,
}

/// Print a full bundle, one section per table.
fn print_bundle(path: &Path, bundle: &MetadataBundle) {
    println!();
    println!("{BOLD}File:{RESET} {}", path.display());
    println!("{DIM}{}{RESET}", "═".repeat(72));

    let general = &bundle.general;
    println!("  {BOLD}General{RESET}");
    println!("  {DIM}{}{RESET}", "─".repeat(70));
    if let Some(format) = &general.format {
        print_row("Format", format);
    }
    if let Some([w, h]) = general.size {
        print_row("ImageSize", &format!("{w} x {h}"));
    }
    if let Some(mode) = &general.mode {
        print_row("Mode", mode);
    }
    print_row("FileSize", &format!("{} bytes", general.file_size));
    println!();

    print_section("EXIF", &bundle.exif);
    print_section("XMP", &bundle.xmp);

    if bundle.exif.is_empty() && bundle.xmp.is_empty() {
        println!("  {DIM}(no EXIF or XMP metadata found){RESET}");
        println!();
    }
}

fn print_section(title: &str, map: &MetadataMap) {
    if map.is_empty() {
        return;
    }
    println!("  {BOLD}{title}{RESET}");
    println!("  {DIM}{}{RESET}", "─".repeat(70));
    for (tag, value) in map {
        print_lines(tag, &value_lines(value), RowStyle::Current);
    }
    println!();
}

/// Print what a write would change for dry-run mode.
fn print_plan(path: &Path, plan: &imgmeta::service::WritePlan) {
    println!();
    println!("{BOLD}File:{RESET} {}", path.display());
    println!("  {DIM}{}{RESET}", "─".repeat(72));
    match &plan.exif {
        Some(block) => {
            println!("  {BOLD}EXIF to be written:{RESET}");
            for (tag, value) in &imgmeta::exif::decoder::decode(block) {
                print_lines(tag, &value_lines(value), RowStyle::Pending);
            }
        }
        None => println!("  {DIM}EXIF is copied unchanged for this format{RESET}"),
    }
    println!("  {DIM}{}{RESET}", "─".repeat(72));
    println!("  {BOLD}XMP packet:{RESET}");
    for line in plan.xmp_packet.lines() {
        println!("  {GREEN}{line}{RESET}");
    }
    println!();
}

fn print_row(tag: &str, value: &str) {
    print_lines(tag, &wrap_text(value, VAL_WIDTH), RowStyle::Current);
}

fn print_lines(tag: &str, lines: &[String], style: RowStyle) {
    let (open, close, mark) = match style {
        RowStyle::Current => ("", "", ""),
        RowStyle::Pending => (GREEN, RESET, " *"),
    };
    let indent = " ".repeat(TAG_WIDTH + 3);
    let last = lines.len().saturating_sub(1);
    for (i, line) in lines.iter().enumerate() {
        let end = if i == last { mark } else { "" };
        if i == 0 {
            println!("  {open}{tag:<TAG_WIDTH$} : {line}{end}{close}");
        } else {
            println!("  {open}{indent}{line}{end}{close}");
        }
    }
}

/// Display lines for one value: a bullet per list item, a `key: value` line
/// per map entry, wrapped text otherwise.
fn value_lines(value: &NormalizedValue) -> Vec<String> {
    match value {
        NormalizedValue::List(items) if !items.is_empty() => items
            .iter()
            .flat_map(|item| hanging(&item.to_string(), "- "))
            .collect(),
        NormalizedValue::Map(entries) if !entries.is_empty() => entries
            .iter()
            .flat_map(|(key, item)| hanging(&format!("{key}: {item}"), ""))
            .collect(),
        other => wrap_text(&other.to_string(), VAL_WIDTH),
    }
}

/// Wrap `text` behind `bullet`, indenting continuation lines to match.
fn hanging(text: &str, bullet: &str) -> Vec<String> {
    let pad = " ".repeat(bullet.chars().count());
    wrap_text(text, VAL_WIDTH - bullet.chars().count())
        .into_iter()
        .enumerate()
        .map(|(i, line)| if i == 0 { format!("{bullet}{line}") } else { format!("{pad}{line}") })
        .collect()
}

/// Wrap at word boundaries, counting characters rather than bytes.
fn wrap_text(s: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut width = 0;

    for word in s.split_whitespace() {
        let len = word.chars().count();
        if width > 0 && width + 1 + len > max_width {
            lines.push(std::mem::take(&mut current));
            width = 0;
        }
        if width > 0 {
            current.push(' ');
            width += 1;
        }
        current.push_str(word);
        width += len;
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(s.to_string());
    }
    lines
}
