//! # imgmeta
//!
//! EXIF/XMP metadata normalization and re-encoding engine. Raw EXIF tags
//! and XMP packets are decoded into canonical, JSON-safe values; edited
//! fields are encoded back into the image, optionally purging every EXIF
//! tag that is not intrinsic to the capture.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use imgmeta::model::{EditRequest, TextOrList};
//! use imgmeta::service::MetadataService;
//! use std::path::Path;
//!
//! let service = MetadataService::default();
//! let path = Path::new("photo.jpg");
//!
//! // Read: general info, normalized EXIF and XMP
//! let bundle = service.read(path)?;
//! println!("{}", serde_json::to_string_pretty(&bundle)?);
//!
//! // Write: EXIF first, then XMP; each phase reports on its own
//! let edit = EditRequest {
//!     headline: Some("Harbour at dusk".into()),
//!     creator: Some(TextOrList::from("Jane Doe")),
//!     subject: Some(TextOrList::from("boats; sea")),
//!     ..Default::default()
//! };
//! let result = service.write(path, &edit, None)?;
//! if let Some(err) = &result.last_error {
//!     eprintln!("partial write: {err}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Batch Usage
//!
//! ```rust,no_run
//! use imgmeta::config::Config;
//! use imgmeta::model::EditRequest;
//! use imgmeta::pipeline::{build_service, collect_images, write_batch};
//! use std::path::PathBuf;
//! use std::sync::atomic::AtomicBool;
//!
//! let config = Config::load(Some("config.json".as_ref()))?;
//! let service = build_service(&config);
//! let images = collect_images(&[PathBuf::from("./photos")]);
//! let edit = EditRequest { rights: Some("CC-BY 4.0".into()), ..Default::default() };
//!
//! let summary = write_batch(&service, &images, &edit, &config, &AtomicBool::new(false));
//! println!("{} written, {} failed", summary.succeeded(), summary.failed());
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Supported Formats
//!
//! | Format | EXIF | XMP |
//! |--------|------|-----|
//! | JPEG (`.jpg`, `.jpeg`) | APP1 segment | APP1 segment |
//! | TIFF (`.tif`, `.tiff`) | IFD tags, re-encoded | `XMLPacket` tag, re-encoded |
//! | PNG (`.png`) | read only (`eXIf`) | `iTXt` chunk |
//! | GIF (`.gif`), BMP (`.bmp`) | copied unchanged | not supported |
//!
//! ## Modules
//!
//! - [`model`]: value types, edit requests and the metadata bundle
//! - [`normalize`]: raw value → JSON-safe value rules
//! - [`exif`]: tag catalog, block codec, EXIF decoder and encoder
//! - [`xmp`]: packet sources, XMP decoder and encoder
//! - [`container`]: per-format embedding and stripping
//! - [`service`]: read/write/strip/export orchestration
//! - [`pipeline`]: file collection and batch writes
//! - [`config`]: configuration types and loading/saving

pub mod config;
pub mod container;
pub mod error;
pub mod exif;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod service;
pub mod xmp;

pub use error::{MetadataError, Phase, Result};
