//! EXIF tag catalog, block codec, and the decode/encode mapping.
//!
//! An [`ExifBlock`] is the in-memory form of an image's EXIF: tags grouped
//! by [`Ifd`], plus the embedded JPEG thumbnail. [`read_block`] and
//! [`serialize`] move blocks in and out of files; [`decoder::decode`] turns
//! one into display names and normalized values; [`encoder::encode`] applies
//! an [`EditRequest`](crate::model::EditRequest) to one.

pub mod catalog;
mod codec;
pub mod decoder;
pub mod encoder;

pub use catalog::Ifd;
pub use codec::{ExifBlock, Strip, decode_tiff, read_block, serialize, to_fields, write_tiff};
