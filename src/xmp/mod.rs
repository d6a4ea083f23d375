//! XMP packet location, decoding and encoding.
//!
//! - [`decoder::decode`]: RDF/XML packet → flat `name → value` map
//! - [`encoder::encode`]: [`EditRequest`](crate::model::EditRequest) → packet
//! - [`XmpSource`]: pluggable packet locators, tried in order

pub mod decoder;
pub mod encoder;
mod source;

pub use source::{ScanXmpSource, SegmentXmpSource, XmpSource, find_packet, first_packet, source_by_name};
