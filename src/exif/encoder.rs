use super::catalog::{self, Ifd};
use super::codec::ExifBlock;
use crate::model::{EditRequest, RawValue};

/// Apply an edit to an existing EXIF block.
///
/// With `purge_non_camera` set, only allow-listed 0th/Exif tags and the
/// whole GPS IFD survive; the 1st IFD, Interop and the thumbnail go.
/// Empty edit fields leave their tags untouched.
pub fn encode(existing: &ExifBlock, edit: &EditRequest) -> ExifBlock {
    let mut block = if edit.purge_non_camera {
        purge(existing)
    } else {
        existing.clone()
    };

    if let Some(headline) = edit.headline() {
        block.insert(Ifd::Zeroth, catalog::IMAGE_DESCRIPTION, utf8(headline));
    }
    if let Some(creator) = edit.creator() {
        block.insert(Ifd::Zeroth, catalog::ARTIST, utf8(&creator.joined(", ")));
    }
    if let Some(rights) = edit.rights() {
        block.insert(Ifd::Zeroth, catalog::COPYRIGHT, utf8(rights));
    }
    if let Some(subject) = edit.subject() {
        block.insert(Ifd::Zeroth, catalog::XP_SUBJECT, utf16le(&subject.joined("; ")));
    }
    if let Some(description) = edit.description() {
        block.insert(Ifd::Exif, catalog::USER_COMMENT, utf8(description));
    }
    if let Some(date) = edit.date_created() {
        block.insert(Ifd::Exif, catalog::DATE_TIME_ORIGINAL, utf8(date));
    }

    block
}

/// Keep only capture-intrinsic tags and the GPS IFD.
pub fn purge(existing: &ExifBlock) -> ExifBlock {
    let mut out = ExifBlock::default();
    for (&ifd, tags) in &existing.ifds {
        match ifd {
            Ifd::Gps => {
                out.ifds.insert(Ifd::Gps, tags.clone());
            }
            Ifd::Zeroth | Ifd::Exif => {
                for (&tag, value) in tags {
                    if catalog::is_camera_tag(ifd, tag) {
                        out.insert(ifd, tag, value.clone());
                    }
                }
            }
            Ifd::Interop | Ifd::First => {}
        }
    }
    let dropped = existing.tag_count() - out.tag_count();
    if dropped > 0 {
        log::debug!("Purged {dropped} non-camera EXIF tags");
    }
    out
}

fn utf8(s: &str) -> RawValue {
    RawValue::ByteBuffer(s.as_bytes().to_vec())
}

fn utf16le(s: &str) -> RawValue {
    RawValue::ByteBuffer(s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect())
}
