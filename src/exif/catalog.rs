use std::fmt;

/// An Image File Directory, in the order tags are walked when decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Ifd {
    Zeroth,
    Exif,
    Gps,
    Interop,
    First,
}

impl Ifd {
    pub const ALL: [Ifd; 5] = [Ifd::Zeroth, Ifd::Exif, Ifd::Gps, Ifd::Interop, Ifd::First];

    pub fn name(self) -> &'static str {
        match self {
            Ifd::Zeroth => "0th",
            Ifd::Exif => "Exif",
            Ifd::Gps => "GPS",
            Ifd::Interop => "Interop",
            Ifd::First => "1st",
        }
    }

    fn table(self) -> &'static [TagDef] {
        match self {
            Ifd::Zeroth | Ifd::First => IMAGE_TAGS,
            Ifd::Exif => EXIF_TAGS,
            Ifd::Gps => GPS_TAGS,
            Ifd::Interop => INTEROP_TAGS,
        }
    }
}

impl fmt::Display for Ifd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// TIFF field type a tag is written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Byte,
    Ascii,
    Short,
    Long,
    Rational,
    SByte,
    Undefined,
    SShort,
    SLong,
    SRational,
    Float,
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagDef {
    pub id: u16,
    pub name: &'static str,
    pub kind: TagKind,
}

const fn def(id: u16, name: &'static str, kind: TagKind) -> TagDef {
    TagDef { id, name, kind }
}

// Tag ids the encoders and the codec refer to directly.
pub const IMAGE_DESCRIPTION: u16 = 0x010E;
pub const MAKE: u16 = 0x010F;
pub const MODEL: u16 = 0x0110;
pub const ORIENTATION: u16 = 0x0112;
pub const X_RESOLUTION: u16 = 0x011A;
pub const Y_RESOLUTION: u16 = 0x011B;
pub const RESOLUTION_UNIT: u16 = 0x0128;
pub const ARTIST: u16 = 0x013B;
pub const XML_PACKET: u16 = 0x02BC;
pub const COPYRIGHT: u16 = 0x8298;
pub const XP_TITLE: u16 = 0x9C9B;
pub const XP_KEYWORDS: u16 = 0x9C9E;
pub const XP_SUBJECT: u16 = 0x9C9F;
pub const DATE_TIME_ORIGINAL: u16 = 0x9003;
pub const USER_COMMENT: u16 = 0x9286;
pub const SOFTWARE: u16 = 0x0131;

// Camera allow-list, EXIF IFD.
pub const DATE_TIME_DIGITIZED: u16 = 0x9004;
pub const SUB_SEC_TIME_ORIGINAL: u16 = 0x9291;
pub const SUB_SEC_TIME_DIGITIZED: u16 = 0x9292;
pub const EXIF_VERSION: u16 = 0x9000;
pub const EXPOSURE_TIME: u16 = 0x829A;
pub const F_NUMBER: u16 = 0x829D;
pub const SHUTTER_SPEED_VALUE: u16 = 0x9201;
pub const APERTURE_VALUE: u16 = 0x9202;
pub const EXPOSURE_BIAS_VALUE: u16 = 0x9204;
pub const MAX_APERTURE_VALUE: u16 = 0x9205;
pub const EXPOSURE_PROGRAM: u16 = 0x8822;
pub const ISO_SPEED_RATINGS: u16 = 0x8827;
pub const SENSITIVITY_TYPE: u16 = 0x8830;
pub const RECOMMENDED_EXPOSURE_INDEX: u16 = 0x8832;
pub const METERING_MODE: u16 = 0x9207;
pub const FLASH: u16 = 0x9209;
pub const FOCAL_LENGTH: u16 = 0x920A;
pub const COLOR_SPACE: u16 = 0xA001;
pub const FOCAL_PLANE_X_RESOLUTION: u16 = 0xA20E;
pub const FOCAL_PLANE_Y_RESOLUTION: u16 = 0xA20F;
pub const FOCAL_PLANE_RESOLUTION_UNIT: u16 = 0xA210;
pub const CUSTOM_RENDERED: u16 = 0xA401;
pub const EXPOSURE_MODE: u16 = 0xA402;
pub const WHITE_BALANCE: u16 = 0xA403;
pub const SCENE_CAPTURE_TYPE: u16 = 0xA406;
pub const BODY_SERIAL_NUMBER: u16 = 0xA431;
pub const LENS_SPECIFICATION: u16 = 0xA432;
pub const LENS_MODEL: u16 = 0xA434;
pub const LENS_SERIAL_NUMBER: u16 = 0xA435;

pub const IMAGE_WIDTH: u16 = 0x0100;
pub const IMAGE_LENGTH: u16 = 0x0101;
pub const BITS_PER_SAMPLE: u16 = 0x0102;
pub const COMPRESSION: u16 = 0x0103;
pub const PHOTOMETRIC_INTERPRETATION: u16 = 0x0106;
pub const STRIP_OFFSETS: u16 = 0x0111;
pub const SAMPLES_PER_PIXEL: u16 = 0x0115;
pub const ROWS_PER_STRIP: u16 = 0x0116;
pub const STRIP_BYTE_COUNTS: u16 = 0x0117;
pub const PLANAR_CONFIGURATION: u16 = 0x011C;
pub const TILE_OFFSETS: u16 = 0x0144;
pub const TILE_BYTE_COUNTS: u16 = 0x0145;
pub const EXTRA_SAMPLES: u16 = 0x0152;
pub const JPEG_INTERCHANGE_FORMAT: u16 = 0x0201;
pub const JPEG_INTERCHANGE_FORMAT_LENGTH: u16 = 0x0202;
pub const EXIF_POINTER: u16 = 0x8769;
pub const GPS_POINTER: u16 = 0x8825;
pub const INTEROP_POINTER: u16 = 0xA005;
pub const PREDICTOR: u16 = 0x013D;
pub const COLOR_MAP: u16 = 0x0140;
pub const TILE_WIDTH: u16 = 0x0142;
pub const TILE_LENGTH: u16 = 0x0143;
pub const SAMPLE_FORMAT: u16 = 0x0153;

/// Tags describing the pixel layout of a TIFF strip. They belong to the
/// image data, not to the editable metadata.
pub const STRUCTURAL_TAGS: &[u16] = &[
    IMAGE_WIDTH,
    IMAGE_LENGTH,
    BITS_PER_SAMPLE,
    COMPRESSION,
    PHOTOMETRIC_INTERPRETATION,
    STRIP_OFFSETS,
    SAMPLES_PER_PIXEL,
    ROWS_PER_STRIP,
    STRIP_BYTE_COUNTS,
    PLANAR_CONFIGURATION,
    TILE_WIDTH,
    TILE_LENGTH,
    TILE_OFFSETS,
    TILE_BYTE_COUNTS,
    EXTRA_SAMPLES,
    SAMPLE_FORMAT,
    COLOR_MAP,
    PREDICTOR,
];

/// Offsets and pointers the writer computes itself.
pub const LAYOUT_TAGS: &[u16] = &[
    EXIF_POINTER,
    GPS_POINTER,
    INTEROP_POINTER,
    STRIP_OFFSETS,
    STRIP_BYTE_COUNTS,
    TILE_OFFSETS,
    TILE_BYTE_COUNTS,
    JPEG_INTERCHANGE_FORMAT,
    JPEG_INTERCHANGE_FORMAT_LENGTH,
];

/// Capture-intrinsic tags that survive a purge. The GPS IFD is kept whole
/// and is not listed here.
pub static CAMERA_TAGS: &[(Ifd, u16)] = &[
    (Ifd::Zeroth, MAKE),
    (Ifd::Zeroth, MODEL),
    (Ifd::Zeroth, ORIENTATION),
    (Ifd::Zeroth, X_RESOLUTION),
    (Ifd::Zeroth, Y_RESOLUTION),
    (Ifd::Zeroth, RESOLUTION_UNIT),
    (Ifd::Exif, DATE_TIME_ORIGINAL),
    (Ifd::Exif, DATE_TIME_DIGITIZED),
    (Ifd::Exif, SUB_SEC_TIME_ORIGINAL),
    (Ifd::Exif, SUB_SEC_TIME_DIGITIZED),
    (Ifd::Exif, EXIF_VERSION),
    (Ifd::Exif, EXPOSURE_TIME),
    (Ifd::Exif, F_NUMBER),
    (Ifd::Exif, SHUTTER_SPEED_VALUE),
    (Ifd::Exif, APERTURE_VALUE),
    (Ifd::Exif, EXPOSURE_BIAS_VALUE),
    (Ifd::Exif, MAX_APERTURE_VALUE),
    (Ifd::Exif, EXPOSURE_PROGRAM),
    (Ifd::Exif, ISO_SPEED_RATINGS),
    (Ifd::Exif, SENSITIVITY_TYPE),
    (Ifd::Exif, RECOMMENDED_EXPOSURE_INDEX),
    (Ifd::Exif, METERING_MODE),
    (Ifd::Exif, FLASH),
    (Ifd::Exif, FOCAL_LENGTH),
    (Ifd::Exif, COLOR_SPACE),
    (Ifd::Exif, FOCAL_PLANE_X_RESOLUTION),
    (Ifd::Exif, FOCAL_PLANE_Y_RESOLUTION),
    (Ifd::Exif, FOCAL_PLANE_RESOLUTION_UNIT),
    (Ifd::Exif, CUSTOM_RENDERED),
    (Ifd::Exif, EXPOSURE_MODE),
    (Ifd::Exif, WHITE_BALANCE),
    (Ifd::Exif, SCENE_CAPTURE_TYPE),
    (Ifd::Exif, BODY_SERIAL_NUMBER),
    (Ifd::Exif, LENS_SPECIFICATION),
    (Ifd::Exif, LENS_MODEL),
    (Ifd::Exif, LENS_SERIAL_NUMBER),
];

use TagKind::*;

static IMAGE_TAGS: &[TagDef] = &[
    def(0x000B, "ProcessingSoftware", Ascii),
    def(0x00FE, "NewSubfileType", Long),
    def(0x00FF, "SubfileType", Short),
    def(IMAGE_WIDTH, "ImageWidth", Long),
    def(IMAGE_LENGTH, "ImageLength", Long),
    def(BITS_PER_SAMPLE, "BitsPerSample", Short),
    def(COMPRESSION, "Compression", Short),
    def(PHOTOMETRIC_INTERPRETATION, "PhotometricInterpretation", Short),
    def(0x010D, "DocumentName", Ascii),
    def(IMAGE_DESCRIPTION, "ImageDescription", Ascii),
    def(MAKE, "Make", Ascii),
    def(MODEL, "Model", Ascii),
    def(STRIP_OFFSETS, "StripOffsets", Long),
    def(ORIENTATION, "Orientation", Short),
    def(SAMPLES_PER_PIXEL, "SamplesPerPixel", Short),
    def(ROWS_PER_STRIP, "RowsPerStrip", Long),
    def(STRIP_BYTE_COUNTS, "StripByteCounts", Long),
    def(X_RESOLUTION, "XResolution", Rational),
    def(Y_RESOLUTION, "YResolution", Rational),
    def(PLANAR_CONFIGURATION, "PlanarConfiguration", Short),
    def(RESOLUTION_UNIT, "ResolutionUnit", Short),
    def(0x012D, "TransferFunction", Short),
    def(SOFTWARE, "Software", Ascii),
    def(0x0132, "DateTime", Ascii),
    def(ARTIST, "Artist", Ascii),
    def(0x013C, "HostComputer", Ascii),
    def(PREDICTOR, "Predictor", Short),
    def(0x013E, "WhitePoint", Rational),
    def(0x013F, "PrimaryChromaticities", Rational),
    def(COLOR_MAP, "ColorMap", Short),
    def(TILE_WIDTH, "TileWidth", Long),
    def(TILE_LENGTH, "TileLength", Long),
    def(TILE_OFFSETS, "TileOffsets", Long),
    def(TILE_BYTE_COUNTS, "TileByteCounts", Long),
    def(EXTRA_SAMPLES, "ExtraSamples", Short),
    def(SAMPLE_FORMAT, "SampleFormat", Short),
    def(JPEG_INTERCHANGE_FORMAT, "JPEGInterchangeFormat", Long),
    def(JPEG_INTERCHANGE_FORMAT_LENGTH, "JPEGInterchangeFormatLength", Long),
    def(0x0211, "YCbCrCoefficients", Rational),
    def(0x0212, "YCbCrSubSampling", Short),
    def(0x0213, "YCbCrPositioning", Short),
    def(0x0214, "ReferenceBlackWhite", Rational),
    def(XML_PACKET, "XMLPacket", Byte),
    def(0x4746, "Rating", Short),
    def(0x4749, "RatingPercent", Short),
    def(COPYRIGHT, "Copyright", Ascii),
    def(EXIF_POINTER, "ExifTag", Long),
    def(0x8773, "InterColorProfile", Undefined),
    def(GPS_POINTER, "GPSTag", Long),
    def(XP_TITLE, "XPTitle", Byte),
    def(0x9C9C, "XPComment", Byte),
    def(0x9C9D, "XPAuthor", Byte),
    def(XP_KEYWORDS, "XPKeywords", Byte),
    def(XP_SUBJECT, "XPSubject", Byte),
    def(0xC4A5, "PrintImageMatching", Undefined),
];

static EXIF_TAGS: &[TagDef] = &[
    def(EXPOSURE_TIME, "ExposureTime", Rational),
    def(F_NUMBER, "FNumber", Rational),
    def(EXPOSURE_PROGRAM, "ExposureProgram", Short),
    def(0x8824, "SpectralSensitivity", Ascii),
    def(ISO_SPEED_RATINGS, "ISOSpeedRatings", Short),
    def(0x8828, "OECF", Undefined),
    def(SENSITIVITY_TYPE, "SensitivityType", Short),
    def(0x8831, "StandardOutputSensitivity", Long),
    def(RECOMMENDED_EXPOSURE_INDEX, "RecommendedExposureIndex", Long),
    def(0x8833, "ISOSpeed", Long),
    def(EXIF_VERSION, "ExifVersion", Undefined),
    def(DATE_TIME_ORIGINAL, "DateTimeOriginal", Ascii),
    def(DATE_TIME_DIGITIZED, "DateTimeDigitized", Ascii),
    def(0x9010, "OffsetTime", Ascii),
    def(0x9011, "OffsetTimeOriginal", Ascii),
    def(0x9012, "OffsetTimeDigitized", Ascii),
    def(0x9101, "ComponentsConfiguration", Undefined),
    def(0x9102, "CompressedBitsPerPixel", Rational),
    def(SHUTTER_SPEED_VALUE, "ShutterSpeedValue", SRational),
    def(APERTURE_VALUE, "ApertureValue", Rational),
    def(0x9203, "BrightnessValue", SRational),
    def(EXPOSURE_BIAS_VALUE, "ExposureBiasValue", SRational),
    def(MAX_APERTURE_VALUE, "MaxApertureValue", Rational),
    def(0x9206, "SubjectDistance", Rational),
    def(METERING_MODE, "MeteringMode", Short),
    def(0x9208, "LightSource", Short),
    def(FLASH, "Flash", Short),
    def(FOCAL_LENGTH, "FocalLength", Rational),
    def(0x9214, "SubjectArea", Short),
    def(0x927C, "MakerNote", Undefined),
    def(USER_COMMENT, "UserComment", Undefined),
    def(0x9290, "SubSecTime", Ascii),
    def(SUB_SEC_TIME_ORIGINAL, "SubSecTimeOriginal", Ascii),
    def(SUB_SEC_TIME_DIGITIZED, "SubSecTimeDigitized", Ascii),
    def(0xA000, "FlashpixVersion", Undefined),
    def(COLOR_SPACE, "ColorSpace", Short),
    def(0xA002, "PixelXDimension", Long),
    def(0xA003, "PixelYDimension", Long),
    def(0xA004, "RelatedSoundFile", Ascii),
    def(INTEROP_POINTER, "InteroperabilityTag", Long),
    def(0xA20B, "FlashEnergy", Rational),
    def(FOCAL_PLANE_X_RESOLUTION, "FocalPlaneXResolution", Rational),
    def(FOCAL_PLANE_Y_RESOLUTION, "FocalPlaneYResolution", Rational),
    def(FOCAL_PLANE_RESOLUTION_UNIT, "FocalPlaneResolutionUnit", Short),
    def(0xA214, "SubjectLocation", Short),
    def(0xA215, "ExposureIndex", Rational),
    def(0xA217, "SensingMethod", Short),
    def(0xA300, "FileSource", Undefined),
    def(0xA301, "SceneType", Undefined),
    def(0xA302, "CFAPattern", Undefined),
    def(CUSTOM_RENDERED, "CustomRendered", Short),
    def(EXPOSURE_MODE, "ExposureMode", Short),
    def(WHITE_BALANCE, "WhiteBalance", Short),
    def(0xA404, "DigitalZoomRatio", Rational),
    def(0xA405, "FocalLengthIn35mmFilm", Short),
    def(SCENE_CAPTURE_TYPE, "SceneCaptureType", Short),
    def(0xA407, "GainControl", Short),
    def(0xA408, "Contrast", Short),
    def(0xA409, "Saturation", Short),
    def(0xA40A, "Sharpness", Short),
    def(0xA40C, "SubjectDistanceRange", Short),
    def(0xA420, "ImageUniqueID", Ascii),
    def(0xA430, "CameraOwnerName", Ascii),
    def(BODY_SERIAL_NUMBER, "BodySerialNumber", Ascii),
    def(LENS_SPECIFICATION, "LensSpecification", Rational),
    def(0xA433, "LensMake", Ascii),
    def(LENS_MODEL, "LensModel", Ascii),
    def(LENS_SERIAL_NUMBER, "LensSerialNumber", Ascii),
    def(0xA500, "Gamma", Rational),
];

static GPS_TAGS: &[TagDef] = &[
    def(0x0000, "GPSVersionID", Byte),
    def(0x0001, "GPSLatitudeRef", Ascii),
    def(0x0002, "GPSLatitude", Rational),
    def(0x0003, "GPSLongitudeRef", Ascii),
    def(0x0004, "GPSLongitude", Rational),
    def(0x0005, "GPSAltitudeRef", Byte),
    def(0x0006, "GPSAltitude", Rational),
    def(0x0007, "GPSTimeStamp", Rational),
    def(0x0008, "GPSSatellites", Ascii),
    def(0x0009, "GPSStatus", Ascii),
    def(0x000A, "GPSMeasureMode", Ascii),
    def(0x000B, "GPSDOP", Rational),
    def(0x000C, "GPSSpeedRef", Ascii),
    def(0x000D, "GPSSpeed", Rational),
    def(0x000E, "GPSTrackRef", Ascii),
    def(0x000F, "GPSTrack", Rational),
    def(0x0010, "GPSImgDirectionRef", Ascii),
    def(0x0011, "GPSImgDirection", Rational),
    def(0x0012, "GPSMapDatum", Ascii),
    def(0x0013, "GPSDestLatitudeRef", Ascii),
    def(0x0014, "GPSDestLatitude", Rational),
    def(0x0015, "GPSDestLongitudeRef", Ascii),
    def(0x0016, "GPSDestLongitude", Rational),
    def(0x0017, "GPSDestBearingRef", Ascii),
    def(0x0018, "GPSDestBearing", Rational),
    def(0x0019, "GPSDestDistanceRef", Ascii),
    def(0x001A, "GPSDestDistance", Rational),
    def(0x001B, "GPSProcessingMethod", Undefined),
    def(0x001C, "GPSAreaInformation", Undefined),
    def(0x001D, "GPSDateStamp", Ascii),
    def(0x001E, "GPSDifferential", Short),
    def(0x001F, "GPSHPositioningError", Rational),
];

static INTEROP_TAGS: &[TagDef] = &[
    def(0x0001, "InteroperabilityIndex", Ascii),
    def(0x0002, "InteroperabilityVersion", Undefined),
    def(0x1000, "RelatedImageFileFormat", Ascii),
    def(0x1001, "RelatedImageWidth", Long),
    def(0x1002, "RelatedImageLength", Long),
];

/// Definition of `tag` in `ifd`, if the catalog knows it.
pub fn lookup(ifd: Ifd, tag: u16) -> Option<&'static TagDef> {
    ifd.table().iter().find(|d| d.id == tag)
}

pub fn tag_name(ifd: Ifd, tag: u16) -> Option<&'static str> {
    lookup(ifd, tag).map(|d| d.name)
}

/// Reverse lookup by semantic name.
pub fn tag_id(ifd: Ifd, name: &str) -> Option<u16> {
    ifd.table().iter().find(|d| d.name == name).map(|d| d.id)
}

/// Semantic name, or `"{ifd}:0x{TAG}"` for tags the catalog does not know.
pub fn display_name(ifd: Ifd, tag: u16) -> String {
    match tag_name(ifd, tag) {
        Some(name) => name.to_string(),
        None => format!("{ifd}:0x{tag:04X}"),
    }
}

/// True for pointers and offsets that only make sense inside one
/// serialized layout.
pub fn is_layout_tag(ifd: Ifd, tag: u16) -> bool {
    match ifd {
        Ifd::Zeroth | Ifd::First => LAYOUT_TAGS.contains(&tag),
        Ifd::Exif => tag == INTEROP_POINTER,
        Ifd::Gps | Ifd::Interop => false,
    }
}

/// True for pixel-layout tags of the primary image.
pub fn is_structural_tag(ifd: Ifd, tag: u16) -> bool {
    ifd == Ifd::Zeroth && STRUCTURAL_TAGS.contains(&tag)
}

/// True if `(ifd, tag)` is on the camera allow-list.
pub fn is_camera_tag(ifd: Ifd, tag: u16) -> bool {
    CAMERA_TAGS.contains(&(ifd, tag))
}
