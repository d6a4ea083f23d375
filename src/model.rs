//! Value types shared by the decoders, encoders and the service.
//!
//! [`RawValue`] is what the codec boundary hands in, [`NormalizedValue`] is
//! what callers get back, and [`EditRequest`] is what the encoders consume.

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::MetadataError;

/// Flat `name → value` map produced by the decoders.
pub type MetadataMap = BTreeMap<String, NormalizedValue>;

/// A decoded tag value before normalization.
///
/// Shapes follow the conventions of the EXIF codec: single-count integer
/// tags arrive as [`RawValue::Integer`], multi-count ones as
/// [`RawValue::IntArray`], ASCII and UNDEFINED payloads as
/// [`RawValue::ByteBuffer`], rationals as pairs of `(numerator, denominator)`.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Integer(i64),
    Float(f64),
    Text(String),
    ByteBuffer(Vec<u8>),
    IntArray(Vec<i64>),
    RationalPair(i64, i64),
    RationalArray(Vec<(i64, i64)>),
    List(Vec<RawValue>),
    NestedMap(Vec<(String, RawValue)>),
}

/// Canonical, JSON-safe metadata value.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedValue {
    Text(String),
    Number(f64),
    List(Vec<NormalizedValue>),
    Map(BTreeMap<String, NormalizedValue>),
}

impl NormalizedValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[NormalizedValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    fn is_integral(n: f64) -> bool {
        n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15
    }
}

impl Serialize for NormalizedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Text(s) => serializer.serialize_str(s),
            Self::Number(n) if Self::is_integral(*n) => serializer.serialize_i64(*n as i64),
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::List(items) => items.serialize(serializer),
            Self::Map(map) => map.serialize(serializer),
        }
    }
}

impl fmt::Display for NormalizedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) if Self::is_integral(*n) => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Self::Map(map) => {
                let json = serde_json::to_string(map).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

impl From<NormalizedValue> for RawValue {
    fn from(value: NormalizedValue) -> Self {
        match value {
            NormalizedValue::Text(s) => RawValue::Text(s),
            NormalizedValue::Number(n) => RawValue::Float(n),
            NormalizedValue::List(items) => {
                RawValue::List(items.into_iter().map(RawValue::from).collect())
            }
            NormalizedValue::Map(map) => {
                RawValue::NestedMap(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

/// A field that may be given as a delimited string or as a ready list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextOrList {
    Text(String),
    List(Vec<String>),
}

impl TextOrList {
    /// Individual items: strings are split on `,` and `;`, every item is
    /// trimmed and empty ones are dropped.
    pub fn items(&self) -> Vec<String> {
        match self {
            Self::Text(s) => split_items(s),
            Self::List(list) => list
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Single-string form. Strings are kept verbatim, lists are joined.
    pub fn joined(&self, separator: &str) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::List(_) => self.items().join(separator),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::List(_) => self.items().is_empty(),
        }
    }
}

impl From<&str> for TextOrList {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Vec<String>> for TextOrList {
    fn from(list: Vec<String>) -> Self {
        Self::List(list)
    }
}

/// Split a user-entered list on `,` / `;`, trimming and dropping empties.
pub fn split_items(s: &str) -> Vec<String> {
    s.split([',', ';'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// User-edited fields to write into an image.
///
/// Legacy names (`title`, `authors`, `copyright`, `comments`, `tags`) are
/// accepted as fallbacks. The accessor methods resolve them: the preferred
/// field wins whenever it is non-empty.
///
/// # Example
///
/// ```rust
/// use imgmeta::model::EditRequest;
///
/// let edit: EditRequest = serde_json::from_str(r#"{
///     "title": "Old title",
///     "headline": "Sunset",
///     "authors": "Jane Doe",
///     "tags": "beach; evening"
/// }"#).unwrap();
///
/// assert_eq!(edit.headline(), Some("Sunset"));
/// assert_eq!(edit.creator().unwrap().items(), vec!["Jane Doe"]);
/// assert!(edit.purge_non_camera);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditRequest {
    pub headline: Option<String>,
    pub creator: Option<TextOrList>,
    pub rights: Option<String>,
    pub subject: Option<TextOrList>,
    pub description: Option<String>,
    pub date_created: Option<String>,
    /// Drop every EXIF tag outside the camera allow-list before writing.
    pub purge_non_camera: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<TextOrList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<TextOrList>,
}

impl Default for EditRequest {
    fn default() -> Self {
        Self {
            headline: None,
            creator: None,
            rights: None,
            subject: None,
            description: None,
            date_created: None,
            purge_non_camera: true,
            title: None,
            authors: None,
            copyright: None,
            comments: None,
            tags: None,
        }
    }
}

fn pick_text<'a>(preferred: &'a Option<String>, legacy: &'a Option<String>) -> Option<&'a str> {
    [preferred, legacy]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .find(|s| !s.is_empty())
}

fn pick_list<'a>(
    preferred: &'a Option<TextOrList>,
    legacy: &'a Option<TextOrList>,
) -> Option<&'a TextOrList> {
    [preferred, legacy].into_iter().flatten().find(|v| !v.is_empty())
}

impl EditRequest {
    pub fn headline(&self) -> Option<&str> {
        pick_text(&self.headline, &self.title)
    }

    pub fn creator(&self) -> Option<&TextOrList> {
        pick_list(&self.creator, &self.authors)
    }

    pub fn rights(&self) -> Option<&str> {
        pick_text(&self.rights, &self.copyright)
    }

    pub fn subject(&self) -> Option<&TextOrList> {
        pick_list(&self.subject, &self.tags)
    }

    pub fn description(&self) -> Option<&str> {
        pick_text(&self.description, &self.comments)
    }

    pub fn date_created(&self) -> Option<&str> {
        self.date_created.as_deref().filter(|s| !s.is_empty())
    }

    /// True when no field would be written by either encoder.
    pub fn is_empty(&self) -> bool {
        self.headline().is_none()
            && self.creator().is_none()
            && self.rights().is_none()
            && self.subject().is_none()
            && self.description().is_none()
            && self.date_created().is_none()
    }
}

/// Container-level facts about an image.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GeneralInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<[u32; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    pub file_size: u64,
}

/// Everything read from one image. Built per call, never cached.
#[derive(Debug, Default, Serialize)]
pub struct MetadataBundle {
    pub general: GeneralInfo,
    pub exif: MetadataMap,
    pub xmp: MetadataMap,
    /// The last phase failure seen while building this bundle.
    #[serde(skip)]
    pub last_error: Option<MetadataError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── EditRequest fallbacks ────────────────────────────────────────

    #[test]
    fn preferred_field_wins() {
        let edit = EditRequest {
            headline: Some("New".into()),
            title: Some("Old".into()),
            ..Default::default()
        };
        assert_eq!(edit.headline(), Some("New"));
    }

    #[test]
    fn empty_preferred_falls_back_to_legacy() {
        let edit = EditRequest {
            rights: Some(String::new()),
            copyright: Some("© 2024".into()),
            comments: Some("note".into()),
            ..Default::default()
        };
        assert_eq!(edit.rights(), Some("© 2024"));
        assert_eq!(edit.description(), Some("note"));
        assert!(edit.headline().is_none());
    }

    #[test]
    fn tags_stand_in_for_subject() {
        let edit = EditRequest {
            tags: Some(TextOrList::List(vec!["a".into(), " ".into(), "b".into()])),
            ..Default::default()
        };
        assert_eq!(edit.subject().unwrap().items(), vec!["a", "b"]);
    }

    #[test]
    fn purge_defaults_to_true_from_json() {
        let edit: EditRequest = serde_json::from_str(r#"{"headline": "x"}"#).unwrap();
        assert!(edit.purge_non_camera);
        let edit: EditRequest =
            serde_json::from_str(r#"{"headline": "x", "purge_non_camera": false}"#).unwrap();
        assert!(!edit.purge_non_camera);
    }

    #[test]
    fn empty_request_is_empty() {
        assert!(EditRequest::default().is_empty());
    }

    // ── TextOrList ───────────────────────────────────────────────────

    #[test]
    fn text_items_split_on_commas_and_semicolons() {
        let v = TextOrList::from("cat, dog;; bird ");
        assert_eq!(v.items(), vec!["cat", "dog", "bird"]);
        assert_eq!(v.joined("; "), "cat, dog;; bird ");
    }

    #[test]
    fn list_joined_drops_blanks() {
        let v = TextOrList::from(vec!["A".to_string(), "".to_string(), "B".to_string()]);
        assert_eq!(v.joined(", "), "A, B");
    }

    // ── NormalizedValue serialization ────────────────────────────────

    #[test]
    fn integral_numbers_serialize_as_integers() {
        let v = NormalizedValue::List(vec![
            NormalizedValue::Number(1.0),
            NormalizedValue::Number(0.5),
            NormalizedValue::Text("x".into()),
        ]);
        assert_eq!(serde_json::to_string(&v).unwrap(), r#"[1,0.5,"x"]"#);
    }

    #[test]
    fn display_joins_lists() {
        let v = NormalizedValue::List(vec![
            NormalizedValue::Text("cat".into()),
            NormalizedValue::Number(2.0),
        ]);
        assert_eq!(v.to_string(), "cat, 2");
    }
}
