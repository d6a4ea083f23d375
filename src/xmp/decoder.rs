use roxmltree::{Document, Node};

use crate::error::{MetadataError, Result};
use crate::model::{MetadataMap, NormalizedValue, RawValue};
use crate::normalize;

pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";

/// Properties whose single-item language alternative collapses to a string.
const SCALAR_PROPERTIES: &[&str] = &["title", "description", "rights", "headline"];

/// Decode an XMP packet into a flat `name → value` map.
///
/// A packet that is not well-formed XML does not fail: the result holds
/// the raw packet under `xmp_packet` and the parser message under `error`.
pub fn decode(packet: &str) -> MetadataMap {
    match parse(packet) {
        Ok(entries) => normalize::normalize_map(entries),
        Err(e) => {
            log::warn!("{e}");
            let message = match e {
                MetadataError::MalformedPacket(m) => m,
                other => other.to_string(),
            };
            MetadataMap::from([
                ("xmp_packet".to_string(), NormalizedValue::Text(packet.to_string())),
                ("error".to_string(), NormalizedValue::Text(format!("xmp(parse): {message}"))),
            ])
        }
    }
}

/// Collect the properties of every `rdf:Description` in document order.
pub fn parse(packet: &str) -> Result<Vec<(String, RawValue)>> {
    let doc = Document::parse(packet).map_err(|e| MetadataError::MalformedPacket(e.to_string()))?;

    let mut entries = Vec::new();
    for desc in doc.descendants().filter(|n| n.has_tag_name((RDF_NS, "Description"))) {
        for attr in desc.attributes() {
            entries.push((attr.name().to_string(), RawValue::Text(attr.value().to_string())));
        }
        for child in desc.children().filter(|n| n.is_element()) {
            if let Some(entry) = property(child) {
                entries.push(entry);
            }
        }
    }
    Ok(entries)
}

fn property(node: Node) -> Option<(String, RawValue)> {
    let name = node.tag_name().name();
    let items: Vec<Node> = node
        .descendants()
        .filter(|n| n.has_tag_name((RDF_NS, "li")))
        .collect();

    if items.is_empty() {
        let text = node.text()?.trim();
        return (!text.is_empty()).then(|| (name.to_string(), RawValue::Text(text.to_string())));
    }

    let mut texts: Vec<String> = items
        .iter()
        .filter_map(|li| li.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    let lower = name.to_ascii_lowercase();
    let key = if lower == "headline" { "Headline".to_string() } else { name.to_string() };
    if SCALAR_PROPERTIES.contains(&lower.as_str()) && texts.len() == 1 {
        return Some((key, RawValue::Text(texts.remove(0))));
    }
    Some((key, RawValue::List(texts.into_iter().map(RawValue::Text).collect())))
}
