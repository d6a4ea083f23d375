use crate::model::EditRequest;

const PACKET_ID: &str = "W5M0MpCehiHzreSzNTczkc9d";
const NS_DC: &str = "http://purl.org/dc/elements/1.1/";
const NS_PHOTOSHOP: &str = "http://ns.adobe.com/photoshop/1.0/";
const NS_XMP: &str = "http://ns.adobe.com/xap/1.0/";

/// Render an edit request as a minimal, self-contained XMP packet.
///
/// Headline and creation date go on `rdf:Description` as attributes;
/// description and rights become `x-default` language alternatives,
/// creators an ordered `rdf:Seq`, subjects an `rdf:Bag`. Empty fields are
/// left out.
pub fn encode(edit: &EditRequest) -> String {
    let mut description = format!(
        r#"<rdf:Description xmlns:dc="{NS_DC}" xmlns:photoshop="{NS_PHOTOSHOP}" xmlns:xmp="{NS_XMP}""#
    );
    if let Some(headline) = edit.headline() {
        description.push_str(&format!(r#" photoshop:Headline="{}""#, xml_escape(headline)));
    }
    if let Some(date) = edit.date_created() {
        let date = xml_escape(date);
        description.push_str(&format!(r#" xmp:CreateDate="{date}""#));
        description.push_str(&format!(r#" photoshop:DateCreated="{date}""#));
    }
    description.push('>');

    let mut lines = vec![
        format!("<?xpacket begin=\"\u{FEFF}\" id=\"{PACKET_ID}\"?>"),
        r#"<x:xmpmeta xmlns:x="adobe:ns:meta/">"#.to_string(),
        r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">"#.to_string(),
        description,
    ];

    if let Some(text) = edit.description() {
        lines.push(lang_alt("dc:description", text));
    }
    if let Some(creator) = edit.creator() {
        let items = creator.items();
        if !items.is_empty() {
            lines.push(container("dc:creator", "rdf:Seq", &items));
        }
    }
    if let Some(subject) = edit.subject() {
        let items = subject.items();
        if !items.is_empty() {
            lines.push(container("dc:subject", "rdf:Bag", &items));
        }
    }
    if let Some(rights) = edit.rights() {
        lines.push(lang_alt("dc:rights", rights));
    }

    lines.extend(
        ["</rdf:Description>", "</rdf:RDF>", "</x:xmpmeta>", r#"<?xpacket end="w"?>"#]
            .map(String::from),
    );
    lines.join("\n")
}

fn lang_alt(property: &str, text: &str) -> String {
    format!(
        r#"<{property}><rdf:Alt><rdf:li xml:lang="x-default">{}</rdf:li></rdf:Alt></{property}>"#,
        xml_escape(text)
    )
}

fn container(property: &str, kind: &str, items: &[String]) -> String {
    let lis: String = items
        .iter()
        .map(|item| format!("<rdf:li>{}</rdf:li>", xml_escape(item)))
        .collect();
    format!("<{property}><{kind}>{lis}</{kind}></{property}>")
}

/// Escape the five XML special characters.
pub fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
