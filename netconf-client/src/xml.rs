//! XML helpers for configuration documents exchanged with the device.

use crate::error::{NetconfClientError, NetconfClientResult};
use crate::NETCONF_URN;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::{Reader, Writer};

pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Re-indents `doc` with two spaces per level.
///
/// Whitespace-only text between elements is dropped and any existing declaration is
/// replaced, so the output depends only on the document's content. Any other text is
/// kept byte for byte, surrounding whitespace included.
pub fn pretty_print(doc: &str) -> NetconfClientResult<String> {
    let mut reader = Reader::from_str(doc);
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Decl(_) => continue,
            Event::Text(text) if text.iter().all(u8::is_ascii_whitespace) => continue,
            event => writer.write_event(event)?,
        }
    }
    let body = String::from_utf8(writer.into_inner())
        .map_err(|e| NetconfClientError::new(format!("invalid utf-8 in xml: {}", e)))?;
    Ok(format!("{}\n{}\n", XML_DECLARATION, body))
}

/// Returns the first element named `local_name` (any prefix), tags included.
pub fn extract_element(doc: &str, local_name: &str) -> NetconfClientResult<String> {
    let mut reader = Reader::from_str(doc);
    loop {
        let start = reader.buffer_position();
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == local_name.as_bytes() => {
                let name = e.name().as_ref().to_vec();
                reader.read_to_end(QName(&name))?;
                return Ok(doc[start..reader.buffer_position()].to_string());
            }
            Event::Empty(e) if e.local_name().as_ref() == local_name.as_bytes() => {
                return Ok(doc[start..reader.buffer_position()].to_string());
            }
            Event::Eof => return Err(NetconfClientError::MissingElement(local_name.to_string())),
            _ => {}
        }
    }
}

/// Turns a stored document into the `<config>` element carried by `<edit-config>`.
///
/// A `<config>` or `<data>` root is renamed to `<config>` keeping its attributes and
/// children; any other root element is wrapped.
pub fn to_config_payload(doc: &str) -> NetconfClientResult<String> {
    let mut reader = Reader::from_str(doc);
    loop {
        let start = reader.buffer_position();
        match reader.read_event()? {
            Event::Start(root) if is_config_root(&root) => {
                let name = root.name().as_ref().to_vec();
                let inner = reader.read_text(QName(&name))?;
                return config_element(Some(&root), &inner);
            }
            Event::Empty(root) if is_config_root(&root) => {
                return config_element(Some(&root), "");
            }
            Event::Start(root) => {
                let name = root.name().as_ref().to_vec();
                reader.read_to_end(QName(&name))?;
                return config_element(None, &doc[start..reader.buffer_position()]);
            }
            Event::Empty(_) => {
                return config_element(None, &doc[start..reader.buffer_position()]);
            }
            Event::Eof => return Err(NetconfClientError::MissingElement("config".to_string())),
            _ => {}
        }
    }
}

/// `<data>` of a `<get-config>` reply as a pretty-printed `<config>` document.
pub fn config_from_reply(reply: &str) -> NetconfClientResult<String> {
    let data = extract_element(reply, "data")?;
    pretty_print(&to_config_payload(&data)?)
}

fn is_config_root(root: &BytesStart) -> bool {
    matches!(root.local_name().as_ref(), b"config" | b"data")
}

fn config_element(root: Option<&BytesStart>, inner: &str) -> NetconfClientResult<String> {
    let mut attributes: Vec<Attribute> = Vec::new();
    if let Some(root) = root {
        for attr in root.attributes() {
            attributes.push(attr.map_err(quick_xml::Error::from)?);
        }
    }
    let mut start = BytesStart::new("config");
    if !attributes.iter().any(|a| a.key.as_ref() == b"xmlns") {
        start.push_attribute(("xmlns", NETCONF_URN));
    }
    for attr in attributes {
        start.push_attribute(attr);
    }

    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Start(start))?;
    writer.get_mut().extend_from_slice(inner.as_bytes());
    writer.write_event(Event::End(BytesEnd::new("config")))?;
    String::from_utf8(writer.into_inner())
        .map_err(|e| NetconfClientError::new(format!("invalid utf-8 in xml: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const REPLY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rpc-reply message-id="9" xmlns="urn:ietf:params:xml:ns:netconf:base:1.0"><data><native xmlns="http://cisco.com/ns/yang/Cisco-IOS-XE-native"><hostname>edge-1</hostname><banner><motd>a &amp; b</motd></banner><ip><domain/></ip></native></data></rpc-reply>"#;

    #[test]
    fn pretty_print_indents_and_is_stable() {
        let pretty = pretty_print("<a><b>x</b>\n   <c/></a>").unwrap();
        let lines: Vec<&str> = pretty.lines().collect();
        assert_eq!(lines[0], XML_DECLARATION);
        assert_eq!(lines[1], "<a>");
        assert!(lines.contains(&"  <b>x</b>"));
        assert!(lines.contains(&"  <c/>"));
        assert_eq!(lines.last(), Some(&"</a>"));

        assert_eq!(pretty_print(&pretty).unwrap(), pretty);
    }

    #[test]
    fn pretty_print_keeps_text_values_verbatim() {
        let doc = "<config><native><banner><motd>\n  Authorized only  \n</motd></banner>\
                   <description> uplink </description></native></config>";
        let pretty = pretty_print(doc).unwrap();
        assert!(pretty.contains("<motd>\n  Authorized only  \n</motd>"));
        assert!(pretty.contains("\n    <description> uplink </description>\n"));
        assert_eq!(pretty_print(&pretty).unwrap(), pretty);

        let payload = to_config_payload(&pretty).unwrap();
        assert!(payload.contains("<description> uplink </description>"));
        assert!(payload.contains("<motd>\n  Authorized only  \n</motd>"));
    }

    #[test]
    fn extracts_data_from_reply() {
        let data = extract_element(REPLY, "data").unwrap();
        assert!(data.starts_with("<data><native"));
        assert!(data.ends_with("</native></data>"));

        assert!(matches!(
            extract_element(REPLY, "config"),
            Err(NetconfClientError::MissingElement(name)) if name == "config"
        ));
    }

    #[test]
    fn config_from_reply_keeps_entities() {
        let config = config_from_reply(REPLY).unwrap();
        assert!(config.starts_with(XML_DECLARATION));
        assert!(config.contains(
            r#"<config xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">"#
        ));
        assert!(config.contains("<hostname>edge-1</hostname>"));
        assert!(config.contains("<motd>a &amp; b</motd>"));
        assert!(config.trim_end().ends_with("</config>"));
    }

    #[test]
    fn payload_renames_or_wraps_root() {
        let renamed = to_config_payload(
            r#"<?xml version="1.0"?><data xmlns="urn:ietf:params:xml:ns:netconf:base:1.0"><x/></data>"#,
        )
        .unwrap();
        assert_eq!(
            renamed,
            r#"<config xmlns="urn:ietf:params:xml:ns:netconf:base:1.0"><x/></config>"#
        );

        let wrapped = to_config_payload("\n<native><hostname>r1</hostname></native>\n").unwrap();
        assert_eq!(
            wrapped,
            r#"<config xmlns="urn:ietf:params:xml:ns:netconf:base:1.0"><native><hostname>r1</hostname></native></config>"#
        );

        let empty = to_config_payload("<config/>").unwrap();
        assert_eq!(
            empty,
            r#"<config xmlns="urn:ietf:params:xml:ns:netconf:base:1.0"></config>"#
        );

        assert!(to_config_payload("   ").is_err());
    }
}
