// Response normalization: flattens the nested, attribute-bearing wire tree
// into a plain structure business code can consume.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::ProtocolError;

/// A normalized response node.
///
/// All namespace prefixes and attribute markers are already stripped by the
/// time a tree of these reaches the caller. Mappings keep document order;
/// repeated same-named siblings are coalesced into a `Sequence`.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedValue {
    Scalar(String),
    Sequence(Vec<NormalizedValue>),
    Mapping(Vec<(String, NormalizedValue)>),
}

impl NormalizedValue {
    /// Look up a child by key. Fails closed with a typed error instead of
    /// silently returning an empty value.
    pub fn get(&self, key: &str) -> Result<&NormalizedValue, ProtocolError> {
        self.opt(key)
            .ok_or_else(|| ProtocolError::MissingField(key.to_string()))
    }

    pub fn opt(&self, key: &str) -> Option<&NormalizedValue> {
        match self {
            NormalizedValue::Mapping(entries) => {
                entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
            }
            _ => None,
        }
    }

    /// First child whose key contains `fragment`. The response and result
    /// wrappers are located this way because their exact names derive from
    /// the operation (`<X>Response`, `<X>Result`).
    pub fn find_containing(&self, fragment: &str) -> Option<(&str, &NormalizedValue)> {
        match self {
            NormalizedValue::Mapping(entries) => entries
                .iter()
                .find(|(k, _)| k.contains(fragment))
                .map(|(k, v)| (k.as_str(), v)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Result<&str, ProtocolError> {
        match self {
            NormalizedValue::Scalar(s) => Ok(s),
            other => Err(ProtocolError::Xml(format!(
                "expected scalar value, found {}",
                other.kind()
            ))),
        }
    }

    pub fn entries(&self) -> Result<&[(String, NormalizedValue)], ProtocolError> {
        match self {
            NormalizedValue::Mapping(entries) => Ok(entries),
            other => Err(ProtocolError::Xml(format!(
                "expected mapping, found {}",
                other.kind()
            ))),
        }
    }

    /// Sequence items, treating a lone node as a one-element sequence. The
    /// wire format drops the distinction between "one record" and "a list of
    /// one record", so consumers iterate through this.
    pub fn items(&self) -> Vec<&NormalizedValue> {
        match self {
            NormalizedValue::Sequence(items) => items.iter().collect(),
            other => vec![other],
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            NormalizedValue::Scalar(_) => "scalar",
            NormalizedValue::Sequence(_) => "sequence",
            NormalizedValue::Mapping(_) => "mapping",
        }
    }
}

struct Frame {
    name: String,
    children: Vec<(String, NormalizedValue)>,
    text: String,
}

/// Parse a raw XML document into a normalized tree.
///
/// The root mapping holds the document's top-level elements, so a SOAP
/// response comes back as `{ Envelope: { Body: ... } }` with all `soap:`,
/// `diffgr:` and similar prefixes removed.
pub fn parse_response(xml: &str) -> Result<NormalizedValue, ProtocolError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Frame> = vec![Frame {
        name: String::new(),
        children: Vec::new(),
        text: String::new(),
    }];

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                stack.push(Frame {
                    name: local_name(e.name().as_ref()),
                    children: attribute_entries(&e)?,
                    text: String::new(),
                });
            }
            Ok(Event::Empty(e)) => {
                let name = local_name(e.name().as_ref());
                let value = finish_node(attribute_entries(&e)?, String::new());
                let parent = stack.last_mut().expect("root frame always present");
                insert_child(&mut parent.children, name, value);
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| ProtocolError::Xml(e.to_string()))?;
                stack
                    .last_mut()
                    .expect("root frame always present")
                    .text
                    .push_str(&text);
            }
            Ok(Event::CData(t)) => {
                stack
                    .last_mut()
                    .expect("root frame always present")
                    .text
                    .push_str(&String::from_utf8_lossy(&t.into_inner()));
            }
            Ok(Event::End(_)) => {
                let frame = stack.pop().expect("end event always has a frame");
                let value = finish_node(frame.children, frame.text);
                let parent = stack.last_mut().ok_or_else(|| {
                    ProtocolError::Xml("unbalanced closing tag".to_string())
                })?;
                insert_child(&mut parent.children, frame.name, value);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ProtocolError::Xml(format!(
                    "parse error at position {}: {e}",
                    reader.error_position()
                )))
            }
        }
    }

    let root = stack.pop().expect("root frame always present");
    if !stack.is_empty() {
        return Err(ProtocolError::Xml("unclosed element".to_string()));
    }
    Ok(NormalizedValue::Mapping(root.children))
}

/// Unwrap the business payload for `operation` out of a parsed SOAP tree.
///
/// Fault detection comes first; then the `<X>Response` element, then the
/// `<X>Result` container inside it. When either wrapper is absent the
/// enclosing subtree is returned as-is so no data is silently dropped.
pub fn unwrap_payload(
    root: NormalizedValue,
    operation: &str,
) -> Result<NormalizedValue, ProtocolError> {
    let body = root.get("Envelope")?.get("Body")?.clone();

    if let Some(fault) = body.opt("Fault") {
        return Err(ProtocolError::Fault(fault_message(fault)));
    }

    let response = match body.find_containing("Response") {
        Some((_, response)) => response.clone(),
        None => {
            tracing::warn!(operation, "no response element found, returning body content");
            return Ok(body);
        }
    };

    match response.find_containing("Result") {
        Some((_, result)) => Ok(result.clone()),
        None => Ok(response),
    }
}

fn fault_message(fault: &NormalizedValue) -> String {
    if let Some(NormalizedValue::Scalar(s)) = fault.opt("faultstring") {
        return s.clone();
    }
    if let Some(text) = fault.opt("Reason").and_then(|r| r.opt("Text")) {
        if let NormalizedValue::Scalar(s) = text {
            return s.clone();
        }
    }
    "unknown fault".to_string()
}

fn finish_node(children: Vec<(String, NormalizedValue)>, text: String) -> NormalizedValue {
    if children.is_empty() {
        // Leaf element: collapse to its text content.
        NormalizedValue::Scalar(text)
    } else {
        // Bare text next to structural children is presentation noise
        // (whitespace, diffgram metadata) and is dropped.
        NormalizedValue::Mapping(children)
    }
}

fn insert_child(
    children: &mut Vec<(String, NormalizedValue)>,
    name: String,
    value: NormalizedValue,
) {
    if let Some((_, existing)) = children.iter_mut().find(|(k, _)| *k == name) {
        match existing {
            NormalizedValue::Sequence(items) => items.push(value),
            _ => {
                let prev = std::mem::replace(existing, NormalizedValue::Sequence(Vec::new()));
                if let NormalizedValue::Sequence(items) = existing {
                    items.push(prev);
                    items.push(value);
                }
            }
        }
    } else {
        children.push((name, value));
    }
}

fn attribute_entries(e: &BytesStart<'_>) -> Result<Vec<(String, NormalizedValue)>, ProtocolError> {
    let mut entries = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| ProtocolError::Xml(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        // Namespace declarations and xsi/msdata markers carry no data.
        if key == "xmlns" || key.contains(':') {
            continue;
        }
        let value = attr
            .unescape_value()
            .map_err(|e| ProtocolError::Xml(e.to_string()))?
            .to_string();
        entries.push((key, NormalizedValue::Scalar(value)));
    }
    Ok(entries)
}

fn local_name(raw: &[u8]) -> String {
    let name = String::from_utf8_lossy(raw);
    name.rsplit(':').next().unwrap_or(&name).to_string()
}
