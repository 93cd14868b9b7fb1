// Request envelope construction for the supplier wire protocol

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::writer::Writer;

use crate::error::ProtocolError;

const SOAP_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";

/// A single parameter value in the request tree.
///
/// `Many` renders repeated same-named elements (e.g. `<int>` lists), which
/// several remote list types require.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Scalar(String),
    Node(Params),
    Many(Vec<ParamValue>),
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Scalar(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Scalar(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Scalar(value.to_string())
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Scalar(value.to_string())
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Scalar(value.to_string())
    }
}

impl From<Params> for ParamValue {
    fn from(value: Params) -> Self {
        ParamValue::Node(value)
    }
}

/// Ordered parameter tree. The remote schemas are sequence-typed, so the
/// order parameters are pushed in is the order they go out on the wire;
/// reordering silently breaks calls without any server-side error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Vec<(String, ParamValue)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter, preserving insertion order.
    pub fn push(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.0.push((name.into(), value.into()));
        self
    }

    /// Insert a parameter before all existing ones. Used for the session
    /// token, which the remote schemas expect as the first element.
    pub fn prepend(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.0.insert(0, (name.into(), value.into()));
        self
    }

    /// Wrap a list of integers as repeated `<int>` elements.
    pub fn int_list(values: &[i32]) -> ParamValue {
        ParamValue::Node(Params(vec![(
            "int".to_string(),
            ParamValue::Many(values.iter().map(|v| ParamValue::from(*v)).collect()),
        )]))
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, ParamValue)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// An immutable request unit: one remote operation plus its parameter tree.
/// Constructed per call and discarded after dispatch.
#[derive(Debug, Clone)]
pub struct Envelope {
    operation: String,
    namespace: String,
    params: Params,
}

impl Envelope {
    pub fn new(operation: impl Into<String>, namespace: impl Into<String>, params: Params) -> Self {
        Self {
            operation: operation.into(),
            namespace: namespace.into(),
            params,
        }
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// The quoted `SOAPAction` header value for this operation.
    pub fn soap_action(&self) -> String {
        if self.operation.starts_with("http") {
            format!("\"{}\"", self.operation)
        } else {
            format!("\"{}{}\"", self.namespace, self.operation)
        }
    }

    /// Render the full SOAP 1.1 document.
    pub fn to_xml(&self) -> Result<String, ProtocolError> {
        let mut writer = Writer::new(Vec::new());

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(|e| ProtocolError::Xml(e.to_string()))?;

        let mut envelope = BytesStart::new("soap:Envelope");
        envelope.push_attribute(("xmlns:soap", SOAP_NS));
        envelope.push_attribute(("xmlns:xsi", XSI_NS));
        envelope.push_attribute(("xmlns:xsd", XSD_NS));
        writer
            .write_event(Event::Start(envelope))
            .map_err(|e| ProtocolError::Xml(e.to_string()))?;
        writer
            .write_event(Event::Start(BytesStart::new("soap:Body")))
            .map_err(|e| ProtocolError::Xml(e.to_string()))?;

        let mut body = BytesStart::new(self.operation.as_str());
        body.push_attribute(("xmlns", self.namespace.as_str()));
        writer
            .write_event(Event::Start(body))
            .map_err(|e| ProtocolError::Xml(e.to_string()))?;

        write_params(&mut writer, &self.params)?;

        writer
            .write_event(Event::End(BytesEnd::new(self.operation.as_str())))
            .map_err(|e| ProtocolError::Xml(e.to_string()))?;
        writer
            .write_event(Event::End(BytesEnd::new("soap:Body")))
            .map_err(|e| ProtocolError::Xml(e.to_string()))?;
        writer
            .write_event(Event::End(BytesEnd::new("soap:Envelope")))
            .map_err(|e| ProtocolError::Xml(e.to_string()))?;

        String::from_utf8(writer.into_inner()).map_err(|e| ProtocolError::Xml(e.to_string()))
    }
}

fn write_params(writer: &mut Writer<Vec<u8>>, params: &Params) -> Result<(), ProtocolError> {
    for (name, value) in params.iter() {
        write_value(writer, name, value)?;
    }
    Ok(())
}

fn write_value(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    value: &ParamValue,
) -> Result<(), ProtocolError> {
    match value {
        ParamValue::Scalar(text) => {
            writer
                .write_event(Event::Start(BytesStart::new(name)))
                .map_err(|e| ProtocolError::Xml(e.to_string()))?;
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(|e| ProtocolError::Xml(e.to_string()))?;
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(|e| ProtocolError::Xml(e.to_string()))?;
        }
        ParamValue::Node(children) => {
            writer
                .write_event(Event::Start(BytesStart::new(name)))
                .map_err(|e| ProtocolError::Xml(e.to_string()))?;
            write_params(writer, children)?;
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(|e| ProtocolError::Xml(e.to_string()))?;
        }
        ParamValue::Many(values) => {
            for value in values {
                write_value(writer, name, value)?;
            }
        }
    }
    Ok(())
}
