//! XML decoding of response bodies.
//!
//! The body is parsed with `quick_xml` into an owned tree ([`XmlDocument`]).
//! Every element remembers the line and column where its start tag began, and
//! syntax errors report the position where the reader gave up, so a failing
//! document can be located in the mirrored text of the resulting
//! [`Error::Parse`](crate::Error::Parse).
use std::fmt;
use std::io;

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

use crate::config::{self, DecodeOptions, XmlOptions};
use crate::content::{ContentReader, MirrorReader};
use crate::errors::{BoxError, Cancelled, Result};
use crate::net::Response;

/// 1-based line and column (in characters) of a spot in the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextPosition {
    pub line: usize,
    pub column: usize,
}

impl TextPosition {
    fn at(input: &[u8], offset: usize) -> Self {
        let head = &input[..offset.min(input.len())];
        let line_start = head.iter().rposition(|&b| b == b'\n').map_or(0, |p| p + 1);
        Self {
            line: head.iter().filter(|&&b| b == b'\n').count() + 1,
            column: String::from_utf8_lossy(&head[line_start..]).chars().count() + 1,
        }
    }
}

impl fmt::Display for TextPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDeclaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
    DocType(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<XmlAttribute>,
    pub children: Vec<XmlNode>,
    pub position: TextPosition,
}

impl XmlElement {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Child elements, skipping text and other nodes.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|n| match n {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |e| e.name == name)
    }

    /// First child element called `name`.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.name == name)
    }

    /// Concatenated text and CDATA content of this element and its descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }
}

fn collect_text(element: &XmlElement, out: &mut String) {
    for node in &element.children {
        match node {
            XmlNode::Text(t) | XmlNode::CData(t) => out.push_str(t),
            XmlNode::Element(e) => collect_text(e, out),
            _ => {}
        }
    }
}

/// Parsed XML body: an optional declaration followed by top-level nodes, exactly one of which
/// is the root element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    pub declaration: Option<XmlDeclaration>,
    pub children: Vec<XmlNode>,
}

impl XmlDocument {
    pub fn root(&self) -> Option<&XmlElement> {
        self.children.iter().find_map(|n| match n {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Serializes the document without added indentation.
    pub fn to_xml_string(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());

        if let Some(decl) = &self.declaration {
            let event = Event::Decl(BytesDecl::new(
                &decl.version,
                decl.encoding.as_deref(),
                decl.standalone.as_deref(),
            ));
            write(&mut writer, event)?;
        }
        for node in &self.children {
            write_node(&mut writer, node)?;
        }

        Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
    }
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> io::Result<()> {
    writer
        .write_event(event)
        .map_err(|e| io::Error::other(e.to_string()))
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &XmlNode) -> io::Result<()> {
    match node {
        XmlNode::Element(element) => {
            let mut start = BytesStart::new(element.name.as_str());
            for attr in &element.attributes {
                start.push_attribute((attr.name.as_str(), attr.value.as_str()));
            }
            if element.children.is_empty() {
                return write(writer, Event::Empty(start));
            }
            write(writer, Event::Start(start))?;
            for child in &element.children {
                write_node(writer, child)?;
            }
            write(writer, Event::End(BytesEnd::new(element.name.as_str())))
        }
        XmlNode::Text(text) => write(writer, Event::Text(BytesText::new(text))),
        XmlNode::CData(text) => write(writer, Event::CData(BytesCData::new(text.as_str()))),
        XmlNode::Comment(text) => write(writer, Event::Comment(BytesText::from_escaped(text.as_str()))),
        XmlNode::ProcessingInstruction(text) => write(writer, Event::PI(BytesPI::new(text.as_str()))),
        XmlNode::DocType(text) => write(writer, Event::DocType(BytesText::from_escaped(text.as_str()))),
    }
}

/// XML syntax error located in the source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlSyntaxError {
    pub message: String,
    pub position: TextPosition,
}

impl fmt::Display for XmlSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.position)
    }
}
impl std::error::Error for XmlSyntaxError {}

impl Response {
    pub async fn xml(self) -> Result<XmlDocument> {
        self.xml_with(config::defaults(), &CancellationToken::new()).await
    }

    pub async fn xml_with(self, options: &DecodeOptions, cancel: &CancellationToken) -> Result<XmlDocument> {
        let xml_options = options.xml.clone();
        self.parse("XML", options.mirror_limit, cancel, move |reader, cancel| {
            read_xml(reader, cancel, xml_options)
        })
        .await
    }
}

async fn read_xml(
    mut reader: MirrorReader<ContentReader>,
    cancel: CancellationToken,
    options: XmlOptions,
) -> std::result::Result<XmlDocument, BoxError> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    parse_document(&buf, &options, &cancel)
}

fn parse_document(
    input: &[u8],
    options: &XmlOptions,
    cancel: &CancellationToken,
) -> std::result::Result<XmlDocument, BoxError> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(options.trim_text);
    reader.config_mut().check_end_names = options.check_end_names;

    let syntax = |message: String, offset: u64| -> BoxError {
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        Box::new(XmlSyntaxError {
            message,
            position: TextPosition::at(input, offset),
        })
    };

    let mut doc = XmlDocument { declaration: None, children: Vec::new() };
    let mut open: Vec<XmlElement> = Vec::new();
    let mut buf = Vec::new();

    loop {
        if cancel.is_cancelled() {
            return Err(Box::new(Cancelled));
        }

        let offset = usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX);
        let event = match reader.read_event_into(&mut buf) {
            Ok(event) => event,
            Err(e) => return Err(syntax(e.to_string(), reader.error_position() as u64)),
        };

        let node = match event {
            Event::Eof => break,
            Event::Decl(decl) => {
                doc.declaration = Some(XmlDeclaration {
                    version: String::from_utf8_lossy(&decl.version()?).into_owned(),
                    encoding: decl.encoding().transpose()?.map(|e| String::from_utf8_lossy(&e).into_owned()),
                    standalone: decl.standalone().transpose()?.map(|s| String::from_utf8_lossy(&s).into_owned()),
                });
                None
            }
            Event::Start(start) => {
                open.push(element(&start, TextPosition::at(input, offset))?);
                None
            }
            Event::Empty(start) => Some(XmlNode::Element(element(&start, TextPosition::at(input, offset))?)),
            Event::End(_) => match open.pop() {
                Some(done) => Some(XmlNode::Element(done)),
                None => return Err(syntax("unexpected end tag".to_string(), offset as u64)),
            },
            Event::Text(text) => Some(XmlNode::Text(text.unescape()?.into_owned())),
            Event::CData(cdata) => Some(XmlNode::CData(String::from_utf8_lossy(&cdata).into_owned())),
            Event::Comment(comment) => Some(XmlNode::Comment(String::from_utf8_lossy(&comment).into_owned())),
            Event::PI(pi) => Some(XmlNode::ProcessingInstruction(String::from_utf8_lossy(&pi).into_owned())),
            Event::DocType(doctype) => Some(XmlNode::DocType(String::from_utf8_lossy(&doctype).into_owned())),
        };

        if let Some(node) = node {
            match open.last_mut() {
                Some(parent) => parent.children.push(node),
                None => place_top_level(&mut doc, node).map_err(|m| syntax(m, offset as u64))?,
            }
        }
        buf.clear();
    }

    if let Some(unclosed) = open.last() {
        return Err(syntax(format!("unclosed element <{}>", unclosed.name), input.len() as u64));
    }
    if doc.root().is_none() {
        return Err(syntax("document has no root element".to_string(), input.len() as u64));
    }
    Ok(doc)
}

fn place_top_level(doc: &mut XmlDocument, node: XmlNode) -> std::result::Result<(), String> {
    match &node {
        XmlNode::Element(e) if doc.root().is_some() => {
            return Err(format!("second root element <{}>", e.name));
        }
        XmlNode::Text(t) if t.trim().is_empty() => return Ok(()),
        XmlNode::Text(_) | XmlNode::CData(_) => {
            return Err("text outside the root element".to_string());
        }
        _ => {}
    }
    doc.children.push(node);
    Ok(())
}

fn element(start: &BytesStart<'_>, position: TextPosition) -> std::result::Result<XmlElement, BoxError> {
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        attributes.push(XmlAttribute {
            name: String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            value: attr.unescape_value()?.into_owned(),
        });
    }

    Ok(XmlElement {
        name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
        attributes,
        children: Vec::new(),
        position,
    })
}
