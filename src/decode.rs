pub mod json;
pub mod xml;

pub use json::{JsonDocument, JsonSeq};
pub use xml::{TextPosition, XmlAttribute, XmlDeclaration, XmlDocument, XmlElement, XmlNode};
