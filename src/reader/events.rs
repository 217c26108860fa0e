//! XML Event Types
//!
//! Owned event types for pull-parser style XML processing: the five payload
//! kinds and the `XmlEvent` tagged union over them. Exactly one payload per
//! event is structural, one enum variant per kind.

/// Qualified name: prefix and local part, plus a namespace URI slot.
///
/// The namespace URI is always empty in this crate; the slot is reserved for
/// a namespace-resolving layer on top of the reader. Equality is
/// component-wise over all three fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QName {
    namespace_uri: String,
    local_part: String,
    prefix: String,
}

impl QName {
    /// Create a qualified name.
    pub fn new(
        namespace_uri: impl Into<String>,
        local_part: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        QName {
            namespace_uri: namespace_uri.into(),
            local_part: local_part.into(),
            prefix: prefix.into(),
        }
    }

    /// The namespace URI (currently always empty).
    pub fn namespace_uri(&self) -> &str {
        &self.namespace_uri
    }

    /// The local part of the name (after the `:`, or the whole name).
    pub fn local_part(&self) -> &str {
        &self.local_part
    }

    /// The prefix (before the `:`), empty if the name has none.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

/// A parsed attribute: qualified name plus replacement-resolved value.
///
/// Attributes are compared by name only, through `same_name_as`; structural
/// equality over name and value is deliberately not provided.
#[derive(Debug, Clone)]
pub struct Attribute {
    name: QName,
    value: String,
}

impl Attribute {
    /// Create an attribute.
    pub fn new(name: QName, value: impl Into<String>) -> Self {
        Attribute {
            name,
            value: value.into(),
        }
    }

    /// The attribute name.
    pub fn name(&self) -> &QName {
        &self.name
    }

    /// The attribute value, with entities resolved.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// True if this attribute carries the given name. The value does not
    /// participate.
    pub fn same_name_as(&self, name: &QName) -> bool {
        self.name == *name
    }
}

/// Start tag event data: name plus attributes in the order they were parsed.
///
/// On a forward parse the order is document order; on a reverse parse the
/// last attribute of the source tag comes first.
#[derive(Debug, Clone)]
pub struct StartElement {
    name: QName,
    attributes: Vec<Attribute>,
}

impl StartElement {
    /// Create a start element.
    pub fn new(name: QName, attributes: Vec<Attribute>) -> Self {
        StartElement { name, attributes }
    }

    /// The element name.
    pub fn name(&self) -> &QName {
        &self.name
    }

    /// The attributes in parse order.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// The first attribute carrying the given name, if any.
    pub fn attribute_by_name(&self, name: &QName) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.same_name_as(name))
    }
}

/// End tag event data.
#[derive(Debug, Clone)]
pub struct EndElement {
    name: QName,
}

impl EndElement {
    /// Create an end element.
    pub fn new(name: QName) -> Self {
        EndElement { name }
    }

    /// The element name.
    pub fn name(&self) -> &QName {
        &self.name
    }
}

/// Character data between tags, with entities resolved.
#[derive(Debug, Clone)]
pub struct Characters {
    data: String,
    is_whitespace: bool,
}

impl Characters {
    /// Create a characters event; the whitespace flag is computed from the
    /// data (an empty string counts as whitespace).
    pub fn new(data: impl Into<String>) -> Self {
        let data = data.into();
        let is_whitespace = data.bytes().all(is_space);
        Characters {
            data,
            is_whitespace,
        }
    }

    /// The text content.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// True if every byte of the content is whitespace.
    pub fn is_whitespace(&self) -> bool {
        self.is_whitespace
    }
}

/// Comment contents, without the `<!--` / `-->` delimiters.
#[derive(Debug, Clone)]
pub struct Comment {
    text: String,
}

impl Comment {
    /// Create a comment event.
    pub fn new(text: impl Into<String>) -> Self {
        Comment { text: text.into() }
    }

    /// The comment body.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Processing instruction: target name plus data.
#[derive(Debug, Clone)]
pub struct ProcessingInstruction {
    target: String,
    data: String,
}

impl ProcessingInstruction {
    /// Create a processing instruction event.
    pub fn new(target: impl Into<String>, data: impl Into<String>) -> Self {
        ProcessingInstruction {
            target: target.into(),
            data: data.into(),
        }
    }

    /// The target name (the word after `<?`).
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The instruction data following the target.
    pub fn data(&self) -> &str {
        &self.data
    }
}

/// XML parsing event.
#[derive(Debug, Clone)]
pub enum XmlEvent {
    /// Start of an element: `<name attrs...>`. A self-closing tag emits this
    /// followed by the matching `EndElement`.
    StartElement(StartElement),
    /// End of an element: `</name>`.
    EndElement(EndElement),
    /// Character data between tags.
    Characters(Characters),
    /// Comment: `<!--...-->`.
    Comment(Comment),
    /// Processing instruction: `<?target data?>`.
    ProcessingInstruction(ProcessingInstruction),
}

impl XmlEvent {
    /// Check if this is a start element event.
    pub fn is_start_element(&self) -> bool {
        matches!(self, XmlEvent::StartElement(_))
    }

    /// Check if this is an end element event.
    pub fn is_end_element(&self) -> bool {
        matches!(self, XmlEvent::EndElement(_))
    }

    /// Check if this is a characters event.
    pub fn is_characters(&self) -> bool {
        matches!(self, XmlEvent::Characters(_))
    }

    /// Check if this is a comment event.
    pub fn is_comment(&self) -> bool {
        matches!(self, XmlEvent::Comment(_))
    }

    /// Check if this is a processing instruction event.
    pub fn is_processing_instruction(&self) -> bool {
        matches!(self, XmlEvent::ProcessingInstruction(_))
    }

    /// Get as start element if applicable.
    pub fn as_start_element(&self) -> Option<&StartElement> {
        match self {
            XmlEvent::StartElement(e) => Some(e),
            _ => None,
        }
    }

    /// Get as end element if applicable.
    pub fn as_end_element(&self) -> Option<&EndElement> {
        match self {
            XmlEvent::EndElement(e) => Some(e),
            _ => None,
        }
    }

    /// Get as characters if applicable.
    pub fn as_characters(&self) -> Option<&Characters> {
        match self {
            XmlEvent::Characters(c) => Some(c),
            _ => None,
        }
    }

    /// Get as comment if applicable.
    pub fn as_comment(&self) -> Option<&Comment> {
        match self {
            XmlEvent::Comment(c) => Some(c),
            _ => None,
        }
    }

    /// Get as processing instruction if applicable.
    pub fn as_processing_instruction(&self) -> Option<&ProcessingInstruction> {
        match self {
            XmlEvent::ProcessingInstruction(p) => Some(p),
            _ => None,
        }
    }
}

/// Check if byte is whitespace.
#[inline]
fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}
