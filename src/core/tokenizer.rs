//! XML Tokenizer - Bidirectional state machine for XML event extraction
//!
//! Implements pull-parser style tokenizers over a seekable byte stream:
//! - Forward: lexes the construct at the cursor in document order
//! - Reverse: lexes the construct ending just before the cursor, reading
//!   the stream byte-by-byte backwards
//!
//! Both directions emit the same event kinds with identical payload
//! semantics. The reverse machine mirrors every structural predicate: the
//! end of a construct is its beginning, names and text accumulate reversed
//! and are flipped once at emission, and entity resolution is keyed on the
//! pre-reversed dictionary (`;name&` scanned right-to-left).

use std::collections::VecDeque;
use std::io::{Read, Seek};

use crate::core::cursor::StreamCursor;
use crate::core::entities::EntityDictionary;
use crate::error::{Error, Result};
use crate::reader::events::{
    Attribute, Characters, Comment, EndElement, ProcessingInstruction, QName, StartElement,
    XmlEvent,
};

/// Forward comment terminator, matched byte-by-byte.
const COMMENT_END: [u8; 3] = [b'-', b'-', b'>'];

/// Reverse comment terminator: `<!--` as encountered right-to-left, starting
/// just past the two dashes consumed by tag dispatch.
const COMMENT_END_REV: [u8; 4] = [b'-', b'-', b'!', b'<'];

/// Bidirectional XML tokenizer.
///
/// Owns the stream cursor, the entity dictionaries, and the queue of events
/// produced but not yet consumed. Each `advance_*` call lexes exactly one
/// construct and enqueues its event(s); a self-closing tag is the one
/// construct that enqueues two.
pub struct Tokenizer<S> {
    cursor: StreamCursor<S>,
    entities: EntityDictionary,
    events: VecDeque<XmlEvent>,
}

impl<S: Read + Seek> Tokenizer<S> {
    /// Create a tokenizer reading from the stream's current position.
    pub fn new(stream: S) -> Self {
        Tokenizer {
            cursor: StreamCursor::new(stream),
            entities: EntityDictionary::new(),
            events: VecDeque::new(),
        }
    }

    /// Consume the tokenizer and return the wrapped stream.
    pub fn into_inner(self) -> S {
        self.cursor.into_inner()
    }

    /// The entity dictionaries, for registration.
    pub fn entities_mut(&mut self) -> &mut EntityDictionary {
        &mut self.entities
    }

    /// True if produced events are waiting to be consumed.
    pub fn has_pending(&self) -> bool {
        !self.events.is_empty()
    }

    /// Remove and return the oldest pending event.
    pub fn pop_event(&mut self) -> Option<XmlEvent> {
        self.events.pop_front()
    }

    /// Drop all pending events. Used when the reader switches direction:
    /// events produced under the old direction cannot be repurposed.
    pub fn clear_pending(&mut self) {
        self.events.clear();
    }

    // ------------------------------------------------------------------
    // Forward direction
    // ------------------------------------------------------------------

    /// Lex the next construct in document order and enqueue its event(s).
    ///
    /// Returns false on clean end-of-stream. An `xml` declaration produces
    /// no event; the tokenizer keeps lexing past it.
    pub fn advance_forward(&mut self) -> Result<bool> {
        loop {
            let byte = match self.cursor.read()? {
                Some(b) => b,
                None => return Ok(false),
            };

            if byte == b'<' {
                if self.forward_tag()? {
                    return Ok(true);
                }
                // XML declaration discarded; lex the following construct.
            } else {
                self.forward_text(byte)?;
                return Ok(true);
            }
        }
    }

    /// Dispatch on the byte following `<`. Returns false when the construct
    /// was an `xml` declaration and nothing was enqueued.
    fn forward_tag(&mut self) -> Result<bool> {
        let byte = self.next_byte("tag")?;

        match byte {
            b'?' => self.forward_processing_instruction(),
            b'/' => {
                self.forward_end_tag()?;
                Ok(true)
            }
            b'!' => {
                self.forward_markup_declaration()?;
                Ok(true)
            }
            b if b.is_ascii_alphabetic() || b == b'_' => {
                self.forward_start_tag(b)?;
                Ok(true)
            }
            b => Err(unexpected(b, "tag opening")),
        }
    }

    fn forward_start_tag(&mut self, first: u8) -> Result<()> {
        let mut prefix: Option<Vec<u8>> = None;
        let mut local = vec![first];
        let mut attributes = Vec::new();

        loop {
            let byte = self.next_byte("start tag")?;

            match byte {
                b':' => {
                    if prefix.is_some() {
                        return Err(Error::MalformedInput(
                            "second ':' in element name".to_string(),
                        ));
                    }
                    prefix = Some(std::mem::take(&mut local));
                }
                b'>' => {
                    let name = build_qname(prefix, local)?;
                    self.events
                        .push_back(XmlEvent::StartElement(StartElement::new(name, attributes)));
                    return Ok(());
                }
                b'/' => {
                    let byte = self.next_byte("start tag")?;
                    if byte != b'>' {
                        return Err(Error::MalformedInput(
                            "self-closing tag without closing '>'".to_string(),
                        ));
                    }

                    // One tag, two events: the start and its matching end.
                    let name = build_qname(prefix, local)?;
                    self.events.push_back(XmlEvent::StartElement(StartElement::new(
                        name.clone(),
                        attributes,
                    )));
                    self.events
                        .push_back(XmlEvent::EndElement(EndElement::new(name)));
                    return Ok(());
                }
                b if is_space(b) => {
                    // The attribute loop ungets the terminating '>' or '/'
                    // so the next iteration here emits the element.
                    self.forward_attributes(&mut attributes)?;
                }
                b if is_name_byte(b) => local.push(b),
                b => return Err(unexpected(b, "start tag name")),
            }
        }
    }

    fn forward_end_tag(&mut self) -> Result<()> {
        let mut prefix: Option<Vec<u8>> = None;
        let mut local = Vec::new();

        // No start-character validation here: end tags are matched against
        // already-validated start tags by any well-formedness layer above.
        loop {
            let byte = self.next_byte("end tag")?;

            match byte {
                b':' => {
                    if prefix.is_some() {
                        return Err(Error::MalformedInput(
                            "second ':' in element name".to_string(),
                        ));
                    }
                    prefix = Some(std::mem::take(&mut local));
                }
                b'>' => {
                    let name = build_qname(prefix, local)?;
                    self.events
                        .push_back(XmlEvent::EndElement(EndElement::new(name)));
                    return Ok(());
                }
                b if is_name_byte(b) => local.push(b),
                b => return Err(unexpected(b, "end tag name")),
            }
        }
    }

    fn forward_text(&mut self, first: u8) -> Result<()> {
        let mut data = Vec::new();

        if first == b'&' {
            let replacement = self.resolve_entity()?;
            data.extend_from_slice(replacement.as_bytes());
        } else {
            data.push(first);
        }

        loop {
            match self.cursor.read()? {
                None => break,
                Some(b'<') => {
                    self.cursor.unread()?;
                    break;
                }
                Some(b'&') => {
                    let replacement = self.resolve_entity()?;
                    data.extend_from_slice(replacement.as_bytes());
                }
                Some(b) => data.push(b),
            }
        }

        let text = into_text(data, "character data")?;
        self.events
            .push_back(XmlEvent::Characters(Characters::new(text)));
        Ok(())
    }

    /// Returns false when the instruction was the XML declaration, which is
    /// consumed and not emitted.
    fn forward_processing_instruction(&mut self) -> Result<bool> {
        let target = self.forward_pi_target()?;

        if target.eq_ignore_ascii_case("xml") {
            // XML declaration: consume through the terminating '>'.
            loop {
                let byte = self.next_byte("XML declaration")?;
                if byte == b'>' {
                    return Ok(false);
                }
            }
        }

        let mut data = Vec::new();
        let mut pending_question = false;

        loop {
            let byte = self.next_byte("processing instruction")?;

            if byte == b'?' && !pending_question {
                pending_question = true;
            } else if byte == b'>' {
                let data = into_text(data, "processing instruction data")?;
                self.events.push_back(XmlEvent::ProcessingInstruction(
                    ProcessingInstruction::new(target, data),
                ));
                return Ok(true);
            } else {
                if pending_question {
                    data.push(b'?');
                }
                pending_question = false;
                data.push(byte);
            }
        }
    }

    /// Read the PI target name, terminated by whitespace. A `?>` arriving
    /// first means no target was captured, which is an error.
    fn forward_pi_target(&mut self) -> Result<String> {
        let mut name: Option<Vec<u8>> = None;
        let mut pending_question = false;

        loop {
            let byte = self.next_byte("processing instruction target")?;

            if byte == b'?' && !pending_question {
                pending_question = true;
            } else if byte == b'>' {
                return Err(Error::MalformedInput(
                    "processing instruction ended before a target name was read".to_string(),
                ));
            } else if is_space(byte) {
                return match name {
                    Some(bytes) => into_text(bytes, "processing instruction target"),
                    None => Err(Error::MalformedInput(
                        "processing instruction without target name".to_string(),
                    )),
                };
            } else {
                if pending_question {
                    return Err(Error::MalformedInput(
                        "processing instruction target interrupted by '?'".to_string(),
                    ));
                }
                match &mut name {
                    Some(bytes) => bytes.push(byte),
                    None => {
                        if !byte.is_ascii_alphabetic() {
                            return Err(unexpected(byte, "processing instruction target start"));
                        }
                        name = Some(vec![byte]);
                    }
                }
            }
        }
    }

    fn forward_markup_declaration(&mut self) -> Result<()> {
        let byte = self.next_byte("markup declaration")?;

        if byte == b'-' {
            self.forward_comment()
        } else {
            Err(Error::MalformedInput(
                "markup declaration type not supported".to_string(),
            ))
        }
    }

    fn forward_comment(&mut self) -> Result<()> {
        let byte = self.next_byte("comment")?;
        if byte != b'-' {
            return Err(Error::MalformedInput(
                "comment must open with '<!--'".to_string(),
            ));
        }

        let mut data = Vec::new();
        let mut matched = 0;

        loop {
            let byte = self.next_byte("comment")?;

            if byte == COMMENT_END[matched] {
                matched += 1;
                if matched == COMMENT_END.len() {
                    let text = into_text(data, "comment")?;
                    self.events.push_back(XmlEvent::Comment(Comment::new(text)));
                    return Ok(());
                }
            } else {
                // Partial terminator match flushes verbatim into the body.
                if matched > 0 {
                    data.extend_from_slice(&COMMENT_END[..matched]);
                    matched = 0;
                }
                data.push(byte);
            }
        }
    }

    /// Attribute-parsing mode, entered on the first whitespace inside a start
    /// tag. Leaves the terminating '>' (or '/>') ungot for the tag loop.
    fn forward_attributes(&mut self, attributes: &mut Vec<Attribute>) -> Result<()> {
        loop {
            let byte = self.next_byte("start tag")?;

            if byte == b'>' {
                self.cursor.unread()?;
                return Ok(());
            } else if byte == b'/' {
                let byte = self.next_byte("start tag")?;
                if byte != b'>' {
                    return Err(Error::MalformedInput(
                        "self-closing tag without closing '>'".to_string(),
                    ));
                }
                self.cursor.unread()?;
                self.cursor.unread()?;
                return Ok(());
            } else if is_space(byte) {
                continue;
            } else {
                let name = self.forward_attribute_name(byte)?;
                let value = self.forward_attribute_value()?;
                attributes.push(Attribute::new(name, value));
            }
        }
    }

    fn forward_attribute_name(&mut self, first: u8) -> Result<QName> {
        if !first.is_ascii_alphanumeric() && first != b'_' {
            return Err(unexpected(first, "attribute name start"));
        }

        let mut prefix: Option<Vec<u8>> = None;
        let mut local = vec![first];

        loop {
            let byte = self.next_byte("attribute name")?;

            match byte {
                b':' => {
                    if prefix.is_some() {
                        return Err(Error::MalformedInput(
                            "second ':' in attribute name".to_string(),
                        ));
                    }
                    prefix = Some(std::mem::take(&mut local));
                }
                b'=' => return build_qname(prefix, local),
                b if is_space(b) => {
                    // Whitespace before '=' is allowed; anything else is not.
                    let byte = self.consume_whitespace()?.ok_or_else(|| {
                        Error::MalformedInput("unexpected end of input in attribute".to_string())
                    })?;
                    if byte != b'=' {
                        return Err(Error::MalformedInput(
                            "attribute name not followed by '='".to_string(),
                        ));
                    }
                    self.cursor.unread()?;
                }
                b if is_name_byte(b) => local.push(b),
                b => return Err(unexpected(b, "attribute name")),
            }
        }
    }

    fn forward_attribute_value(&mut self) -> Result<String> {
        let delimiter = self.consume_whitespace()?.ok_or_else(|| {
            Error::MalformedInput("attribute is missing its value".to_string())
        })?;

        if delimiter != b'\'' && delimiter != b'"' {
            return Err(unexpected(delimiter, "attribute value delimiter"));
        }

        let mut value = Vec::new();

        loop {
            let byte = self.next_byte("attribute value")?;

            if byte == delimiter {
                return into_text(value, "attribute value");
            } else if byte == b'&' {
                let replacement = self.resolve_entity()?;
                value.extend_from_slice(replacement.as_bytes());
            } else {
                value.push(byte);
            }
        }
    }

    /// Resolve `&name;` after the `&` has been consumed.
    fn resolve_entity(&mut self) -> Result<String> {
        let byte = self.next_byte("entity")?;
        if byte == b';' {
            return Err(Error::MalformedInput("entity has no name".to_string()));
        }

        let mut name = vec![byte];
        loop {
            let byte = self.next_byte("entity")?;
            if byte == b';' {
                break;
            }
            name.push(byte);
        }

        let name = into_text(name, "entity name")?;
        match self.entities.resolve(&name) {
            Some(replacement) => Ok(replacement.to_string()),
            None => Err(Error::MalformedInput(format!(
                "unable to resolve entity '&{};'",
                name
            ))),
        }
    }

    /// Skip forward over whitespace; `None` at end-of-stream.
    fn consume_whitespace(&mut self) -> Result<Option<u8>> {
        loop {
            match self.cursor.read()? {
                None => return Ok(None),
                Some(b) if is_space(b) => continue,
                Some(b) => return Ok(Some(b)),
            }
        }
    }

    fn next_byte(&mut self, context: &'static str) -> Result<u8> {
        self.cursor.read()?.ok_or_else(|| {
            Error::MalformedInput(format!("unexpected end of input in {}", context))
        })
    }

    // ------------------------------------------------------------------
    // Reverse direction
    // ------------------------------------------------------------------

    /// Lex the construct ending just before the cursor and enqueue its
    /// event(s) in reverse document order.
    ///
    /// Returns false on clean begin-of-stream. A discarded `xml` declaration
    /// keeps lexing towards the stream start.
    pub fn advance_backward(&mut self) -> Result<bool> {
        loop {
            let byte = match self.cursor.read_prev()? {
                Some(b) => b,
                None => return Ok(false),
            };

            if byte == b'>' {
                if self.reverse_tag()? {
                    return Ok(true);
                }
                // XML declaration discarded; lex the preceding construct.
            } else {
                self.reverse_text(byte)?;
                return Ok(true);
            }
        }
    }

    /// Dispatch on the byte before a `>`. Read right-to-left, the end of
    /// every construct is its beginning, so the dispatch mirrors the forward
    /// one: `?` closes a processing instruction, `--` closes a comment, a
    /// quote or whitespace closes a tag with attributes, `/` closes a
    /// self-closing tag.
    fn reverse_tag(&mut self) -> Result<bool> {
        let byte = self.prev_byte("tag")?;

        if byte == b'?' {
            return self.reverse_processing_instruction();
        }

        if is_space(byte) {
            // Trailing whitespace inside a tag: the next significant byte
            // must close the last attribute value.
            let byte = self
                .consume_whitespace_rev()?
                .ok_or_else(|| reverse_eof("start tag"))?;
            if byte != b'"' && byte != b'\'' {
                return Err(unexpected(byte, "attribute value delimiter"));
            }

            let element = self.reverse_start_tag(byte)?;
            self.events.push_back(XmlEvent::StartElement(element));
            return Ok(true);
        }

        if byte == b'/' {
            // Self-closing tag: the end event precedes the start event in
            // reverse document order.
            let byte = self
                .consume_whitespace_rev()?
                .ok_or_else(|| reverse_eof("start tag"))?;

            let element = self.reverse_start_tag(byte)?;
            self.events
                .push_back(XmlEvent::EndElement(EndElement::new(element.name().clone())));
            self.events.push_back(XmlEvent::StartElement(element));
            return Ok(true);
        }

        if byte == b'"' || byte == b'\'' {
            let element = self.reverse_start_tag(byte)?;
            self.events.push_back(XmlEvent::StartElement(element));
            return Ok(true);
        }

        if byte == b'-' {
            let next = self.prev_byte("tag")?;
            if next == b'-' {
                self.reverse_comment()?;
                return Ok(true);
            }
            // A lone '-' is an ordinary name byte.
            self.cursor.unread_prev()?;
            self.reverse_plain_tag(b'-')?;
            return Ok(true);
        }

        self.reverse_plain_tag(byte)?;
        Ok(true)
    }

    /// A tag without attributes: resolved into a bare start tag or an end
    /// tag by the byte found past the name (`<` or `/<`).
    fn reverse_plain_tag(&mut self, first: u8) -> Result<()> {
        let name = self.reverse_tag_name(first)?;

        let byte = self.prev_byte("tag")?;
        if byte == b'<' {
            self.events.push_back(XmlEvent::StartElement(StartElement::new(
                name,
                Vec::new(),
            )));
            Ok(())
        } else if byte == b'/' {
            let byte = self.prev_byte("end tag")?;
            if byte != b'<' {
                return Err(unexpected(byte, "end tag opening"));
            }
            self.events
                .push_back(XmlEvent::EndElement(EndElement::new(name)));
            Ok(())
        } else {
            Err(unexpected(byte, "tag"))
        }
    }

    /// A start tag whose trailing byte was a quote (attributes present) or a
    /// name byte (no attributes). Consumes through the opening `<`.
    fn reverse_start_tag(&mut self, first: u8) -> Result<StartElement> {
        let mut attributes = Vec::new();
        let mut byte = first;

        if byte == b'"' || byte == b'\'' {
            self.reverse_attributes(byte, &mut attributes)?;
            byte = self.prev_byte("start tag")?;
        }

        let name = self.reverse_tag_name(byte)?;

        let byte = self.prev_byte("start tag")?;
        if byte != b'<' {
            return Err(unexpected(byte, "start tag opening"));
        }

        Ok(StartElement::new(name, attributes))
    }

    /// Accumulate a tag name right-to-left: local part first, then an
    /// optional prefix after `:`. Leaves the terminating `<` or `/` ungot.
    fn reverse_tag_name(&mut self, first: u8) -> Result<QName> {
        if !is_name_byte(first) {
            return Err(unexpected(first, "element name"));
        }

        let mut prefix: Option<Vec<u8>> = None;
        let mut local = vec![first];

        loop {
            let byte = self.prev_byte("tag name")?;

            match byte {
                b'<' | b'/' => {
                    let name = build_reversed_qname(prefix, local, "element name")?;
                    self.cursor.unread_prev()?;
                    return Ok(name);
                }
                b':' => {
                    if prefix.is_some() {
                        return Err(Error::MalformedInput(
                            "second ':' in element name".to_string(),
                        ));
                    }
                    prefix = Some(Vec::new());
                }
                b if is_name_byte(b) => match &mut prefix {
                    Some(p) => p.push(b),
                    None => local.push(b),
                },
                b => return Err(unexpected(b, "element name")),
            }
        }
    }

    fn reverse_text(&mut self, first: u8) -> Result<()> {
        let mut data = Vec::new();

        if first == b';' {
            let replacement = self.resolve_entity_rev(None)?;
            data.extend_from_slice(replacement.as_bytes());
        } else {
            data.push(first);
        }

        loop {
            match self.cursor.read_prev()? {
                None => break,
                Some(b'>') => {
                    self.cursor.unread_prev()?;
                    break;
                }
                // '<' and '&' are illegal in character data, but reading
                // backwards they are not structural; without a
                // well-formedness layer they pass through as ordinary bytes.
                Some(b';') => {
                    let replacement = self.resolve_entity_rev(None)?;
                    data.extend_from_slice(replacement.as_bytes());
                }
                Some(b) => data.push(b),
            }
        }

        data.reverse();
        let text = into_text(data, "character data")?;
        self.events
            .push_back(XmlEvent::Characters(Characters::new(text)));
        Ok(())
    }

    fn reverse_comment(&mut self) -> Result<()> {
        let mut data = Vec::new();
        let mut matched = 0;

        loop {
            let byte = self.prev_byte("comment")?;

            if byte == COMMENT_END_REV[matched] {
                matched += 1;
                if matched == COMMENT_END_REV.len() {
                    data.reverse();
                    let text = into_text(data, "comment")?;
                    self.events.push_back(XmlEvent::Comment(Comment::new(text)));
                    return Ok(());
                }
            } else {
                if matched > 0 {
                    data.extend_from_slice(&COMMENT_END_REV[..matched]);
                    matched = 0;
                }
                data.push(byte);
            }
        }
    }

    /// Returns false when the instruction was the XML declaration, which is
    /// consumed and not emitted.
    ///
    /// The whole instruction is scanned into one buffer; the run of
    /// non-space bytes adjacent to the opening `<?` is the target, and the
    /// whitespace run after it separates target from data.
    fn reverse_processing_instruction(&mut self) -> Result<bool> {
        let mut data: Vec<u8> = Vec::new();
        let mut opened = false;
        let mut target_len = 0usize;
        let mut space_len = 0usize;

        loop {
            let byte = self.prev_byte("processing instruction")?;

            if is_space(byte) {
                data.push(byte);
                if target_len > 0 {
                    space_len = 1;
                } else {
                    space_len += 1;
                }
                target_len = 0;
                continue;
            }

            if byte == b'?' && !opened {
                opened = true;
            } else if byte == b'<' {
                if data.is_empty() {
                    return Err(Error::MalformedInput(
                        "processing instruction ended before a target name was read".to_string(),
                    ));
                }
                if target_len == 0 {
                    return Err(Error::MalformedInput(
                        "processing instruction without target name".to_string(),
                    ));
                }

                data.reverse();
                let text = into_text(data, "processing instruction")?;
                let (target, rest) = text.split_at(target_len);

                if target.eq_ignore_ascii_case("xml") {
                    // XML declaration read backwards: discard.
                    return Ok(false);
                }

                let first = target.as_bytes()[0];
                if !first.is_ascii_alphabetic() {
                    return Err(unexpected(first, "processing instruction target start"));
                }

                let body = rest.get(space_len..).unwrap_or("").to_string();
                self.events.push_back(XmlEvent::ProcessingInstruction(
                    ProcessingInstruction::new(target.to_string(), body),
                ));
                return Ok(true);
            } else {
                if opened {
                    return Err(Error::MalformedInput(
                        "processing instruction target interrupted by '?'".to_string(),
                    ));
                }
                target_len += 1;
                data.push(byte);
            }
        }
    }

    /// Attribute run parsed right-to-left: value, name, then either another
    /// value quote or the end of the name region (ungot for the caller).
    fn reverse_attributes(
        &mut self,
        first_delimiter: u8,
        attributes: &mut Vec<Attribute>,
    ) -> Result<()> {
        let value = self.reverse_attribute_value(first_delimiter)?;
        let name = self.reverse_attribute_name()?;
        attributes.push(Attribute::new(name, value));

        loop {
            let byte = self.prev_byte("attributes")?;

            if is_space(byte) {
                continue;
            } else if byte == b'"' || byte == b'\'' {
                let value = self.reverse_attribute_value(byte)?;
                let name = self.reverse_attribute_name()?;
                attributes.push(Attribute::new(name, value));
            } else {
                self.cursor.unread_prev()?;
                return Ok(());
            }
        }
    }

    /// Value scanned right-to-left between matched quotes; the `=` before
    /// the opening quote is consumed too.
    fn reverse_attribute_value(&mut self, delimiter: u8) -> Result<String> {
        let mut value = Vec::new();

        loop {
            let byte = self.prev_byte("attribute value")?;

            if byte == delimiter {
                let byte = self
                    .consume_whitespace_rev()?
                    .ok_or_else(|| reverse_eof("attribute"))?;
                if byte != b'=' {
                    return Err(Error::MalformedInput(
                        "attribute value not preceded by '='".to_string(),
                    ));
                }

                value.reverse();
                return into_text(value, "attribute value");
            } else if byte == b';' {
                let replacement = self.resolve_entity_rev(Some(delimiter))?;
                value.extend_from_slice(replacement.as_bytes());
            } else {
                value.push(byte);
            }
        }
    }

    /// Name scanned right-to-left after its `=`; terminated by whitespace,
    /// whose first significant predecessor is ungot for the caller.
    fn reverse_attribute_name(&mut self) -> Result<QName> {
        let mut byte = self
            .consume_whitespace_rev()?
            .ok_or_else(|| reverse_eof("attribute"))?;
        if byte == b':' {
            return Err(Error::MalformedInput(
                "attribute name incomplete".to_string(),
            ));
        }

        let mut prefix: Option<Vec<u8>> = None;
        let mut local: Vec<u8> = Vec::new();

        loop {
            if is_space(byte) {
                match self.consume_whitespace_rev()? {
                    Some(_) => self.cursor.unread_prev()?,
                    None => {
                        return Err(Error::MalformedInput(
                            "attribute name incomplete".to_string(),
                        ))
                    }
                }
                return build_reversed_qname(prefix, local, "attribute name");
            } else if byte == b':' {
                if prefix.is_some() {
                    return Err(Error::MalformedInput(
                        "second ':' in attribute name".to_string(),
                    ));
                }
                prefix = Some(Vec::new());
            } else if is_name_byte(byte) {
                match &mut prefix {
                    Some(p) => p.push(byte),
                    None => local.push(byte),
                }
            } else {
                return Err(unexpected(byte, "attribute name"));
            }

            byte = self.prev_byte("attribute name")?;
        }
    }

    /// Resolve an entity scanned right-to-left after its `;` has been
    /// consumed. Returns the text to append to the reverse-accumulating
    /// buffer: the pre-reversed replacement on a dictionary hit, or the
    /// scanned bytes behind a literal `;` when the scan aborts on `>`, `;`,
    /// the enclosing attribute delimiter, or begin-of-stream ("this was not
    /// an entity after all").
    fn resolve_entity_rev(&mut self, delimiter: Option<u8>) -> Result<String> {
        let mut name = Vec::new();

        loop {
            let byte = match self.cursor.read_prev()? {
                None => return literal_semicolon(name),
                Some(b) => b,
            };

            if byte == b'&' {
                break;
            }

            if delimiter == Some(byte) || byte == b'>' || byte == b';' {
                self.cursor.unread_prev()?;
                return literal_semicolon(name);
            }

            name.push(byte);
        }

        if name.is_empty() {
            return Err(Error::MalformedInput("entity has no name".to_string()));
        }

        let name = into_text(name, "entity name")?;
        match self.entities.resolve_reversed(&name) {
            Some(replacement) => Ok(replacement.to_string()),
            None => {
                let forward: String = name.chars().rev().collect();
                Err(Error::MalformedInput(format!(
                    "unable to resolve entity '&{};'",
                    forward
                )))
            }
        }
    }

    /// Skip backward over whitespace; `None` at begin-of-stream.
    fn consume_whitespace_rev(&mut self) -> Result<Option<u8>> {
        loop {
            match self.cursor.read_prev()? {
                None => return Ok(None),
                Some(b) if is_space(b) => continue,
                Some(b) => return Ok(Some(b)),
            }
        }
    }

    fn prev_byte(&mut self, context: &'static str) -> Result<u8> {
        self.cursor
            .read_prev()?
            .ok_or_else(|| reverse_eof(context))
    }
}

/// Assemble a forward-accumulated name.
fn build_qname(prefix: Option<Vec<u8>>, local: Vec<u8>) -> Result<QName> {
    let local = into_text(local, "name")?;
    let prefix = match prefix {
        Some(p) => into_text(p, "name prefix")?,
        None => String::new(),
    };
    Ok(QName::new("", local, prefix))
}

/// Assemble a reverse-accumulated name: flip both parts and validate that
/// the logical first character of each is a name start character.
fn build_reversed_qname(
    prefix: Option<Vec<u8>>,
    mut local: Vec<u8>,
    what: &'static str,
) -> Result<QName> {
    match local.last() {
        Some(&b) if b.is_ascii_alphanumeric() || b == b'_' => {}
        _ => {
            return Err(Error::MalformedInput(format!(
                "{} does not start with a name character",
                what
            )))
        }
    }
    local.reverse();

    let prefix = match prefix {
        None => Vec::new(),
        Some(mut p) => {
            p.reverse();
            if let Some(&b) = p.first() {
                if !b.is_ascii_alphanumeric() && b != b'_' {
                    return Err(Error::MalformedInput(format!(
                        "{} prefix does not start with a name character",
                        what
                    )));
                }
            }
            p
        }
    };

    Ok(QName::new(
        "",
        into_text(local, what)?,
        into_text(prefix, what)?,
    ))
}

/// The not-an-entity outcome of a reverse entity scan: the `;` that started
/// the scan plus the bytes consumed, all literal.
fn literal_semicolon(name: Vec<u8>) -> Result<String> {
    let mut text = vec![b';'];
    text.extend_from_slice(&name);
    into_text(text, "character data")
}

fn into_text(bytes: Vec<u8>, context: &'static str) -> Result<String> {
    String::from_utf8(bytes)
        .map_err(|_| Error::MalformedInput(format!("invalid UTF-8 in {}", context)))
}

fn unexpected(byte: u8, context: &'static str) -> Error {
    Error::MalformedInput(format!(
        "byte '{}' (0x{:02X}) not allowed in {}",
        byte.escape_ascii(),
        byte,
        context
    ))
}

fn reverse_eof(context: &'static str) -> Error {
    Error::MalformedInput(format!("unexpected start of input in {}", context))
}

/// Check if byte is whitespace.
#[inline]
fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// Check if byte is valid inside a name (after the first character).
#[inline]
fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.')
}
