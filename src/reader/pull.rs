//! Bidirectional pull-protocol reader
//!
//! `XmlEventReader` layers the pull protocol over the tokenizer: callers
//! poll `has_next`/`has_previous`, which lazily lex and queue events, then
//! drain the queue with `next_event`/`previous_event`. Switching direction
//! drops any queued events of the old direction.

use std::io::{Cursor, Read, Seek};

use crate::core::tokenizer::Tokenizer;
use crate::error::{Error, Result};
use crate::reader::events::XmlEvent;

/// Pull-style XML event reader over a seekable byte stream.
///
/// Forward reading proceeds from the stream's current position; reverse
/// reading consumes the bytes before it. The reader assumes exclusive
/// ownership of the stream's seek position; seeking the stream externally
/// invalidates the reader, as does any returned error.
///
/// The `has_*` latch enforces single-step lookahead: the reader may need to
/// lex to decide whether an event exists, and the latch records that the lex
/// already happened so a repeated query cannot advance the stream twice.
pub struct XmlEventReader<S: Read + Seek> {
    tokenizer: Tokenizer<S>,
    next_queried: bool,
    prev_queried: bool,
    forward: bool,
}

impl XmlEventReader<Cursor<Vec<u8>>> {
    /// Reader over an in-memory document, positioned at its start.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        XmlEventReader::new(Cursor::new(bytes))
    }

    /// Reader over an in-memory document given as text.
    pub fn from_string(text: &str) -> Self {
        Self::from_bytes(text.as_bytes().to_vec())
    }
}

impl<S: Read + Seek> XmlEventReader<S> {
    /// Create a reader at the stream's current position.
    pub fn new(stream: S) -> Self {
        XmlEventReader {
            tokenizer: Tokenizer::new(stream),
            next_queried: false,
            prev_queried: false,
            forward: true,
        }
    }

    /// Consume the reader and return the wrapped stream.
    pub fn into_inner(self) -> S {
        self.tokenizer.into_inner()
    }

    /// True if a forward event is available. May advance the stream.
    ///
    /// Switching from reverse reading drops any queued reverse events.
    /// Returns false only on clean end-of-stream.
    pub fn has_next(&mut self) -> Result<bool> {
        if self.prev_queried || !self.forward {
            self.tokenizer.clear_pending();
            self.prev_queried = false;
            self.forward = true;
        }

        if self.tokenizer.has_pending() {
            return Ok(true);
        }

        if self.next_queried {
            return Ok(false);
        }
        self.next_queried = true;

        self.tokenizer.advance_forward()
    }

    /// Remove and return the next queued forward event.
    ///
    /// Requires `has_next` to have returned true since the last event was
    /// taken (or an event to still be queued, as with the second half of a
    /// self-closing pair); anything else is a protocol violation.
    pub fn next_event(&mut self) -> Result<XmlEvent> {
        if self.prev_queried || !self.forward {
            return Err(Error::Logic(
                "next_event without a prior has_next".to_string(),
            ));
        }

        if !self.tokenizer.has_pending() && !self.next_queried {
            return Err(Error::Logic(
                "next_event without a prior has_next".to_string(),
            ));
        }

        self.next_queried = false;

        self.tokenizer.pop_event().ok_or_else(|| {
            Error::Logic("next_event although has_next returned false".to_string())
        })
    }

    /// True if a reverse event is available. May move the stream backwards.
    ///
    /// Switching from forward reading drops any queued forward events.
    /// Returns false only at begin-of-stream.
    pub fn has_previous(&mut self) -> Result<bool> {
        if self.next_queried || self.forward {
            self.tokenizer.clear_pending();
            self.next_queried = false;
            self.forward = false;
        }

        if self.tokenizer.has_pending() {
            return Ok(true);
        }

        if self.prev_queried {
            return Ok(false);
        }
        self.prev_queried = true;

        self.tokenizer.advance_backward()
    }

    /// Remove and return the next queued reverse event.
    ///
    /// Mirror contract of `next_event`.
    pub fn previous_event(&mut self) -> Result<XmlEvent> {
        if self.next_queried || self.forward {
            return Err(Error::Logic(
                "previous_event without a prior has_previous".to_string(),
            ));
        }

        if !self.tokenizer.has_pending() && !self.prev_queried {
            return Err(Error::Logic(
                "previous_event without a prior has_previous".to_string(),
            ));
        }

        self.prev_queried = false;

        self.tokenizer.pop_event().ok_or_else(|| {
            Error::Logic("previous_event although has_previous returned false".to_string())
        })
    }

    /// Register a named entity for both directions.
    ///
    /// The five predefined names are rejected with `InvalidArgument`.
    pub fn add_to_entity_replacement_dictionary(
        &mut self,
        name: &str,
        replacement: &str,
    ) -> Result<()> {
        self.tokenizer.entities_mut().register(name, replacement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::events::QName;
    use pretty_assertions::assert_eq;

    fn reader(xml: &str) -> XmlEventReader<Cursor<Vec<u8>>> {
        XmlEventReader::from_string(xml)
    }

    /// Drain the reader forwards.
    fn read_all(reader: &mut XmlEventReader<Cursor<Vec<u8>>>) -> Vec<XmlEvent> {
        let mut events = Vec::new();
        while reader.has_next().unwrap() {
            events.push(reader.next_event().unwrap());
        }
        events
    }

    /// Drain the reader backwards from its current position.
    fn read_all_back(reader: &mut XmlEventReader<Cursor<Vec<u8>>>) -> Vec<XmlEvent> {
        let mut events = Vec::new();
        while reader.has_previous().unwrap() {
            events.push(reader.previous_event().unwrap());
        }
        events
    }

    #[test]
    fn test_self_closing_round_trip() {
        let mut r = reader("<a/>");

        let forward = read_all(&mut r);
        assert_eq!(forward.len(), 2);
        assert!(forward[0].is_start_element());
        assert!(forward[1].is_end_element());

        // The cursor sits at end-of-stream; the same tag mirrors backwards.
        let backward = read_all_back(&mut r);
        assert_eq!(backward.len(), 2);
        assert!(backward[0].is_end_element());
        assert!(backward[1].is_start_element());
        assert_eq!(
            backward[1].as_start_element().unwrap().name().local_part(),
            "a"
        );
    }

    #[test]
    fn test_prefixed_element_with_attribute() {
        let mut r = reader(r#"<p:x attr="1&amp;2">hi</p:x>"#);
        let events = read_all(&mut r);
        assert_eq!(events.len(), 3);

        let start = events[0].as_start_element().unwrap();
        assert_eq!(start.name().prefix(), "p");
        assert_eq!(start.name().local_part(), "x");
        let attr = start
            .attribute_by_name(&QName::new("", "attr", ""))
            .unwrap();
        assert_eq!(attr.value(), "1&2");

        let chars = events[1].as_characters().unwrap();
        assert_eq!(chars.data(), "hi");
        assert!(!chars.is_whitespace());

        assert_eq!(events[2].as_end_element().unwrap().name().local_part(), "x");
    }

    #[test]
    fn test_comment_then_element() {
        let mut r = reader("<!-- c --><r>t</r>");
        let events = read_all(&mut r);
        assert_eq!(events.len(), 4);
        assert_eq!(events[0].as_comment().unwrap().text(), " c ");
        assert!(events[1].is_start_element());
        assert_eq!(events[2].as_characters().unwrap().data(), "t");
        assert!(events[3].is_end_element());
    }

    #[test]
    fn test_xml_declaration_discarded() {
        let mut r = reader("<?xml version=\"1.0\"?><r/>");
        let events = read_all(&mut r);
        assert_eq!(events.len(), 2);
        assert!(events[0].is_start_element());
        assert!(events[1].is_end_element());
    }

    #[test]
    fn test_unknown_entity_fails() {
        let mut r = reader("<r>&unknown;</r>");
        assert!(r.has_next().unwrap());
        r.next_event().unwrap();
        let err = r.has_next().unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_attribute_order_forward_and_reverse() {
        let mut r = reader("<r a=\"x\" b='y'/>");

        let forward = read_all(&mut r);
        let fwd_names: Vec<_> = forward[0]
            .as_start_element()
            .unwrap()
            .attributes()
            .iter()
            .map(|a| a.name().local_part().to_string())
            .collect();
        assert_eq!(fwd_names, vec!["a", "b"]);

        let backward = read_all_back(&mut r);
        let rev_names: Vec<_> = backward[1]
            .as_start_element()
            .unwrap()
            .attributes()
            .iter()
            .map(|a| a.name().local_part().to_string())
            .collect();
        assert_eq!(rev_names, vec!["b", "a"]);
    }

    #[test]
    fn test_forward_then_reverse_mirrors() {
        let xml = "<!-- c --><root a=\"1\"><p:x>hi &amp; bye</p:x><y/></root>";
        let mut r = reader(xml);

        let forward = read_all(&mut r);
        let backward = read_all_back(&mut r);

        assert_eq!(forward.len(), backward.len());
        for (f, b) in forward.iter().zip(backward.iter().rev()) {
            match (f, b) {
                (XmlEvent::StartElement(fe), XmlEvent::StartElement(be)) => {
                    assert_eq!(fe.name(), be.name());
                    assert_eq!(fe.attributes().len(), be.attributes().len());
                }
                (XmlEvent::EndElement(fe), XmlEvent::EndElement(be)) => {
                    assert_eq!(fe.name(), be.name());
                }
                (XmlEvent::Characters(fc), XmlEvent::Characters(bc)) => {
                    assert_eq!(fc.data(), bc.data());
                    assert_eq!(fc.is_whitespace(), bc.is_whitespace());
                }
                (XmlEvent::Comment(fc), XmlEvent::Comment(bc)) => {
                    assert_eq!(fc.text(), bc.text());
                }
                (XmlEvent::ProcessingInstruction(fp), XmlEvent::ProcessingInstruction(bp)) => {
                    assert_eq!(fp.target(), bp.target());
                    assert_eq!(fp.data(), bp.data());
                }
                (f, b) => panic!("variant mismatch: {:?} vs {:?}", f, b),
            }
        }
    }

    #[test]
    fn test_entity_round_trip_both_directions() {
        let mut r = reader("<r>&word;</r>");
        r.add_to_entity_replacement_dictionary("word", "hello")
            .unwrap();

        let forward = read_all(&mut r);
        assert_eq!(forward[1].as_characters().unwrap().data(), "hello");

        let backward = read_all_back(&mut r);
        assert_eq!(backward[1].as_characters().unwrap().data(), "hello");
    }

    #[test]
    fn test_entity_in_attribute_round_trip() {
        let mut r = reader("<r a=\"&word;\"/>");
        r.add_to_entity_replacement_dictionary("word", "hello")
            .unwrap();

        let forward = read_all(&mut r);
        assert_eq!(
            forward[0].as_start_element().unwrap().attributes()[0].value(),
            "hello"
        );

        let backward = read_all_back(&mut r);
        assert_eq!(
            backward[1].as_start_element().unwrap().attributes()[0].value(),
            "hello"
        );
    }

    #[test]
    fn test_predefined_entity_collision() {
        let mut r = reader("<r/>");
        for name in ["amp", "lt", "gt", "apos", "quot"] {
            let err = r
                .add_to_entity_replacement_dictionary(name, "x")
                .unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)));
        }
    }

    #[test]
    fn test_next_event_without_has_next_is_protocol_error() {
        let mut r = reader("<r/>");
        let err = r.next_event().unwrap_err();
        assert!(err.is_logic());
    }

    #[test]
    fn test_previous_event_without_has_previous_is_protocol_error() {
        let mut r = reader("<r/>");
        let err = r.previous_event().unwrap_err();
        assert!(err.is_logic());
    }

    #[test]
    fn test_next_event_after_exhaustion_is_protocol_error() {
        let mut r = reader("<r/>");
        read_all(&mut r);
        assert!(!r.has_next().unwrap());
        let err = r.next_event().unwrap_err();
        assert!(err.is_logic());
    }

    #[test]
    fn test_has_next_is_idempotent() {
        let mut r = reader("<r/>");
        assert!(r.has_next().unwrap());
        assert!(r.has_next().unwrap());
        let _ = r.next_event().unwrap();
        let _ = r.next_event().unwrap();
        assert!(!r.has_next().unwrap());
        assert!(!r.has_next().unwrap());
    }

    #[test]
    fn test_direction_switch_drops_queued_events() {
        let mut r = reader("<a/><b/>");

        assert!(r.has_next().unwrap());
        let first = r.next_event().unwrap();
        assert!(first.is_start_element());
        // The matching EndElement is still queued; flipping discards it and
        // re-lexes the same tag backwards from the position after `<a/>`.
        let backward = read_all_back(&mut r);
        assert_eq!(backward.len(), 2);
        assert!(backward[0].is_end_element());
        assert!(backward[1].is_start_element());
        assert_eq!(
            backward[0].as_end_element().unwrap().name().local_part(),
            "a"
        );
    }

    #[test]
    fn test_next_event_after_direction_flip_is_protocol_error() {
        let mut r = reader("<a/>");
        read_all(&mut r);
        assert!(r.has_previous().unwrap());
        // Forward access now requires a fresh has_next.
        let err = r.next_event().unwrap_err();
        assert!(err.is_logic());
    }

    #[test]
    fn test_partial_forward_then_reverse_replays_prefix() {
        let mut r = reader("<r>t</r>");

        assert!(r.has_next().unwrap());
        let start = r.next_event().unwrap();
        assert!(start.is_start_element());
        assert!(r.has_next().unwrap());
        let chars = r.next_event().unwrap();
        assert_eq!(chars.as_characters().unwrap().data(), "t");

        // The cursor sits after "t"; walking back replays the consumed
        // prefix in reverse order.
        let backward = read_all_back(&mut r);
        assert_eq!(backward.len(), 2);
        assert_eq!(backward[0].as_characters().unwrap().data(), "t");
        assert!(backward[1].is_start_element());
    }

    #[test]
    fn test_reverse_from_start_is_empty() {
        let mut r = reader("<r/>");
        assert!(!r.has_previous().unwrap());
        assert!(!r.has_previous().unwrap());
    }

    #[test]
    fn test_empty_input() {
        let mut r = reader("");
        assert!(!r.has_next().unwrap());
        assert!(!r.has_previous().unwrap());
    }

    #[test]
    fn test_into_inner_returns_stream() {
        let mut r = reader("<r/>");
        read_all(&mut r);
        let stream = r.into_inner();
        assert_eq!(stream.into_inner(), b"<r/>".to_vec());
    }
}
