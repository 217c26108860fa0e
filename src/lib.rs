//! bidixml - Bidirectional streaming XML pull parsing
//!
//! An event-based reader over a seekable byte stream that can run in both
//! directions:
//! - `has_next` / `next_event`: events in document order
//! - `has_previous` / `previous_event`: events in reverse document order,
//!   read backwards from the current stream position
//! - Direction can be switched at any time; queued events of the old
//!   direction are dropped
//!
//! The supported XML subset covers start/end tags (including self-closing
//! tags, which emit a start/end pair), character data, comments, processing
//! instructions, and named entities (the five predefined ones plus
//! user-registered replacements). DTDs, namespaces, CDATA sections, and
//! numeric character references are out of scope.
//!
//! ```
//! use bidixml::XmlEventReader;
//!
//! let mut reader = XmlEventReader::from_bytes(b"<a/>".to_vec());
//!
//! assert!(reader.has_next().unwrap());
//! assert!(reader.next_event().unwrap().is_start_element());
//! assert!(reader.has_next().unwrap());
//! assert!(reader.next_event().unwrap().is_end_element());
//! assert!(!reader.has_next().unwrap());
//!
//! // The cursor now sits at end-of-stream; walk back out.
//! assert!(reader.has_previous().unwrap());
//! assert!(reader.previous_event().unwrap().is_end_element());
//! ```

pub mod core;
pub mod error;
pub mod reader;

pub use error::{Error, Result};
pub use reader::events::{
    Attribute, Characters, Comment, EndElement, ProcessingInstruction, QName, StartElement,
    XmlEvent,
};
pub use reader::pull::XmlEventReader;
