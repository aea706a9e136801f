//! Shared-string table loading.

use crate::error::Result;
use quick_xml::events::Event;
use std::io::BufRead;

const SST: &[u8] = b"sst";
const TEXT: &[u8] = b"t";

/// Shared strings table.
///
/// Every `<t>` text run in the pool becomes one entry, in document order.
/// Rich-text entries made of several runs therefore occupy several slots;
/// runs are not joined back into one string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedStrings {
    /// All strings in order
    strings: Vec<String>,
}

impl SharedStrings {
    /// Parse shared strings from XML content.
    pub fn parse(xml: &str) -> Result<Self> {
        Self::from_reader(xml.as_bytes())
    }

    /// Parse shared strings from a buffered reader.
    ///
    /// Stops at `</sst>`. Input that ends before it yields the entries read
    /// so far, including the text of a run left open.
    pub fn from_reader<R: BufRead>(source: R) -> Result<Self> {
        let mut strings = Vec::new();
        let mut reader = quick_xml::Reader::from_reader(source);

        let mut buf = Vec::new();
        let mut in_t = false;
        let mut current_text = String::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) if e.local_name().as_ref() == TEXT => {
                    in_t = true;
                    current_text.clear();
                }
                // <t/> still holds a slot; later indices depend on it
                Event::Empty(e) if e.local_name().as_ref() == TEXT => {
                    strings.push(String::new());
                }
                Event::Text(e) if in_t => {
                    current_text.push_str(&e.unescape()?);
                }
                Event::CData(e) if in_t => {
                    current_text.push_str(&String::from_utf8_lossy(&e));
                }
                Event::End(e) => match e.local_name().as_ref() {
                    TEXT if in_t => {
                        strings.push(std::mem::take(&mut current_text));
                        in_t = false;
                    }
                    SST => break,
                    _ => {}
                },
                Event::Eof => {
                    // a run cut off mid-text still takes its slot
                    if in_t {
                        strings.push(std::mem::take(&mut current_text));
                    }
                    log::warn!(
                        "shared strings ended before </sst>; keeping {} entries",
                        strings.len()
                    );
                    break;
                }
                _ => {}
            }
            buf.clear();
        }

        log::debug!("loaded {} shared strings", strings.len());

        Ok(Self { strings })
    }

    /// Get a string by index.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.strings.get(index).map(|s| s.as_str())
    }

    /// All strings in table order.
    pub fn as_slice(&self) -> &[String] {
        &self.strings
    }

    /// Get the count of shared strings.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
