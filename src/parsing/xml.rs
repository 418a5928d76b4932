//! A small element tree for loosely-namespaced EDGAR XML.
//!
//! Form 13F documents arrive with inconsistent namespace prefixes (`ns1:infoTable`,
//! `n1:infoTable`, `infoTable`) and casing. Rather than binding to a schema, fields are
//! located by *tag-name substring*: a [`TagPattern`] matches every element whose lower-cased
//! qualified name contains the pattern. This is deliberately loose; a short pattern such as
//! `name` also matches `nameOfIssuer`, so lookups are always scoped to the smallest enclosing
//! element and rely on document order.
//!
//! All patterns used by the extractors are declared in [`tags`].

use crate::{EdgarError, Result};
use quick_xml::{Reader, events::Event};

/// Case-insensitive "tag name contains" predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagPattern(&'static str);

impl TagPattern {
    /// Creates a pattern; `pattern` must already be lower case.
    pub const fn new(pattern: &'static str) -> Self {
        Self(pattern)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// `name` is expected lower-cased, as stored by [`XmlElement`].
    pub fn matches(&self, name: &str) -> bool {
        name.contains(self.0)
    }
}

/// Tag patterns for the 13F primary document and information table.
pub mod tags {
    use super::TagPattern;

    // primary_doc.xml
    pub const CIK: TagPattern = TagPattern::new("cik");
    pub const NAME: TagPattern = TagPattern::new("name");
    pub const FILING_MANAGER: TagPattern = TagPattern::new("filingmanager");
    pub const ADDRESS: TagPattern = TagPattern::new("address");
    pub const STREET1: TagPattern = TagPattern::new("street1");
    pub const STREET2: TagPattern = TagPattern::new("street2");
    pub const CITY: TagPattern = TagPattern::new("city");
    pub const STATE_OR_COUNTRY: TagPattern = TagPattern::new("stateorcountry");
    pub const ZIP_CODE: TagPattern = TagPattern::new("zipcode");
    pub const SUBMISSION_TYPE: TagPattern = TagPattern::new("submissiontype");
    pub const REPORT_TYPE: TagPattern = TagPattern::new("reporttype");
    pub const FILE_NUMBER: TagPattern = TagPattern::new("form13ffilenumber");
    pub const INSTRUCTION5: TagPattern = TagPattern::new("provideinfoforinstruction5");
    pub const ADDITIONAL_INFO: TagPattern = TagPattern::new("additionalinformation");
    pub const PERIOD_OF_REPORT: TagPattern = TagPattern::new("periodofreport");
    pub const CALENDAR_QUARTER: TagPattern = TagPattern::new("reportcalendarorquarter");
    pub const IS_AMENDMENT: TagPattern = TagPattern::new("isamendment");
    pub const OTHER_MANAGERS_INFO: TagPattern = TagPattern::new("othermanagersinfo");
    pub const OTHER_MANAGER: TagPattern = TagPattern::new("othermanager");
    pub const SIGNATURE_BLOCK: TagPattern = TagPattern::new("signatureblock");
    pub const TITLE: TagPattern = TagPattern::new("title");
    pub const PHONE: TagPattern = TagPattern::new("phone");
    pub const SIGNATURE_DATE: TagPattern = TagPattern::new("signaturedate");
    pub const SUMMARY_PAGE: TagPattern = TagPattern::new("summarypage");
    pub const ENTRY_TOTAL: TagPattern = TagPattern::new("tableentrytotal");
    pub const VALUE_TOTAL: TagPattern = TagPattern::new("tablevaluetotal");
    pub const INCLUDED_MANAGERS: TagPattern = TagPattern::new("otherincludedmanagerscount");
    pub const CONFIDENTIAL_OMITTED: TagPattern = TagPattern::new("isconfidentialomitted");
    pub const OTHER_MANAGER2: TagPattern = TagPattern::new("othermanager2");
    pub const SEQUENCE_NUMBER: TagPattern = TagPattern::new("sequencenumber");

    // information table
    pub const INFO_TABLE: TagPattern = TagPattern::new("infotable");
    pub const ISSUER: TagPattern = TagPattern::new("nameofissuer");
    pub const CUSIP: TagPattern = TagPattern::new("cusip");
    pub const TITLE_OF_CLASS: TagPattern = TagPattern::new("titleofclass");
    pub const VALUE: TagPattern = TagPattern::new("value");
    pub const SHARES: TagPattern = TagPattern::new("sshprnamt");
    pub const SHARES_TYPE: TagPattern = TagPattern::new("sshprnamttype");
    pub const PUT_CALL: TagPattern = TagPattern::new("putcall");
    pub const DISCRETION: TagPattern = TagPattern::new("investmentdiscretion");
    pub const VOTING_AUTHORITY: TagPattern = TagPattern::new("votingauthority");
    pub const SOLE: TagPattern = TagPattern::new("sole");
    pub const SHARED: TagPattern = TagPattern::new("shared");
    pub const NONE: TagPattern = TagPattern::new("none");
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    /// Lower-cased qualified name, prefix included (`ns1:infotable`).
    pub name: String,
    text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    fn new(name: String) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    /// Concatenated text of this element and its descendants, trimmed.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out.trim().to_string()
    }

    fn collect_text(&self, out: &mut String) {
        out.push_str(&self.text);
        for child in &self.children {
            child.collect_text(out);
        }
    }

    /// First descendant (document order, excluding `self`) whose name matches.
    pub fn find(&self, pattern: TagPattern) -> Option<&XmlElement> {
        for child in &self.children {
            if pattern.matches(&child.name) {
                return Some(child);
            }
            if let Some(found) = child.find(pattern) {
                return Some(found);
            }
        }
        None
    }

    /// Every matching descendant in document order, nested matches included.
    pub fn find_all(&self, pattern: TagPattern) -> Vec<&XmlElement> {
        let mut out = Vec::new();
        self.collect_matches(pattern, &mut out);
        out
    }

    fn collect_matches<'a>(&'a self, pattern: TagPattern, out: &mut Vec<&'a XmlElement>) {
        for child in &self.children {
            if pattern.matches(&child.name) {
                out.push(child);
            }
            child.collect_matches(pattern, out);
        }
    }

    /// Like [`find`](Self::find), but a missing element is a parse error.
    pub fn require(&self, pattern: TagPattern) -> Result<&XmlElement> {
        self.find(pattern).ok_or_else(|| {
            EdgarError::parse(format!(
                "required element <{}> not found under <{}>",
                pattern.as_str(),
                if self.name.is_empty() { "document" } else { self.name.as_str() }
            ))
        })
    }

    pub fn required_text(&self, pattern: TagPattern) -> Result<String> {
        self.require(pattern).map(XmlElement::text)
    }

    pub fn optional_text(&self, pattern: TagPattern) -> Option<String> {
        self.find(pattern).map(XmlElement::text)
    }
}

/// A parsed document. The root is a synthetic, unnamed element holding the top-level
/// element, so lookups on the document also consider the document element itself.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    root: XmlElement,
}

impl XmlDocument {
    /// Builds the element tree.
    ///
    /// # Errors
    ///
    /// `XmlError` for malformed markup (mismatched or unclosed tags, bad escapes), `Parse`
    /// if the input holds no element at all.
    pub fn parse(content: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(content);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut stack = vec![XmlElement::new(String::new())];

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_lowercase();
                    stack.push(XmlElement::new(name));
                }
                Event::Empty(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_lowercase();
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlElement::new(name));
                    }
                }
                Event::End(_) => {
                    if stack.len() < 2 {
                        return Err(EdgarError::XmlError("unbalanced closing tag".to_string()));
                    }
                    if let (Some(done), Some(parent)) = (stack.pop(), stack.last_mut()) {
                        parent.children.push(done);
                    }
                }
                Event::Text(t) => {
                    let text = t
                        .unescape()
                        .map_err(|e| EdgarError::XmlError(e.to_string()))?;
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&text);
                    }
                }
                Event::CData(c) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if stack.len() != 1 {
            return Err(EdgarError::XmlError(format!(
                "unexpected end of document inside <{}>",
                stack.last().map(|e| e.name.as_str()).unwrap_or_default()
            )));
        }
        let root = stack.remove(0);
        if root.children.is_empty() {
            return Err(EdgarError::parse("document contains no elements"));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    pub fn find(&self, pattern: TagPattern) -> Option<&XmlElement> {
        self.root.find(pattern)
    }

    pub fn find_all(&self, pattern: TagPattern) -> Vec<&XmlElement> {
        self.root.find_all(pattern)
    }

    pub fn require(&self, pattern: TagPattern) -> Result<&XmlElement> {
        self.root.require(pattern)
    }

    pub fn required_text(&self, pattern: TagPattern) -> Result<String> {
        self.root.required_text(pattern)
    }

    pub fn optional_text(&self, pattern: TagPattern) -> Option<String> {
        self.root.optional_text(pattern)
    }
}
