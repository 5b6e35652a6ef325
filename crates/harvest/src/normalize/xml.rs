// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal XML element-tree reader for test and coverage reports.
//!
//! Reports only need elements, attributes and text, so this reader skips
//! the prolog, comments, processing instructions and DOCTYPE, keeps CDATA
//! as text, and decodes the predefined and numeric character entities.
//! Namespaces and DTD-defined entities are not interpreted.

use std::borrow::Cow;
use std::fmt;

/// Nesting limit for elements.
const MAX_DEPTH: usize = 512;

/// An XML element with its attributes, child elements and text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Element>,
    text: String,
}

impl Element {
    /// Attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Direct children with the given name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// First direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Concatenated text content, trimmed.
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    /// Whether this element or any descendant satisfies `pred`.
    pub fn any(&self, pred: &dyn Fn(&Element) -> bool) -> bool {
        pred(self) || self.children.iter().any(|c| c.any(pred))
    }
}

/// Malformed XML, with the 1-based line where reading stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for XmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for XmlError {}

/// Parse a document and return its root element.
pub fn parse(input: &str) -> Result<Element, XmlError> {
    let mut reader = Reader::new(input);
    reader.skip_misc()?;
    if !reader.starts_with("<") {
        return Err(reader.error("expected root element"));
    }
    let root = reader.element(0)?;
    reader.skip_misc()?;
    if !reader.eof() {
        return Err(reader.error("unexpected content after root element"));
    }
    Ok(root)
}

/// Name of the root element, without parsing the rest of the document.
pub fn root_name(input: &str) -> Option<&str> {
    let mut reader = Reader::new(input);
    reader.skip_misc().ok()?;
    if !reader.starts_with("<") {
        return None;
    }
    reader.pos += 1;
    reader.name().ok()
}

struct Reader<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src: src.strip_prefix('\u{feff}').unwrap_or(src),
            pos: 0,
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn starts_with(&self, pat: &str) -> bool {
        self.rest().starts_with(pat)
    }

    fn error(&self, message: impl Into<String>) -> XmlError {
        let line = self.src[..self.pos].matches('\n').count() + 1;
        XmlError {
            line,
            message: message.into(),
        }
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn expect(&mut self, pat: &str) -> Result<(), XmlError> {
        if !self.starts_with(pat) {
            return Err(self.error(format!("expected `{pat}`")));
        }
        self.pos += pat.len();
        Ok(())
    }

    /// Return everything before `pat` and move past it.
    fn take_until(&mut self, pat: &str) -> Result<&'a str, XmlError> {
        let Some(idx) = self.rest().find(pat) else {
            return Err(self.error(format!("unterminated construct, missing `{pat}`")));
        };
        let taken = &self.rest()[..idx];
        self.pos += idx + pat.len();
        Ok(taken)
    }

    fn name(&mut self) -> Result<&'a str, XmlError> {
        let rest = self.rest();
        let end = rest
            .find(|c: char| c.is_whitespace() || "/>=<\"'".contains(c))
            .unwrap_or(rest.len());
        if end == 0 {
            return Err(self.error("expected a name"));
        }
        self.pos += end;
        Ok(&rest[..end])
    }

    /// Skip whitespace, comments, processing instructions and DOCTYPE.
    fn skip_misc(&mut self) -> Result<(), XmlError> {
        loop {
            self.skip_ws();
            if self.starts_with("<?") {
                self.take_until("?>")?;
            } else if self.starts_with("<!--") {
                self.take_until("-->")?;
            } else if self.starts_with("<!DOCTYPE") {
                let rest = self.rest();
                let bracket = rest.find('[');
                let close = rest.find('>');
                if let (Some(b), Some(c)) = (bracket, close)
                    && b < c
                {
                    self.take_until("]")?;
                }
                self.take_until(">")?;
            } else {
                return Ok(());
            }
        }
    }

    /// Read `<name attr="v" ...>` or `<name .../>`. Returns whether it self-closed.
    fn start_tag(&mut self) -> Result<(Element, bool), XmlError> {
        self.expect("<")?;
        let mut element = Element {
            name: self.name()?.to_string(),
            ..Default::default()
        };
        loop {
            self.skip_ws();
            if self.starts_with("/>") {
                self.pos += 2;
                return Ok((element, true));
            }
            if self.starts_with(">") {
                self.pos += 1;
                return Ok((element, false));
            }
            if self.eof() {
                return Err(self.error(format!("unterminated tag <{}>", element.name)));
            }
            let key = self.name()?.to_string();
            self.skip_ws();
            self.expect("=")?;
            self.skip_ws();
            let quote = if self.starts_with("\"") {
                "\""
            } else if self.starts_with("'") {
                "'"
            } else {
                return Err(self.error(format!("attribute `{key}` value must be quoted")));
            };
            self.pos += 1;
            let raw = self.take_until(quote)?;
            let value = decode(raw).map_err(|m| self.error(m))?.into_owned();
            element.attrs.push((key, value));
        }
    }

    fn element(&mut self, depth: usize) -> Result<Element, XmlError> {
        if depth > MAX_DEPTH {
            return Err(self.error("elements nested too deeply"));
        }
        let (mut element, self_closing) = self.start_tag()?;
        if self_closing {
            return Ok(element);
        }

        loop {
            if self.eof() {
                return Err(self.error(format!("unclosed element <{}>", element.name)));
            }
            if self.starts_with("</") {
                self.pos += 2;
                let name = self.name()?;
                if name != element.name {
                    return Err(self.error(format!(
                        "expected </{}>, found </{}>",
                        element.name, name
                    )));
                }
                self.skip_ws();
                self.expect(">")?;
                return Ok(element);
            } else if self.starts_with("<!--") {
                self.take_until("-->")?;
            } else if self.starts_with("<![CDATA[") {
                self.pos += "<![CDATA[".len();
                let data = self.take_until("]]>")?;
                element.text.push_str(data);
            } else if self.starts_with("<?") {
                self.take_until("?>")?;
            } else if self.starts_with("<") {
                let child = self.element(depth + 1)?;
                element.children.push(child);
            } else {
                let rest = self.rest();
                let end = rest.find('<').unwrap_or(rest.len());
                let text = decode(&rest[..end]).map_err(|m| self.error(m))?;
                element.text.push_str(&text);
                self.pos += end;
            }
        }
    }
}

/// Decode predefined and numeric character references.
fn decode(raw: &str) -> Result<Cow<'_, str>, String> {
    if !raw.contains('&') {
        return Ok(Cow::Borrowed(raw));
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let Some(semi) = after.find(';') else {
            return Err("unterminated character reference".to_string());
        };
        let entity = &after[..semi];
        let ch = entity_char(entity).ok_or_else(|| format!("unknown entity &{entity};"))?;
        out.push(ch);
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(Cow::Owned(out))
}

fn entity_char(entity: &str) -> Option<char> {
    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                entity.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
#[path = "xml_tests.rs"]
mod tests;
