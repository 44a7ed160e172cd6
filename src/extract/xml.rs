//! XML bodies mapped onto the JSON tree model.
//!
//! Only enough XML to pull values out of feeds and simple APIs:
//!
//! - the document becomes `{"<root tag>": <root element>}`
//! - an element with neither attributes nor child elements becomes its text
//! - otherwise an object: child elements keyed by tag name (repeated tags
//!   collect into an array in document order), attributes as `"@name"`,
//!   non-blank text as `"#text"`
//!
//! Comments, processing instructions and DOCTYPE are skipped, CDATA is text,
//! and the five predefined entities plus numeric character references are
//! decoded. Namespaces are not interpreted; a prefixed tag is just a name.

use serde_json::{Map, Value as JsonValue};

use crate::error::PortalError;

/// Parse an XML document.
pub fn parse(body: &str) -> Result<JsonValue, PortalError> {
    let mut reader = Reader { src: body, pos: 0 };
    reader.skip_misc()?;
    if !reader.rest().starts_with('<') {
        return Err(reader.error("expected a root element"));
    }
    let (name, value) = reader.element()?;
    reader.skip_misc()?;
    if !reader.rest().is_empty() {
        return Err(reader.error("trailing content after root element"));
    }

    let mut root = Map::new();
    root.insert(name, value);
    Ok(JsonValue::Object(root))
}

struct Reader<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn error(&self, what: &str) -> PortalError {
        PortalError::Parse(format!("Invalid XML at byte {}: {}", self.pos, what))
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn skip_past(&mut self, end: &str) -> Result<(), PortalError> {
        match self.rest().find(end) {
            Some(idx) => {
                self.pos += idx + end.len();
                Ok(())
            }
            None => Err(self.error(&format!("missing '{}'", end))),
        }
    }

    fn expect(&mut self, token: &str) -> Result<(), PortalError> {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", token)))
        }
    }

    /// Whitespace, comments, declarations and processing instructions.
    fn skip_misc(&mut self) -> Result<(), PortalError> {
        loop {
            self.skip_ws();
            let rest = self.rest();
            if rest.starts_with("<?") {
                self.skip_past("?>")?;
            } else if rest.starts_with("<!--") {
                self.skip_past("-->")?;
            } else if rest.starts_with("<!") {
                self.skip_past(">")?;
            } else {
                return Ok(());
            }
        }
    }

    fn name(&mut self) -> Result<&'a str, PortalError> {
        let rest = self.rest();
        let end = rest
            .find(|c: char| c.is_whitespace() || matches!(c, '/' | '>' | '='))
            .unwrap_or(rest.len());
        if end == 0 {
            return Err(self.error("expected a name"));
        }
        self.pos += end;
        Ok(&rest[..end])
    }

    fn element(&mut self) -> Result<(String, JsonValue), PortalError> {
        self.expect("<")?;
        let name = self.name()?;
        let mut attrs = Vec::new();

        loop {
            self.skip_ws();
            if self.rest().starts_with("/>") {
                self.pos += 2;
                return Ok((name.to_string(), build(attrs, Vec::new(), String::new())));
            }
            if self.rest().starts_with('>') {
                self.pos += 1;
                break;
            }
            let attr = self.name()?;
            self.skip_ws();
            self.expect("=")?;
            self.skip_ws();
            let quote = match self.rest().chars().next() {
                Some(q @ ('"' | '\'')) => q,
                _ => return Err(self.error("expected a quoted attribute value")),
            };
            self.pos += 1;
            let len = self
                .rest()
                .find(quote)
                .ok_or_else(|| self.error("unterminated attribute value"))?;
            let raw = &self.rest()[..len];
            self.pos += len + 1;
            attrs.push((format!("@{}", attr), decode_entities(raw)?));
        }

        let mut children = Vec::new();
        let mut text = String::new();
        loop {
            let rest = self.rest();
            if rest.starts_with("</") {
                self.pos += 2;
                let close = self.name()?;
                if close != name {
                    return Err(self.error(&format!("</{}> closes <{}>", close, name)));
                }
                self.skip_ws();
                self.expect(">")?;
                break;
            } else if rest.starts_with("<!--") {
                self.skip_past("-->")?;
            } else if let Some(cdata) = rest.strip_prefix("<![CDATA[") {
                let len = cdata
                    .find("]]>")
                    .ok_or_else(|| self.error("unterminated CDATA"))?;
                text.push_str(&cdata[..len]);
                self.pos += "<![CDATA[".len() + len + "]]>".len();
            } else if rest.starts_with("<?") {
                self.skip_past("?>")?;
            } else if rest.starts_with('<') {
                children.push(self.element()?);
            } else if rest.is_empty() {
                return Err(self.error(&format!("unclosed <{}>", name)));
            } else {
                let len = rest.find('<').unwrap_or(rest.len());
                text.push_str(&decode_entities(&rest[..len])?);
                self.pos += len;
            }
        }

        Ok((name.to_string(), build(attrs, children, text)))
    }
}

fn build(
    attrs: Vec<(String, String)>,
    children: Vec<(String, JsonValue)>,
    text: String,
) -> JsonValue {
    let text = text.trim();
    if attrs.is_empty() && children.is_empty() {
        return JsonValue::String(text.to_string());
    }

    let mut map = Map::new();
    for (key, value) in attrs {
        map.insert(key, JsonValue::String(value));
    }
    for (key, value) in children {
        match map.get_mut(&key) {
            // Element values are never arrays, so an array here is a group
            // of earlier siblings with the same tag.
            Some(JsonValue::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = JsonValue::Array(vec![first, value]);
            }
            None => {
                map.insert(key, value);
            }
        }
    }
    if !text.is_empty() {
        map.insert("#text".to_string(), JsonValue::String(text.to_string()));
    }
    JsonValue::Object(map)
}

fn decode_entities(raw: &str) -> Result<String, PortalError> {
    if !raw.contains('&') {
        return Ok(raw.to_string());
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let semi = rest
            .find(';')
            .ok_or_else(|| PortalError::Parse("Invalid XML: unterminated entity".into()))?;
        let entity = &rest[1..semi];
        let ch = match entity {
            "lt" => Some('<'),
            "gt" => Some('>'),
            "amp" => Some('&'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
                .map(|hex| u32::from_str_radix(hex, 16).ok())
                .unwrap_or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };
        match ch {
            Some(ch) => out.push(ch),
            None => {
                return Err(PortalError::Parse(format!(
                    "Invalid XML: unknown entity &{};",
                    entity
                )));
            }
        }
        rest = &rest[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
