//! Re-serialize repaired HTML as a well-formed XHTML document.
//!
//! The repaired markup is balanced but still HTML-flavoured: void elements
//! carry no closing slash and named entities such as `&nbsp;` may appear.
//! The layout reader is a strict XML reader, so both are normalised here.

use quick_xml::{
    Reader, Writer,
    events::{BytesEnd, BytesStart, BytesText, Event},
};
use std::io::Cursor;

use super::RenderError;

pub const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

const VOID_ELEMENTS: [&[u8]; 6] = [b"br", b"hr", b"img", b"wbr", b"col", b"input"];

/// HTML named references the serializer may emit beyond the XML five.
pub(crate) fn resolve_html_entity(name: &str) -> Option<&'static str> {
    Some(match name {
        "nbsp" => "\u{a0}",
        "copy" => "\u{a9}",
        "reg" => "\u{ae}",
        "hellip" => "\u{2026}",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "bull" => "\u{2022}",
        "euro" => "\u{20ac}",
        "trade" => "\u{2122}",
        _ => return None,
    })
}

fn is_void(name: &[u8]) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

/// Wrap `fragment` in `<html><body>` and emit it as XHTML.
pub fn to_xhtml(fragment: &str) -> Result<String, RenderError> {
    let mut reader = Reader::from_str(fragment);
    reader.trim_text(false);
    reader.check_end_names(false);

    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut html = BytesStart::new("html");
    html.push_attribute(("xmlns", XHTML_NAMESPACE));
    writer
        .write_event(Event::Start(html))
        .map_err(RenderError::markup)?;
    writer
        .write_event(Event::Start(BytesStart::new("body")))
        .map_err(RenderError::markup)?;

    // Names of elements opened but not yet closed, so stray end tags can be
    // ignored and anything left open gets closed at the end.
    let mut open: Vec<String> = Vec::new();

    loop {
        match reader.read_event().map_err(RenderError::markup)? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                let element = copy_element(&name, &e)?;
                if is_void(name.as_bytes()) {
                    writer
                        .write_event(Event::Empty(element))
                        .map_err(RenderError::markup)?;
                } else {
                    writer
                        .write_event(Event::Start(element))
                        .map_err(RenderError::markup)?;
                    open.push(name);
                }
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                let element = copy_element(&name, &e)?;
                writer
                    .write_event(Event::Empty(element))
                    .map_err(RenderError::markup)?;
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                if let Some(pos) = open.iter().rposition(|n| *n == name) {
                    for closing in open.drain(pos..).rev() {
                        writer
                            .write_event(Event::End(BytesEnd::new(closing)))
                            .map_err(RenderError::markup)?;
                    }
                }
            }
            Event::Text(t) => {
                let text = t
                    .unescape_with(resolve_html_entity)
                    .map_err(RenderError::markup)?;
                writer
                    .write_event(Event::Text(BytesText::new(&text)))
                    .map_err(RenderError::markup)?;
            }
            Event::CData(c) => {
                let text = String::from_utf8_lossy(&c).into_owned();
                writer
                    .write_event(Event::Text(BytesText::new(&text)))
                    .map_err(RenderError::markup)?;
            }
            Event::Eof => break,
            // Comments, doctypes and processing instructions carry no content.
            _ => {}
        }
    }

    for closing in open.into_iter().rev() {
        writer
            .write_event(Event::End(BytesEnd::new(closing)))
            .map_err(RenderError::markup)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("body")))
        .map_err(RenderError::markup)?;
    writer
        .write_event(Event::End(BytesEnd::new("html")))
        .map_err(RenderError::markup)?;

    String::from_utf8(writer.into_inner().into_inner()).map_err(RenderError::markup)
}

/// Copy an element with lower-cased name and re-escaped attribute values.
fn copy_element(name: &str, source: &BytesStart<'_>) -> Result<BytesStart<'static>, RenderError> {
    let mut element = BytesStart::new(name.to_string());
    for attr in source.attributes().with_checks(false) {
        let attr = attr.map_err(RenderError::markup)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
        let value = attr
            .unescape_value_with(resolve_html_entity)
            .map_err(RenderError::markup)?;
        element.push_attribute((key.as_str(), value.as_ref()));
    }
    Ok(element)
}
