//! PDF encoding of laid-out pages.

use lopdf::{
    Dictionary, Document, Object, ObjectId, Stream, StringFormat,
    content::{Content, Operation},
    dictionary,
};

use super::{
    RenderError,
    fonts::Face,
    layout::{DrawItem, Page, PageSetup},
};

/// Document-level information written to the `Info` dictionary.
#[derive(Debug, Clone, Default)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub producer: String,
}

/// Serialize `pages` into a complete PDF byte buffer.
pub fn encode(setup: &PageSetup, pages: &[Page], info: &DocumentInfo) -> Result<Vec<u8>, RenderError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut fonts = Dictionary::new();
    for face in Face::ALL {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => face.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(face.resource(), font_id);
    }
    let resources_id = doc.add_object(dictionary! {
        "Font" => fonts,
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in pages {
        let content = page_content(page);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id: ObjectId = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), setup.width.into(), setup.height.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut info_dict = dictionary! {
        "Producer" => text_string(&info.producer),
    };
    if let Some(title) = &info.title {
        info_dict.set("Title", text_string(title));
    }
    let info_id = doc.add_object(info_dict);
    doc.trailer.set("Info", info_id);

    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

fn page_content(page: &Page) -> Content {
    let mut operations = Vec::new();
    for item in &page.items {
        match item {
            DrawItem::Text {
                x,
                y,
                size,
                face,
                bytes,
            } => {
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new(
                    "Tf",
                    vec![face.resource().into(), (*size).into()],
                ));
                operations.push(Operation::new("Td", vec![(*x).into(), (*y).into()]));
                operations.push(Operation::new(
                    "Tj",
                    vec![Object::String(bytes.clone(), StringFormat::Literal)],
                ));
                operations.push(Operation::new("ET", vec![]));
            }
            DrawItem::Line {
                x1,
                y1,
                x2,
                y2,
                width,
                gray,
            } => {
                operations.push(Operation::new("q", vec![]));
                operations.push(Operation::new("G", vec![(*gray).into()]));
                operations.push(Operation::new("w", vec![(*width).into()]));
                operations.push(Operation::new("m", vec![(*x1).into(), (*y1).into()]));
                operations.push(Operation::new("l", vec![(*x2).into(), (*y2).into()]));
                operations.push(Operation::new("S", vec![]));
                operations.push(Operation::new("Q", vec![]));
            }
        }
    }
    Content { operations }
}

/// PDF text string in UTF-16BE with a byte order mark.
fn text_string(value: &str) -> Object {
    let mut bytes = vec![0xfe, 0xff];
    for unit in value.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::fonts;

    fn page_with(text: &str) -> Page {
        Page {
            items: vec![
                DrawItem::Text {
                    x: 72.0,
                    y: 700.0,
                    size: 11.0,
                    face: Face::Regular,
                    bytes: fonts::encode(text),
                },
                DrawItem::Line {
                    x1: 72.0,
                    y1: 690.0,
                    x2: 200.0,
                    y2: 690.0,
                    width: 0.75,
                    gray: 0.6,
                },
            ],
        }
    }

    #[test]
    fn encodes_a_loadable_document_with_every_page() {
        let setup = PageSetup::default();
        let pages = vec![page_with("one (1)"), page_with("two \\ 2")];
        let info = DocumentInfo {
            title: Some("report.pdf".into()),
            producer: "pdforge".into(),
        };

        let bytes = encode(&setup, &pages, &info).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn text_strings_are_utf16_with_bom() {
        match text_string("A\u{e9}") {
            Object::String(bytes, StringFormat::Hexadecimal) => {
                assert_eq!(bytes, vec![0xfe, 0xff, 0x00, 0x41, 0x00, 0xe9]);
            }
            other => panic!("unexpected object {:?}", other),
        }
    }
}
