//! Incremental PDF file writer.
//!
//! Objects are serialized as soon as they are complete, so a page's content
//! stream and images can be dropped before the next page is drawn. Only the
//! page tree and catalog are written at the end, once every page id is known.
//! The sink only needs `Write`; byte offsets for the xref table are counted
//! while writing.

use lopdf::content::Content;
use lopdf::{Dictionary, Object, ObjectId, Stream, StringFormat, dictionary};
use std::collections::BTreeMap;
use std::io::{self, Write};

/// Pixel size and encoded bytes of a baseline RGB JPEG.
pub struct JpegImage<'a> {
    pub width: u32,
    pub height: u32,
    pub data: &'a [u8],
}

/// Wraps the output and tracks how many bytes went through it.
struct CountingSink<W: Write> {
    inner: W,
    written: u64,
}

impl<W: Write> CountingSink<W> {
    fn put(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.inner.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(())
    }
}

pub struct StreamingPdfWriter<W: Write> {
    sink: CountingSink<W>,
    /// Byte offset of every indirect object written so far.
    offsets: BTreeMap<u32, u64>,
    next_id: u32,
    pub pages_id: ObjectId,
    pub catalog_id: ObjectId,
    pub fonts_id: ObjectId,
    page_ids: Vec<ObjectId>,
    info: Option<Dictionary>,
    scratch: Vec<u8>,
}

impl<W: Write> StreamingPdfWriter<W> {
    /// Writes the header and the shared font dictionary.
    pub fn new(writer: W, version: &str, font_dict: Dictionary) -> io::Result<Self> {
        let mut this = Self {
            sink: CountingSink {
                inner: writer,
                written: 0,
            },
            offsets: BTreeMap::new(),
            next_id: 4,
            pages_id: (1, 0),
            catalog_id: (2, 0),
            fonts_id: (3, 0),
            page_ids: Vec::new(),
            info: None,
            scratch: Vec::with_capacity(4096),
        };
        this.sink.put(format!("%PDF-{}\n", version).as_bytes())?;
        this.sink.put(b"%\xE2\xE3\xCF\xD3\n")?;
        this.emit(this.fonts_id, &Object::Dictionary(font_dict))?;
        Ok(this)
    }

    fn allocate(&mut self) -> ObjectId {
        let id = (self.next_id, 0);
        self.next_id += 1;
        id
    }

    pub fn write_object(&mut self, object: Object) -> io::Result<ObjectId> {
        let id = self.allocate();
        self.emit(id, &object)?;
        Ok(id)
    }

    fn emit(&mut self, id: ObjectId, object: &Object) -> io::Result<()> {
        self.offsets.insert(id.0, self.sink.written);
        let mut buf = std::mem::take(&mut self.scratch);
        buf.clear();
        buf.extend_from_slice(format!("{} {} obj\n", id.0, id.1).as_bytes());
        encode_object(object, &mut buf);
        buf.extend_from_slice(b"\nendobj\n");
        let result = self.sink.put(&buf);
        self.scratch = buf;
        result
    }

    pub fn write_content_stream(&mut self, content: Content) -> io::Result<ObjectId> {
        let bytes = content
            .encode()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        self.write_object(Object::Stream(Stream::new(dictionary! {}, bytes)))
    }

    /// Embeds a JPEG as an image XObject without re-encoding it.
    pub fn write_jpeg(&mut self, image: JpegImage<'_>) -> io::Result<ObjectId> {
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => image.width as i64,
            "Height" => image.height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        };
        self.write_object(Object::Stream(Stream::new(dict, image.data.to_vec())))
    }

    /// Writes a page referencing `content_id`, in document order.
    pub fn write_page(
        &mut self,
        content_id: ObjectId,
        resources: Dictionary,
        width: f32,
        height: f32,
    ) -> io::Result<ObjectId> {
        let page = dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.0.into(), 0.0.into(), width.into(), height.into()],
            "Contents" => content_id,
            "Resources" => resources,
        };
        let id = self.write_object(page.into())?;
        self.page_ids.push(id);
        Ok(id)
    }

    /// Document title (WinAnsi encoded), producer and `D:` creation date.
    pub fn set_info(&mut self, title: &str, producer: &str, creation_date: &str) {
        self.info = Some(dictionary! {
            "Title" => Object::String(rigsheet_render_core::utils::to_win_ansi(title), StringFormat::Literal),
            "Producer" => Object::string_literal(producer),
            "CreationDate" => Object::string_literal(creation_date),
        });
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Writes the page tree, catalog, info, xref and trailer, and returns the sink.
    pub fn finish(mut self) -> io::Result<W> {
        let kids: Vec<Object> = self.page_ids.iter().copied().map(Object::Reference).collect();
        let count = kids.len() as i64;
        self.emit(
            self.pages_id,
            &dictionary! { "Type" => "Pages", "Kids" => kids, "Count" => count }.into(),
        )?;
        self.emit(
            self.catalog_id,
            &dictionary! { "Type" => "Catalog", "Pages" => self.pages_id }.into(),
        )?;
        let info_id = match self.info.take() {
            Some(info) => Some(self.write_object(info.into())?),
            None => None,
        };

        let xref_start = self.sink.written;
        let size = self.next_id;
        let mut tail = xref_table(&self.offsets);

        let mut trailer = dictionary! { "Size" => size as i64, "Root" => self.catalog_id };
        if let Some(info_id) = info_id {
            trailer.set("Info", info_id);
        }
        tail.extend_from_slice(b"trailer\n");
        encode_dictionary(&trailer, &mut tail);
        tail.extend_from_slice(format!("\nstartxref\n{}\n%%EOF", xref_start).as_bytes());
        self.sink.put(&tail)?;

        self.sink.inner.flush()?;
        Ok(self.sink.inner)
    }
}

/// Cross-reference table with one subsection per run of consecutive ids.
fn xref_table(offsets: &BTreeMap<u32, u64>) -> Vec<u8> {
    let mut out = b"xref\n0 1\n0000000000 65535 f \n".to_vec();
    let ids: Vec<u32> = offsets.keys().copied().collect();
    for run in ids.chunk_by(|a, b| b == &(a + 1)) {
        out.extend_from_slice(format!("{} {}\n", run[0], run.len()).as_bytes());
        for id in run {
            out.extend_from_slice(format!("{:010} 00000 n \n", offsets[id]).as_bytes());
        }
    }
    out
}

fn encode_object(object: &Object, out: &mut Vec<u8>) {
    match object {
        Object::Null => out.extend_from_slice(b"null"),
        Object::Boolean(value) => out.extend_from_slice(if *value { &b"true"[..] } else { &b"false"[..] }),
        Object::Integer(value) => out.extend_from_slice(value.to_string().as_bytes()),
        Object::Real(value) => out.extend_from_slice(format!("{:.3}", value).as_bytes()),
        Object::Name(name) => {
            out.push(b'/');
            out.extend_from_slice(name);
        }
        Object::String(bytes, StringFormat::Literal) => {
            out.push(b'(');
            for &byte in bytes {
                if matches!(byte, b'(' | b')' | b'\\') {
                    out.push(b'\\');
                }
                out.push(byte);
            }
            out.push(b')');
        }
        Object::String(bytes, StringFormat::Hexadecimal) => {
            out.push(b'<');
            for byte in bytes {
                out.extend_from_slice(format!("{:02X}", byte).as_bytes());
            }
            out.push(b'>');
        }
        Object::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                encode_object(item, out);
            }
            out.push(b']');
        }
        Object::Dictionary(dict) => encode_dictionary(dict, out),
        Object::Stream(stream) => {
            let mut dict = stream.dict.clone();
            dict.set("Length", stream.content.len() as i64);
            encode_dictionary(&dict, out);
            out.extend_from_slice(b"\nstream\n");
            out.extend_from_slice(&stream.content);
            out.extend_from_slice(b"\nendstream");
        }
        Object::Reference((id, generation)) => {
            out.extend_from_slice(format!("{} {} R", id, generation).as_bytes())
        }
    }
}

/// Keys are emitted in sorted order so output is byte-for-byte reproducible.
fn encode_dictionary(dict: &Dictionary, out: &mut Vec<u8>) {
    let mut entries: Vec<_> = dict.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    out.extend_from_slice(b"<<");
    for (key, value) in entries {
        out.push(b'/');
        out.extend_from_slice(key);
        out.push(b' ');
        encode_object(value, out);
        out.push(b' ');
    }
    out.extend_from_slice(b">>");
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::Operation;

    #[test]
    fn written_file_parses_back() {
        let fonts = dictionary! {
            "F1" => dictionary! {
                "Type" => "Font", "Subtype" => "Type1", "BaseFont" => "Helvetica", "Encoding" => "WinAnsiEncoding",
            },
        };
        let mut writer = StreamingPdfWriter::new(Vec::new(), "1.7", fonts).unwrap();
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![50.into(), 50.into()]),
                Operation::new("Tj", vec![Object::string_literal("Gants (x2)")]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = writer.write_content_stream(content).unwrap();
        let resources = dictionary! { "Font" => writer.fonts_id };
        writer.write_page(content_id, resources, 200.0, 100.0).unwrap();
        writer.set_info("Inventaire", "test", "D:20240305120000");
        assert_eq!(writer.page_count(), 1);
        let bytes = writer.finish().unwrap();

        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
        let text = doc.extract_text(&[1]).unwrap();
        assert!(text.contains("Gants (x2)"));
    }

    #[test]
    fn xref_groups_consecutive_ids() {
        let offsets = BTreeMap::from([(1, 15), (2, 40), (4, 90)]);
        let table = String::from_utf8(xref_table(&offsets)).unwrap();
        assert!(table.contains("1 2\n0000000015 00000 n \n0000000040 00000 n \n"));
        assert!(table.contains("4 1\n0000000090 00000 n \n"));
    }
}
