//! Word adapter: raw text from `.docx`/`.doc`, and minimal DOCX output.
//!
//! The container is sniffed from the leading bytes rather than trusted from
//! the extension, because `.doc` files in the wild are often DOCX (including
//! every `.doc` this crate writes).
//!
//! ## Legacy binary `.doc`
//!
//! Word 97–2003 files are OLE compound files. The text lives in the
//! `WordDocument` stream as a sequence of pieces described by the piece table
//! (`Clx`) in the `0Table`/`1Table` stream. Each piece is either 8-bit
//! Windows-1252 or UTF-16LE. Only the main document text is returned; headers,
//! footnotes and field instructions are skipped.

use crate::error::ConvertError;
use crate::format::Format;
use crate::pipeline::postprocess::clean_extracted_text;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Extract the raw text of a Word document. `format` is the declared input
/// format and only used in error messages.
pub fn extract_text(bytes: &[u8], format: Format) -> Result<String, ConvertError> {
    let raw = if bytes.starts_with(ZIP_MAGIC) {
        debug!("Word input is an OOXML package");
        docx_text(bytes, format)?
    } else if bytes.starts_with(OLE_MAGIC) {
        debug!("Word input is a legacy compound file");
        legacy_text(bytes, format)?
    } else {
        return Err(ConvertError::decode(
            format,
            "not a Word document (neither DOCX nor OLE container)",
        ));
    };
    Ok(clean_extracted_text(&raw))
}

// ── DOCX ─────────────────────────────────────────────────────────────────────

fn docx_text(bytes: &[u8], format: Format) -> Result<String, ConvertError> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| ConvertError::decode(format, e))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ConvertError::decode(format, format!("word/document.xml: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| ConvertError::decode(format, e))?;
    document_xml_text(&xml).map_err(|e| ConvertError::decode(format, e))
}

/// Walk `word/document.xml`: `<w:t>` contributes text, `<w:tab/>` a tab,
/// `<w:br/>`/`<w:cr/>` a newline, and each paragraph ends with a newline.
fn document_xml_text(xml: &str) -> Result<String, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_run = false;
    let mut in_text = false;
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"r" => in_run = true,
                b"t" => in_text = true,
                b"tab" if in_run => out.push('\t'),
                b"br" | b"cr" if in_run => out.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" if in_run => out.push('\t'),
                b"br" | b"cr" if in_run => out.push('\n'),
                b"p" => out.push('\n'),
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"r" => in_run = false,
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => out.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}

/// A minimal DOCX package holding `text` as a single paragraph. Lines are
/// separated by `<w:br/>`, tabs become `<w:tab/>` and form feeds become page
/// breaks. Other characters that XML 1.0 forbids are dropped.
pub fn write_docx(text: &str) -> Result<Vec<u8>, ConvertError> {
    let mut body = String::with_capacity(text.len() * 2);
    if text.is_empty() {
        body.push_str("<w:p/>");
    } else {
        body.push_str("<w:p><w:r>");
        for (n, line) in text.split('\n').enumerate() {
            if n > 0 {
                body.push_str("<w:br/>");
            }
            let mut run = String::new();
            for c in line.chars() {
                let marker = match c {
                    '\t' => "<w:tab/>",
                    '\u{0C}' => "<w:br w:type=\"page\"/>",
                    c if is_xml_char(c) => {
                        run.push(c);
                        continue;
                    }
                    _ => continue,
                };
                push_text_run(&mut body, &mut run);
                body.push_str(marker);
            }
            push_text_run(&mut body, &mut run);
        }
        body.push_str("</w:r></w:p>");
    }
    let document = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
         <w:body>{body}<w:sectPr/></w:body></w:document>"
    );

    let parts: [(&str, &str); 4] = [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", PACKAGE_RELS),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS),
        ("word/document.xml", &document),
    ];
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in parts {
        zip.start_file(name, options)
            .map_err(|e| ConvertError::encode(Format::Docx, e))?;
        zip.write_all(content.as_bytes())
            .map_err(|e| ConvertError::encode(Format::Docx, e))?;
    }
    let cursor = zip
        .finish()
        .map_err(|e| ConvertError::encode(Format::Docx, e))?;
    Ok(cursor.into_inner())
}

fn push_text_run(body: &mut String, run: &mut String) {
    if !run.is_empty() {
        body.push_str(&format!(
            "<w:t xml:space=\"preserve\">{}</w:t>",
            escape(run.as_str())
        ));
        run.clear();
    }
}

/// Characters allowed in XML 1.0 content, except CR.
fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
    )
}

const CONTENT_TYPES: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
<Default Extension=\"xml\" ContentType=\"application/xml\"/>\
<Override PartName=\"/word/document.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>\
</Types>";

const PACKAGE_RELS: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"word/document.xml\"/>\
</Relationships>";

const DOCUMENT_RELS: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\"/>";

// ── Legacy .doc ──────────────────────────────────────────────────────────────

const FIB_BASE_LEN: usize = 32;
const FLAG_ENCRYPTED: u16 = 0x0100;
const FLAG_WHICH_TABLE: u16 = 0x0200;
/// Index of the fcClx/lcbClx pair within FibRgFcLcb97.
const CLX_PAIR: usize = 33;
const COMPRESSED_BIT: u32 = 0x4000_0000;

fn legacy_text(bytes: &[u8], format: Format) -> Result<String, ConvertError> {
    let fail = |detail: String| ConvertError::decode(format, detail);
    let mut comp =
        cfb::CompoundFile::open(Cursor::new(bytes)).map_err(|e| fail(e.to_string()))?;
    let word = read_stream(&mut comp, "/WordDocument").map_err(fail)?;

    let flags = le_u16(&word, 0x0A).ok_or_else(|| fail("FIB truncated".into()))?;
    if flags & FLAG_ENCRYPTED != 0 {
        return Err(fail("document is encrypted".into()));
    }
    let table_name = if flags & FLAG_WHICH_TABLE != 0 {
        "/1Table"
    } else {
        "/0Table"
    };

    let fib = Fib::parse(&word).ok_or_else(|| fail("FIB truncated".into()))?;
    let table = read_stream(&mut comp, table_name).map_err(fail)?;
    let clx = table
        .get(fib.fc_clx..fib.fc_clx + fib.lcb_clx)
        .ok_or_else(|| fail("piece table lies outside the table stream".into()))?;
    let pieces = parse_piece_table(clx).ok_or_else(|| fail("malformed piece table".into()))?;
    debug!(
        "Legacy .doc: {} pieces, {} main-text characters",
        pieces.len(),
        fib.ccp_text
    );

    let mut units = Vec::with_capacity(fib.ccp_text);
    for piece in pieces {
        if piece.cp_start >= fib.ccp_text {
            break;
        }
        let count = piece.cp_end.min(fib.ccp_text).saturating_sub(piece.cp_start);
        if piece.compressed {
            let slice = word
                .get(piece.offset..piece.offset + count)
                .ok_or_else(|| fail("text piece out of range".into()))?;
            units.extend(slice.iter().map(|&b| cp1252(b)));
        } else {
            let slice = word
                .get(piece.offset..piece.offset + count * 2)
                .ok_or_else(|| fail("text piece out of range".into()))?;
            let wide: Vec<u16> = slice
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .collect();
            units.extend(char::decode_utf16(wide).map(|r| r.unwrap_or('\u{FFFD}')));
        }
    }
    Ok(strip_control_marks(units))
}

fn read_stream<F: Read + std::io::Seek>(
    comp: &mut cfb::CompoundFile<F>,
    path: &str,
) -> Result<Vec<u8>, String> {
    let mut stream = comp.open_stream(path).map_err(|e| format!("{path}: {e}"))?;
    let mut buf = Vec::new();
    stream
        .read_to_end(&mut buf)
        .map_err(|e| format!("{path}: {e}"))?;
    Ok(buf)
}

struct Fib {
    ccp_text: usize,
    fc_clx: usize,
    lcb_clx: usize,
}

impl Fib {
    /// FibBase, then three length-prefixed arrays: fibRgW (u16s), fibRgLw
    /// (u32s, ccpText is the fourth) and fibRgFcLcb (u32 pairs).
    fn parse(word: &[u8]) -> Option<Self> {
        let mut pos = FIB_BASE_LEN;
        let csw = le_u16(word, pos)? as usize;
        pos += 2 + csw * 2;
        let cslw = le_u16(word, pos)? as usize;
        pos += 2;
        let ccp_text = le_u32(word, pos + 3 * 4)? as usize;
        pos += cslw * 4;
        let pairs = le_u16(word, pos)? as usize;
        pos += 2;
        if pairs <= CLX_PAIR {
            return None;
        }
        let fc_clx = le_u32(word, pos + CLX_PAIR * 8)? as usize;
        let lcb_clx = le_u32(word, pos + CLX_PAIR * 8 + 4)? as usize;
        Some(Self {
            ccp_text,
            fc_clx,
            lcb_clx,
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Piece {
    cp_start: usize,
    cp_end: usize,
    offset: usize,
    compressed: bool,
}

/// Skip `Prc` property blocks (0x01) and decode the `Pcdt` (0x02) that
/// follows: n+1 character positions then n 8-byte piece descriptors.
fn parse_piece_table(clx: &[u8]) -> Option<Vec<Piece>> {
    let mut i = 0;
    while i < clx.len() {
        match clx[i] {
            0x01 => i += 3 + le_u16(clx, i + 1)? as usize,
            0x02 => {
                let lcb = le_u32(clx, i + 1)? as usize;
                let plc = clx.get(i + 5..i + 5 + lcb)?;
                if lcb < 4 || (lcb - 4) % 12 != 0 {
                    return None;
                }
                let n = (lcb - 4) / 12;
                let descriptors = (n + 1) * 4;
                return (0..n)
                    .map(|k| {
                        let fc = le_u32(plc, descriptors + k * 8 + 2)?;
                        let compressed = fc & COMPRESSED_BIT != 0;
                        let raw = (fc & !COMPRESSED_BIT) as usize;
                        Some(Piece {
                            cp_start: le_u32(plc, k * 4)? as usize,
                            cp_end: le_u32(plc, (k + 1) * 4)? as usize,
                            offset: if compressed { raw / 2 } else { raw },
                            compressed,
                        })
                    })
                    .collect();
            }
            _ => return None,
        }
    }
    None
}

/// Map Word's in-band control characters to text and drop field codes.
fn strip_control_marks(units: Vec<char>) -> String {
    let mut out = String::with_capacity(units.len());
    // One entry per open field: true while inside its instruction part.
    let mut fields: Vec<bool> = Vec::new();
    for c in units {
        match c {
            '\u{13}' => fields.push(true),
            '\u{14}' => {
                if let Some(top) = fields.last_mut() {
                    *top = false;
                }
            }
            '\u{15}' => {
                fields.pop();
            }
            _ if fields.iter().any(|&instr| instr) => {}
            '\r' | '\u{0B}' | '\u{0C}' => out.push('\n'),
            '\u{07}' => out.push('\t'),
            '\u{1E}' => out.push('-'),
            '\t' => out.push('\t'),
            c if (c as u32) < 0x20 => {}
            c => out.push(c),
        }
    }
    out
}

fn cp1252(b: u8) -> char {
    const HIGH: [char; 32] = [
        '€', '\u{81}', '‚', 'ƒ', '„', '…', '†', '‡', 'ˆ', '‰', 'Š', '‹', 'Œ', '\u{8D}', 'Ž',
        '\u{8F}', '\u{90}', '‘', '’', '“', '”', '•', '–', '—', '˜', '™', 'š', '›', 'œ', '\u{9D}',
        'ž', 'Ÿ',
    ];
    match b {
        0x80..=0x9F => HIGH[(b - 0x80) as usize],
        _ => b as char,
    }
}

fn le_u16(buf: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_le_bytes(buf.get(at..at + 2)?.try_into().ok()?))
}

fn le_u32(buf: &[u8], at: usize) -> Option<u32> {
    Some(u32::from_le_bytes(buf.get(at..at + 4)?.try_into().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a minimal Word 97 compound file holding `text` as one
    /// Windows-1252 piece.
    fn legacy_doc(text: &[u8]) -> Vec<u8> {
        const TEXT_AT: usize = 0x800;
        let mut word = vec![0u8; TEXT_AT];
        word[0..2].copy_from_slice(&0xA5ECu16.to_le_bytes());
        word[0x0A..0x0C].copy_from_slice(&FLAG_WHICH_TABLE.to_le_bytes());
        let mut pos = FIB_BASE_LEN;
        word[pos..pos + 2].copy_from_slice(&14u16.to_le_bytes());
        pos += 2 + 28;
        word[pos..pos + 2].copy_from_slice(&22u16.to_le_bytes());
        pos += 2;
        word[pos + 12..pos + 16].copy_from_slice(&(text.len() as u32).to_le_bytes());
        pos += 88;
        word[pos..pos + 2].copy_from_slice(&93u16.to_le_bytes());
        pos += 2;
        let clx_at = pos + CLX_PAIR * 8;
        word[clx_at..clx_at + 4].copy_from_slice(&0u32.to_le_bytes());
        word[clx_at + 4..clx_at + 8].copy_from_slice(&21u32.to_le_bytes());
        word.extend_from_slice(text);

        let mut clx = vec![0x02];
        clx.extend_from_slice(&16u32.to_le_bytes());
        clx.extend_from_slice(&0u32.to_le_bytes());
        clx.extend_from_slice(&(text.len() as u32).to_le_bytes());
        clx.extend_from_slice(&[0, 0]);
        clx.extend_from_slice(&(((TEXT_AT * 2) as u32) | COMPRESSED_BIT).to_le_bytes());
        clx.extend_from_slice(&[0, 0]);

        let mut comp = cfb::CompoundFile::create(Cursor::new(Vec::new())).unwrap();
        comp.create_stream("/WordDocument")
            .unwrap()
            .write_all(&word)
            .unwrap();
        comp.create_stream("/1Table").unwrap().write_all(&clx).unwrap();
        comp.flush().unwrap();
        comp.into_inner().into_inner()
    }

    #[test]
    fn docx_round_trip() {
        let bytes = write_docx("Hello <world>\n\nsecond\tcol").unwrap();
        assert!(bytes.starts_with(ZIP_MAGIC));
        assert_eq!(
            extract_text(&bytes, Format::Docx).unwrap(),
            "Hello <world>\n\nsecond\tcol"
        );
    }

    #[test]
    fn docx_is_one_paragraph() {
        let bytes = write_docx("a\nb\nc").unwrap();
        let mut xml = String::new();
        ZipArchive::new(Cursor::new(bytes))
            .unwrap()
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        assert_eq!(xml.matches("<w:p>").count(), 1);
        assert_eq!(xml.matches("<w:br/>").count(), 2);
    }

    #[test]
    fn docx_form_feed_is_page_break() {
        let bytes = write_docx("page one\u{0C}page two\u{0}\u{1B}!\r\nnext").unwrap();
        let mut xml = String::new();
        ZipArchive::new(Cursor::new(&bytes))
            .unwrap()
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        assert!(xml.contains("page one</w:t><w:br w:type=\"page\"/>"), "got: {xml}");
        let body = &xml[xml.find("<w:body>").unwrap()..];
        assert!(!body.chars().any(|c| c < ' '), "control character in {body:?}");
        assert_eq!(
            extract_text(&bytes, Format::Docx).unwrap(),
            "page one\npage two!\nnext"
        );
    }

    #[test]
    fn document_xml_ignores_tab_stops() {
        let xml = r#"<w:document xmlns:w="x"><w:body><w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t>a</w:t><w:br/><w:t>b</w:t></w:r></w:p></w:body></w:document>"#;
        assert_eq!(document_xml_text(xml).unwrap(), "a\nb\n");
    }

    #[test]
    fn legacy_doc_text() {
        let bytes = legacy_doc(b"Title\rBody \x93quoted\x94\x07cell\r");
        assert!(bytes.starts_with(OLE_MAGIC));
        assert_eq!(
            extract_text(&bytes, Format::Doc).unwrap(),
            "Title\nBody \u{201C}quoted\u{201D}\tcell"
        );
    }

    #[test]
    fn legacy_doc_skips_field_instructions() {
        let bytes = legacy_doc(b"see \x13 HYPERLINK \"x\" \x14here\x15 now\r");
        assert_eq!(extract_text(&bytes, Format::Doc).unwrap(), "see here now");
    }

    #[test]
    fn piece_table_with_prc_prefix() {
        let mut clx = vec![0x01, 0x02, 0x00, 0xAA, 0xBB];
        clx.push(0x02);
        clx.extend_from_slice(&16u32.to_le_bytes());
        clx.extend_from_slice(&0u32.to_le_bytes());
        clx.extend_from_slice(&5u32.to_le_bytes());
        clx.extend_from_slice(&[0, 0]);
        clx.extend_from_slice(&0x400u32.to_le_bytes());
        clx.extend_from_slice(&[0, 0]);
        assert_eq!(
            parse_piece_table(&clx).unwrap(),
            vec![Piece {
                cp_start: 0,
                cp_end: 5,
                offset: 0x400,
                compressed: false
            }]
        );
    }

    #[test]
    fn unknown_container_is_decode_error() {
        let err = extract_text(b"plain text", Format::Docx).unwrap_err();
        assert!(matches!(err, ConvertError::Decode { format: Format::Docx, .. }));
    }
}
