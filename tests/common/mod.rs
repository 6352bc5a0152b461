//! Shared fixtures: hand-assembled PDF files with exact cross-reference offsets.

#![allow(dead_code)]

use std::fmt::Write as _;

/// Assembles a PDF file body object by object and appends a matching
/// cross-reference section.
pub struct PdfBuilder {
    version: String,
    objects: Vec<(u32, Vec<u8>)>,
    trailer: String,
}

impl Default for PdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self {
            version: "1.7".to_string(),
            objects: Vec::new(),
            trailer: "/Root 1 0 R".to_string(),
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    /// Extra trailer entries, written after `/Root 1 0 R`.
    pub fn trailer(mut self, extra: &str) -> Self {
        self.trailer.push(' ');
        self.trailer.push_str(extra);
        self
    }

    /// `id 0 obj body endobj`
    pub fn object(mut self, id: u32, body: &str) -> Self {
        self.objects.push((id, body.as_bytes().to_vec()));
        self
    }

    /// Stream object with a direct `/Length`.
    pub fn stream(mut self, id: u32, dict: &str, data: &[u8]) -> Self {
        let mut body = format!("<< {} /Length {} >>\nstream\n", dict, data.len()).into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(b"\nendstream");
        self.objects.push((id, body));
        self
    }

    /// Object with arbitrary raw bytes between `obj` and `endobj`.
    pub fn raw(mut self, id: u32, body: &[u8]) -> Self {
        self.objects.push((id, body.to_vec()));
        self
    }

    fn body(&self) -> (Vec<u8>, Vec<(u32, usize)>) {
        let mut out = format!("%PDF-{}\n%\u{e2}\u{e3}\n", self.version).into_bytes();
        let mut offsets = Vec::new();
        for (id, body) in &self.objects {
            offsets.push((*id, out.len()));
            out.extend_from_slice(format!("{} 0 obj\n", id).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }
        (out, offsets)
    }

    /// File with a classic cross-reference table.
    pub fn build(&self) -> Vec<u8> {
        let (mut out, offsets) = self.body();
        let size = offsets.iter().map(|(id, _)| *id).max().unwrap_or(0) + 1;
        let xref = out.len();
        out.extend_from_slice(&classic_xref(&offsets, size));
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} {} >>\nstartxref\n{}\n%%EOF\n",
                size, self.trailer, xref
            )
            .as_bytes(),
        );
        out
    }

    /// File with a cross-reference stream. Objects listed in `packed` are stored
    /// in an object stream numbered `container` instead of the body.
    pub fn build_with_object_stream(&self, packed: &[u32], container: u32) -> Vec<u8> {
        let kept = PdfBuilder {
            version: self.version.clone(),
            objects: self
                .objects
                .iter()
                .filter(|(id, _)| !packed.contains(id))
                .cloned()
                .collect(),
            trailer: self.trailer.clone(),
        };

        let mut header = String::new();
        let mut payload = Vec::new();
        let mut index = Vec::new();
        for (i, id) in packed.iter().enumerate() {
            let (_, body) = self
                .objects
                .iter()
                .find(|(oid, _)| oid == id)
                .expect("packed object exists");
            write!(header, "{} {} ", id, payload.len()).unwrap();
            payload.extend_from_slice(body);
            payload.push(b' ');
            index.push((*id, i));
        }
        let mut data = header.clone().into_bytes();
        data.extend_from_slice(&payload);
        let kept = kept.stream(
            container,
            &format!("/Type /ObjStm /N {} /First {}", packed.len(), header.len()),
            &data,
        );

        let (mut out, offsets) = kept.body();
        let xref_id = offsets
            .iter()
            .map(|(id, _)| *id)
            .chain(packed.iter().copied())
            .max()
            .unwrap_or(0)
            + 1;
        let size = xref_id + 1;
        let xref_offset = out.len();

        let mut rows = Vec::new();
        for id in 0..size {
            let row: (u8, u32, u16) = if id == xref_id {
                (1, xref_offset as u32, 0)
            } else if let Some((_, off)) = offsets.iter().find(|(oid, _)| *oid == id) {
                (1, *off as u32, 0)
            } else if let Some((_, i)) = index.iter().find(|(oid, _)| *oid == id) {
                (2, container, *i as u16)
            } else {
                (0, 0, if id == 0 { 65535 } else { 0 })
            };
            rows.push(row.0);
            rows.extend_from_slice(&row.1.to_be_bytes());
            rows.extend_from_slice(&row.2.to_be_bytes());
        }

        out.extend_from_slice(
            format!(
                "{} 0 obj\n<< /Type /XRef /Size {} /W [1 4 2] {} /Length {} >>\nstream\n",
                xref_id,
                size,
                self.trailer,
                rows.len()
            )
            .as_bytes(),
        );
        out.extend_from_slice(&rows);
        out.extend_from_slice(b"\nendstream\nendobj\n");
        out.extend_from_slice(format!("startxref\n{}\n%%EOF\n", xref_offset).as_bytes());
        out
    }
}

/// `xref` keyword plus one subsection covering `0..size`.
pub fn classic_xref(offsets: &[(u32, usize)], size: u32) -> Vec<u8> {
    let mut out = format!("xref\n0 {}\n", size);
    for id in 0..size {
        match offsets.iter().find(|(oid, _)| *oid == id) {
            Some((_, off)) => writeln!(out, "{:010} 00000 n ", off).unwrap(),
            None if id == 0 => out.push_str("0000000000 65535 f \n"),
            None => out.push_str("0000000000 00000 f \n"),
        }
    }
    out.into_bytes()
}

/// Catalog, one flat Pages node and `n` pages whose content streams read "page i".
pub fn simple_pdf(n: usize) -> PdfBuilder {
    let kids: Vec<String> = (0..n).map(|i| format!("{} 0 R", 3 + 2 * i)).collect();
    let mut builder = PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(
            2,
            &format!(
                "<< /Type /Pages /Kids [{}] /Count {} /MediaBox [0 0 612 792] >>",
                kids.join(" "),
                n
            ),
        );
    for i in 0..n {
        let page = 3 + 2 * i as u32;
        builder = builder
            .object(
                page,
                &format!("<< /Type /Page /Parent 2 0 R /Contents {} 0 R >>", page + 1),
            )
            .stream(page + 1, "", format!("page {}", i + 1).as_bytes());
    }
    builder
}

/// Two-level tree. The root carries `/Resources`, `/MediaBox` and `/Rotate 90`,
/// the inner node overrides `/MediaBox`, and page 3 overrides `/Rotate`.
///
/// ```text
/// 2 Pages (Resources 10, MediaBox letter, Rotate 90)
/// ├── 3 Pages (MediaBox A4)
/// │   ├── 4 Page "page 1"
/// │   └── 5 Page "page 2"
/// └── 6 Page "page 3" (Rotate 180)
/// ```
pub fn nested_pdf() -> PdfBuilder {
    PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(
            2,
            "<< /Type /Pages /Kids [3 0 R 6 0 R] /Count 3 /Resources 10 0 R \
             /MediaBox [0 0 612 792] /Rotate 90 >>",
        )
        .object(
            3,
            "<< /Type /Pages /Parent 2 0 R /Kids [4 0 R 5 0 R] /Count 2 /MediaBox [0 0 595 842] >>",
        )
        .object(4, "<< /Type /Page /Parent 3 0 R /Contents 7 0 R >>")
        .object(5, "<< /Type /Page /Parent 3 0 R /Contents 8 0 R >>")
        .object(6, "<< /Type /Page /Parent 2 0 R /Contents 9 0 R /Rotate 180 >>")
        .stream(7, "", b"page 1")
        .stream(8, "", b"page 2")
        .stream(9, "", b"page 3")
        .object(10, "<< /Font << /F1 11 0 R >> >>")
        .object(11, "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>")
}

/// `simple_pdf(2)` followed by an incremental update that replaces page 2's
/// content and adds an `/Info` dictionary.
pub fn incremental_pdf() -> Vec<u8> {
    let mut out = simple_pdf(2).build();
    let first_xref = find_last_startxref(&out);

    let content_offset = out.len();
    out.extend_from_slice(b"6 0 obj\n<< /Length 14 >>\nstream\npage 2 revised\nendstream\nendobj\n");
    let info_offset = out.len();
    out.extend_from_slice(b"7 0 obj\n<< /Title (Updated) >>\nendobj\n");

    let xref = out.len();
    let mut section = String::from("xref\n0 1\n0000000000 65535 f \n6 2\n");
    writeln!(section, "{:010} 00000 n ", content_offset).unwrap();
    writeln!(section, "{:010} 00000 n ", info_offset).unwrap();
    out.extend_from_slice(section.as_bytes());
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size 8 /Root 1 0 R /Info 7 0 R /Prev {} >>\nstartxref\n{}\n%%EOF\n",
            first_xref, xref
        )
        .as_bytes(),
    );
    out
}

fn find_last_startxref(data: &[u8]) -> usize {
    let pos = data
        .windows(9)
        .rposition(|w| w == b"startxref")
        .expect("startxref present");
    let tail = std::str::from_utf8(&data[pos + 9..]).expect("ascii tail");
    tail.split_whitespace()
        .next()
        .and_then(|s| s.parse().ok())
        .expect("startxref offset")
}

/// Content strings of every page, in page order.
pub fn page_contents(doc: &pdfh::Document) -> Vec<String> {
    let pages = pdfh::page_tree::flatten(doc).expect("flatten");
    pages
        .iter()
        .map(|page| {
            let dict = doc.objects.get_dict(page.reference).expect("page dict");
            let contents = dict
                .get("Contents")
                .and_then(pdfh::Object::as_reference)
                .expect("contents reference");
            let stream = doc
                .objects
                .get(contents)
                .and_then(pdfh::Object::as_stream)
                .expect("contents stream");
            String::from_utf8_lossy(stream.decoded().expect("decodable")).into_owned()
        })
        .collect()
}
