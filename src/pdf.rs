//! Minimal single-page PDF writer.
//!
//! The page holds one RGB raster (flate compressed) and a title line set in
//! the built-in Helvetica font, so no font data needs to be embedded.

use eyre::Result;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

use crate::heatmap::Raster;

const MARGIN: f64 = 36.0;
const TITLE_BAND: f64 = 40.0;
const TITLE_SIZE: f64 = 14.0;

/// Builds the bytes of a one-page PDF showing `raster` under `title`.
/// One raster pixel maps to one point.
pub fn render_pdf(raster: &Raster, title: &str) -> Result<Vec<u8>> {
    let img_w = raster.width as f64;
    let img_h = raster.height as f64;
    let page_w = img_w + 2.0 * MARGIN;
    let page_h = img_h + 2.0 * MARGIN + TITLE_BAND;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raster.pixels)?;
    let image_data = encoder.finish()?;

    let title = escape_text(title);
    // Helvetica averages roughly half an em per glyph.
    let title_w = title.chars().count() as f64 * TITLE_SIZE * 0.5;
    let title_x = ((page_w - title_w) / 2.0).max(MARGIN);
    let title_y = page_h - MARGIN - TITLE_SIZE;
    let content = format!(
        "q\n{img_w} 0 0 {img_h} {MARGIN} {MARGIN} cm\n/Im1 Do\nQ\n\
         BT\n/F1 {TITLE_SIZE} Tf\n{title_x:.2} {title_y:.2} Td\n({title}) Tj\nET\n"
    );

    let objects: Vec<Vec<u8>> = vec![
        b"<< /Type /Catalog /Pages 2 0 R >>".to_vec(),
        b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_vec(),
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {page_w} {page_h}] \
             /Resources << /Font << /F1 4 0 R >> /XObject << /Im1 5 0 R >> >> \
             /Contents 6 0 R >>"
        )
        .into_bytes(),
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_vec(),
        stream(
            &format!(
                "<< /Type /XObject /Subtype /Image /Width {} /Height {} \
                 /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /FlateDecode \
                 /Length {} >>",
                raster.width,
                raster.height,
                image_data.len()
            ),
            &image_data,
        ),
        stream(
            &format!("<< /Length {} >>", content.len()),
            content.as_bytes(),
        ),
    ];

    let mut out = b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        write!(out, "{} 0 obj\n", i + 1)?;
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref = out.len();
    write!(out, "xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1)?;
    for offset in offsets {
        write!(out, "{offset:010} 00000 n \n")?;
    }
    write!(
        out,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
        objects.len() + 1
    )?;
    Ok(out)
}

fn stream(dict: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(dict.len() + data.len() + 32);
    body.extend_from_slice(dict.as_bytes());
    body.extend_from_slice(b"\nstream\n");
    body.extend_from_slice(data);
    body.extend_from_slice(b"\nendstream");
    body
}

/// Escapes a string for a PDF literal. Characters outside printable ASCII
/// become `?`.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '(' | ')' => {
                out.push('\\');
                out.push(c);
            }
            ' '..='~' => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}
