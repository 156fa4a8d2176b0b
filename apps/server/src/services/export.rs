//! Prescription slip rendering with `printpdf`.
//!
//! Fixed template: bordered page, clinic header, a two-row patient table, the
//! medication list, optional notes and a signature block. Page height grows
//! with the number of medication and note lines.

use printpdf::{BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point};
use std::io::BufWriter;

use crate::{config::ExportConfig, models::Prescription, Error, Result};

const PAGE_WIDTH: f32 = 148.0;
const BASE_HEIGHT: f32 = 170.0;
const MARGIN: f32 = 8.0;
const LINE_HEIGHT: f32 = 5.0;
const NOTE_LINE_HEIGHT: f32 = 4.5;
const WRAP_COLUMNS: usize = 70;

/// Rendered document and the attachment filename to serve it under.
#[derive(Debug, Clone)]
pub struct RenderedPdf {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// `Prescription_<patientName|id>.pdf` with non-filename characters replaced by `_`.
pub fn prescription_filename(patient_name: &str, code: &str) -> String {
    let base = if patient_name.trim().is_empty() {
        code
    } else {
        patient_name.trim()
    };
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("Prescription_{cleaned}.pdf")
}

/// Greedy word wrap on whitespace; overlong words are kept whole.
pub fn wrap_text(text: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if !current.is_empty() && current.len() + 1 + word.len() > columns {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    lines
}

/// Page height for the given number of medication and note lines.
pub fn page_height(medication_lines: usize, note_lines: usize) -> f32 {
    let notes_block = if note_lines > 0 {
        8.0 + note_lines as f32 * NOTE_LINE_HEIGHT
    } else {
        0.0
    };
    BASE_HEIGHT + medication_lines as f32 * LINE_HEIGHT + notes_block
}

fn stroke_rect(layer: &PdfLayerReference, x: f32, y: f32, w: f32, h: f32) {
    let line = Line {
        points: vec![
            (Point::new(Mm(x), Mm(y)), false),
            (Point::new(Mm(x + w), Mm(y)), false),
            (Point::new(Mm(x + w), Mm(y + h)), false),
            (Point::new(Mm(x), Mm(y + h)), false),
        ],
        is_closed: true,
    };
    layer.add_line(line);
}

fn rule(layer: &PdfLayerReference, x1: f32, x2: f32, y: f32) {
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(x1), Mm(y)), false),
            (Point::new(Mm(x2), Mm(y)), false),
        ],
        is_closed: false,
    });
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

pub fn render_prescription(
    prescription: &Prescription,
    code: &str,
    config: &ExportConfig,
) -> Result<RenderedPdf> {
    let medication_lines: Vec<String> = prescription
        .medications
        .iter()
        .enumerate()
        .map(|(i, med)| format!("{}. {}", i + 1, med.line()))
        .collect();
    let note_lines = prescription
        .notes
        .as_deref()
        .map(|n| wrap_text(n, WRAP_COLUMNS))
        .unwrap_or_default();

    let height = page_height(medication_lines.len(), note_lines.len());
    let title = format!("Prescription {code}");
    let (doc, page, layer) = PdfDocument::new(&title, Mm(PAGE_WIDTH), Mm(height), "Layer 1");
    let layer = doc.get_page(page).get_layer(layer);
    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| Error::Export(format!("PDF font error: {e}")))?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| Error::Export(format!("PDF font error: {e}")))?,
    };

    layer.set_outline_thickness(0.8);
    stroke_rect(
        &layer,
        MARGIN / 2.0,
        MARGIN / 2.0,
        PAGE_WIDTH - MARGIN,
        height - MARGIN,
    );
    layer.set_outline_thickness(0.3);

    let left = MARGIN + 4.0;
    let right = PAGE_WIDTH - MARGIN - 4.0;
    let mut y = height - MARGIN - 10.0;

    // Header
    let physician = prescription
        .prescribed_by
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(&config.default_physician);
    layer.use_text(physician, 14.0, Mm(left), Mm(y), &fonts.bold);
    y -= 6.0;
    layer.use_text(&config.clinic_name, 10.0, Mm(left), Mm(y), &fonts.regular);
    y -= LINE_HEIGHT;
    layer.use_text(&config.clinic_address, 9.0, Mm(left), Mm(y), &fonts.regular);
    y -= LINE_HEIGHT;
    if !config.clinic_contact.is_empty() {
        layer.use_text(&config.clinic_contact, 9.0, Mm(left), Mm(y), &fonts.regular);
        y -= LINE_HEIGHT;
    }
    y -= 2.0;
    rule(&layer, left, right, y);
    y -= 10.0;

    // Patient table: two rows, two columns
    let row_h = 9.0;
    let mid = left + (right - left) * 0.62;
    let table_top = y + 5.0;
    stroke_rect(&layer, left, table_top - 2.0 * row_h, right - left, 2.0 * row_h);
    rule(&layer, left, right, table_top - row_h);
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(mid), Mm(table_top)), false),
            (Point::new(Mm(mid), Mm(table_top - 2.0 * row_h)), false),
        ],
        is_closed: false,
    });

    let cell = |label: &str, value: &str, x: f32, y: f32| {
        layer.use_text(label, 8.0, Mm(x + 1.5), Mm(y), &fonts.bold);
        layer.use_text(value, 9.0, Mm(x + 17.0), Mm(y), &fonts.regular);
    };
    let age = prescription.age.map(|a| a.to_string()).unwrap_or_default();
    let gender = prescription
        .gender
        .map(|g| format!("{g:?}"))
        .unwrap_or_default();
    let date = prescription
        .date
        .map(|d| d.format("%B %-d, %Y").to_string())
        .unwrap_or_default();
    let first_row = table_top - row_h + 3.0;
    let second_row = table_top - 2.0 * row_h + 3.0;
    cell("Name:", &prescription.patient_name, left, first_row);
    cell("Date:", &date, mid, first_row);
    cell(
        "Address:",
        prescription.address.as_deref().unwrap_or(""),
        left,
        second_row,
    );
    cell("Age/Sex:", &format!("{age} / {gender}"), mid, second_row);
    y = table_top - 2.0 * row_h - 10.0;

    // Medications
    layer.use_text("Rx", 20.0, Mm(left), Mm(y), &fonts.bold);
    y -= 8.0;
    for line in &medication_lines {
        layer.use_text(line, 10.0, Mm(left + 4.0), Mm(y), &fonts.regular);
        y -= LINE_HEIGHT;
    }

    if !note_lines.is_empty() {
        y -= 4.0;
        layer.use_text("Notes:", 9.0, Mm(left), Mm(y), &fonts.bold);
        y -= NOTE_LINE_HEIGHT;
        for line in &note_lines {
            layer.use_text(line, 9.0, Mm(left + 4.0), Mm(y), &fonts.regular);
            y -= NOTE_LINE_HEIGHT;
        }
    }

    // Signature block anchored to the bottom of the page
    let sig_y = MARGIN + 22.0;
    let sig_left = right - 55.0;
    rule(&layer, sig_left, right, sig_y);
    layer.use_text(physician, 9.0, Mm(sig_left), Mm(sig_y - 4.5), &fonts.bold);
    let license = prescription
        .license_number
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(&config.default_license_number);
    if !license.is_empty() {
        layer.use_text(
            format!("License No.: {license}"),
            8.0,
            Mm(sig_left),
            Mm(sig_y - 9.0),
            &fonts.regular,
        );
    }
    layer.use_text(code, 7.0, Mm(left), Mm(MARGIN + 2.0), &fonts.regular);

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| Error::Export(format!("PDF save error: {e}")))?;
    let bytes = buf
        .into_inner()
        .map_err(|e| Error::Export(format!("PDF buffer error: {e}")))?;

    Ok(RenderedPdf {
        filename: prescription_filename(&prescription.patient_name, code),
        bytes,
    })
}
