//! Multi-page document export.
//!
//! Each page template is rasterized on its own (one page in memory at a time)
//! and the results are packed into a single zip document with a manifest.

use crate::error::{AppError, AppResult};
use crate::templates::{self, Block, Template};
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::Path;
use tracing::{debug, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const DOCUMENT_FORMAT: &str = "rapot-document-v1";
pub const MANIFEST_ENTRY: &str = "manifest.json";

pub const PROGRESS_START: u8 = 5;
pub const PROGRESS_FIRST_PAGE: u8 = 20;
pub const PROGRESS_LAST_PAGE: u8 = 75;
pub const PROGRESS_ASSEMBLED: u8 = 95;
pub const PROGRESS_DONE: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    /// A4 at 96 dpi, in CSS pixels.
    pub fn css_size(self) -> (u32, u32) {
        match self {
            Orientation::Portrait => (794, 1123),
            Orientation::Landscape => (1123, 794),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
    pub scale: f32,
}

impl Canvas {
    pub fn new(orientation: Orientation, scale: f32) -> Self {
        let (width, height) = orientation.css_size();
        Canvas {
            width,
            height,
            scale,
        }
    }

    pub fn pixel_size(&self) -> (u32, u32) {
        (
            (self.width as f32 * self.scale).round() as u32,
            (self.height as f32 * self.scale).round() as u32,
        )
    }
}

/// Turns a template into page bytes. The built-in implementation emits SVG;
/// a front end may plug in a real raster backend.
pub trait Rasterizer {
    fn extension(&self) -> &'static str;
    fn rasterize(&self, template: &Template, canvas: &Canvas) -> AppResult<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Teacher,
    Student,
}

impl Audience {
    pub fn parse(raw: Option<&str>) -> AppResult<Self> {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            None | Some("teacher") => Ok(Audience::Teacher),
            Some("student") => Ok(Audience::Student),
            Some(other) => Err(AppError::BadParams(format!(
                "audience must be teacher or student, got {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageSpec {
    pub template_id: String,
    pub orientation: Orientation,
}

/// Teacher copies open with a landscape certificate; student copies are all portrait.
pub fn report_layout(report_id: &str, audience: Audience) -> Vec<PageSpec> {
    let first = match audience {
        Audience::Teacher => Orientation::Landscape,
        Audience::Student => Orientation::Portrait,
    };
    vec![
        PageSpec {
            template_id: templates::certificate_id(report_id),
            orientation: first,
        },
        PageSpec {
            template_id: templates::transcript_id(report_id),
            orientation: Orientation::Portrait,
        },
        PageSpec {
            template_id: templates::milestone_id(report_id),
            orientation: Orientation::Portrait,
        },
    ]
}

pub fn receipt_layout(payment_id: &str) -> Vec<PageSpec> {
    vec![PageSpec {
        template_id: templates::receipt_id(payment_id),
        orientation: Orientation::Portrait,
    }]
}

pub fn slug(raw: &str) -> String {
    let mut out = String::new();
    for ch in raw.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    let trimmed = out.trim_end_matches('-');
    if trimmed.is_empty() {
        "student".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn report_file_name(student_name: &str, report_id: &str) -> String {
    format!("report-{}-{}.zip", slug(student_name), report_id)
}

pub fn receipt_file_name(student_name: &str, payment_id: &str) -> String {
    format!("receipt-{}-{}.zip", slug(student_name), payment_id)
}

/// Coarse progress after `done` of `total` pages; UI feedback only.
pub fn page_progress(done: usize, total: usize) -> u8 {
    if total <= 1 {
        return PROGRESS_LAST_PAGE;
    }
    let done = done.clamp(1, total);
    let span = (PROGRESS_LAST_PAGE - PROGRESS_FIRST_PAGE) as usize;
    (PROGRESS_FIRST_PAGE as usize + span * (done - 1) / (total - 1)) as u8
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedPage {
    pub index: usize,
    pub template_id: String,
    pub orientation: Orientation,
    pub width_px: u32,
    pub height_px: u32,
    pub file: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub file_name: String,
    pub path: String,
    pub pages: Vec<RenderedPage>,
    pub skipped: Vec<String>,
    pub progress: Vec<u8>,
}

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Renders `layout` page by page and writes the assembled document to
/// `out_path`. Pages whose template is missing are skipped and reported; the
/// export only fails when nothing could be rendered.
pub fn export_document<R: Rasterizer + ?Sized>(
    rasterizer: &R,
    templates: &HashMap<String, Template>,
    layout: &[PageSpec],
    scale: f32,
    out_path: &Path,
    mut on_progress: impl FnMut(u8),
) -> AppResult<ExportSummary> {
    let mut progress = vec![PROGRESS_START];
    on_progress(PROGRESS_START);

    let mut pages: Vec<(RenderedPage, Vec<u8>)> = Vec::new();
    let mut skipped = Vec::new();
    for (i, spec) in layout.iter().enumerate() {
        match templates.get(&spec.template_id) {
            None => {
                warn!(template = %spec.template_id, "template missing; page skipped");
                skipped.push(spec.template_id.clone());
            }
            Some(template) => {
                let canvas = Canvas::new(spec.orientation, scale);
                let bytes = rasterizer.rasterize(template, &canvas)?;
                let (width_px, height_px) = canvas.pixel_size();
                let index = pages.len() + 1;
                pages.push((
                    RenderedPage {
                        index,
                        template_id: spec.template_id.clone(),
                        orientation: spec.orientation,
                        width_px,
                        height_px,
                        file: format!("pages/{:03}.{}", index, rasterizer.extension()),
                        sha256: sha256_hex(&bytes),
                    },
                    bytes,
                ));
            }
        }
        let p = page_progress(i + 1, layout.len());
        progress.push(p);
        on_progress(p);
        debug!(page = i + 1, total = layout.len(), progress = p, "page processed");
    }

    if pages.is_empty() {
        return Err(AppError::Render("no page could be rendered".to_string()));
    }

    let manifest = json!({
        "format": DOCUMENT_FORMAT,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "pages": pages.iter().map(|(p, _)| p).collect::<Vec<_>>(),
        "skipped": skipped,
    });
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(MANIFEST_ENTRY, opts)?;
    zip.write_all(serde_json::to_string_pretty(&manifest)?.as_bytes())?;
    for (page, bytes) in &pages {
        zip.start_file(page.file.as_str(), opts)?;
        zip.write_all(bytes)?;
    }
    let assembled = zip.finish()?.into_inner();
    progress.push(PROGRESS_ASSEMBLED);
    on_progress(PROGRESS_ASSEMBLED);

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(out_path, &assembled)?;
    progress.push(PROGRESS_DONE);
    on_progress(PROGRESS_DONE);

    Ok(ExportSummary {
        file_name: out_path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default(),
        path: out_path.to_string_lossy().to_string(),
        pages: pages.into_iter().map(|(p, _)| p).collect(),
        skipped,
        progress,
    })
}

const MARGIN: f32 = 56.0;

fn xml_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Lays blocks out top to bottom on a fixed-size SVG page. Content that runs
/// past the bottom margin is cut off.
#[derive(Debug, Default, Clone, Copy)]
pub struct SvgRasterizer;

impl SvgRasterizer {
    fn text(out: &mut String, x: f32, y: f32, size: u32, weight: &str, anchor: &str, body: &str) {
        out.push_str(&format!(
            "<text x=\"{x:.0}\" y=\"{y:.0}\" font-size=\"{size}\" font-weight=\"{weight}\" text-anchor=\"{anchor}\">{}</text>\n",
            xml_escape(body)
        ));
    }
}

impl Rasterizer for SvgRasterizer {
    fn extension(&self) -> &'static str {
        "svg"
    }

    fn rasterize(&self, template: &Template, canvas: &Canvas) -> AppResult<Vec<u8>> {
        let (px_w, px_h) = canvas.pixel_size();
        if px_w == 0 || px_h == 0 {
            return Err(AppError::Render(format!(
                "empty canvas for {}",
                template.id
            )));
        }
        let w = canvas.width as f32;
        let bottom = canvas.height as f32 - MARGIN;
        let mut body = String::new();
        let mut y = MARGIN;

        for block in &template.blocks {
            if y > bottom {
                break;
            }
            match block {
                Block::Title(t) => {
                    y += 32.0;
                    Self::text(&mut body, w / 2.0, y, 28, "bold", "middle", t);
                    y += 16.0;
                }
                Block::Heading(t) => {
                    y += 26.0;
                    Self::text(&mut body, MARGIN, y, 20, "bold", "start", t);
                    y += 8.0;
                }
                Block::Line(t) => {
                    y += 22.0;
                    Self::text(&mut body, MARGIN, y, 14, "normal", "start", t);
                }
                Block::Spacer => y += 18.0,
                Block::Table { headers, rows } => {
                    let cols = headers.len().max(1) as f32;
                    let col_w = (w - 2.0 * MARGIN) / cols;
                    y += 24.0;
                    for (c, h) in headers.iter().enumerate() {
                        Self::text(&mut body, MARGIN + c as f32 * col_w, y, 14, "bold", "start", h);
                    }
                    for row in rows {
                        y += 20.0;
                        if y > bottom {
                            break;
                        }
                        for (c, cell) in row.iter().enumerate() {
                            Self::text(&mut body, MARGIN + c as f32 * col_w, y, 13, "normal", "start", cell);
                        }
                    }
                    y += 6.0;
                }
            }
        }

        let svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{px_w}\" height=\"{px_h}\" viewBox=\"0 0 {} {}\" data-template=\"{}\">\n<rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n{body}</svg>\n",
            canvas.width,
            canvas.height,
            xml_escape(&template.id),
        );
        Ok(svg.into_bytes())
    }
}
