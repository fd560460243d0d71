use image::{DynamicImage, GenericImageView};
use printpdf::{
    BuiltinFont, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference,
};
use std::io::BufWriter;
use std::path::Path;

use crate::prelude::{StageError, StageResult};
use crate::report::publish::publish_atomically;
use crate::report::ReportBundle;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const LEFT: f32 = 15.0;
const TOP: f32 = 280.0;
const BOTTOM: f32 = 20.0;
const ROW_HEIGHT: f32 = 6.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * LEFT;
const PREVIEW_MAX_HEIGHT: f32 = 110.0;
const CHART_MAX_HEIGHT: f32 = 100.0;
const IMAGE_DPI: f32 = 300.0;

/// Lays out the PDF report for one bundle.
pub struct DocumentBuilder {
    title: String,
}

impl DocumentBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    /// Builds the report at `dest`.
    ///
    /// Both images are checked and decoded before anything is written, and
    /// the file is published only once the whole document rendered.
    pub fn build(&self, bundle: &ReportBundle<'_>, dest: &Path) -> StageResult<()> {
        let preview = load_image(bundle.preview)?;
        let chart = load_image(bundle.chart)?;

        let (doc, page, layer) = PdfDocument::new(
            self.title.as_str(),
            Mm(PAGE_WIDTH),
            Mm(PAGE_HEIGHT),
            "Layer 1",
        );
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(render_error)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(render_error)?;

        let mut cursor = Cursor {
            doc: &doc,
            layer: doc.get_page(page).get_layer(layer),
            y: TOP,
            pages: 1,
        };

        cursor.text(&self.title, 18.0, &bold);
        cursor.gap(4.0);
        cursor.text(
            &format!(
                "Processing time: {:.3} s    Total detections: {}",
                bundle.processing_time.as_secs_f64(),
                bundle.table.len()
            ),
            11.0,
            &font,
        );
        cursor.text(
            &format!(
                "Frames analysed: {}    Severity policy: {}",
                bundle.frames,
                bundle
                    .table
                    .policy()
                    .map(|policy| policy.as_str())
                    .unwrap_or("unclassified")
            ),
            11.0,
            &font,
        );
        cursor.gap(4.0);
        cursor.image(preview, PREVIEW_MAX_HEIGHT);
        cursor.gap(6.0);

        cursor.text("Detections", 14.0, &bold);
        if bundle.table.is_empty() {
            cursor.text("No damage detected.", 11.0, &font);
        } else {
            cursor.row(["#", "Damage type", "Confidence", "Severity"], &bold);
            for (index, record) in bundle.table.iter().enumerate() {
                cursor.row(
                    [
                        (index + 1).to_string().as_str(),
                        record.class_label(),
                        format!("{:.3}", record.confidence()).as_str(),
                        record.severity().map(|tier| tier.as_str()).unwrap_or("-"),
                    ],
                    &font,
                );
            }
        }
        cursor.gap(6.0);

        cursor.text("Severity distribution", 14.0, &bold);
        cursor.image(chart, CHART_MAX_HEIGHT);
        for entry in &bundle.summary.severity_counts {
            cursor.text(
                &format!(
                    "{} ({}): {}",
                    entry.tier,
                    rank_colour_name(entry.tier.rank()),
                    entry.count
                ),
                10.0,
                &font,
            );
        }
        cursor.gap(4.0);

        cursor.text("Summary by damage type", 14.0, &bold);
        for class in &bundle.summary.classes {
            cursor.text(
                &format!(
                    "{}: {} detections, mean confidence {:.3}",
                    class.class_label, class.count, class.mean_confidence
                ),
                10.0,
                &font,
            );
        }

        log::debug!("document laid out over {} pages", cursor.pages);
        publish_atomically(dest, |file| {
            let mut writer = BufWriter::new(file);
            doc.save(&mut writer).map_err(render_error)?;
            writer
                .into_inner()
                .map_err(|err| StageError::Io(err.into_error()))?;
            Ok(())
        })
    }
}

struct Cursor<'d> {
    doc: &'d PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
    pages: usize,
}

impl Cursor<'_> {
    fn ensure(&mut self, height: f32) {
        if self.y - height < BOTTOM {
            let (page, layer) = self.doc.add_page(
                Mm(PAGE_WIDTH),
                Mm(PAGE_HEIGHT),
                format!("Layer {}", self.pages + 1),
            );
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = TOP;
            self.pages += 1;
        }
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }

    fn text(&mut self, text: &str, size: f32, font: &IndirectFontRef) {
        self.ensure(ROW_HEIGHT);
        self.layer.use_text(text, size, Mm(LEFT), Mm(self.y), font);
        self.y -= ROW_HEIGHT;
    }

    fn row(&mut self, cells: [&str; 4], font: &IndirectFontRef) {
        const COLUMNS: [f32; 4] = [0.0, 15.0, 110.0, 145.0];
        self.ensure(ROW_HEIGHT);
        for (offset, cell) in COLUMNS.iter().zip(cells) {
            self.layer
                .use_text(cell, 10.0, Mm(LEFT + offset), Mm(self.y), font);
        }
        self.y -= ROW_HEIGHT;
    }

    fn image(&mut self, image: DynamicImage, max_height: f32) {
        let (pixel_width, pixel_height) = GenericImageView::dimensions(&image);
        let native_width = pixel_width as f32 * 25.4 / IMAGE_DPI;
        let native_height = pixel_height as f32 * 25.4 / IMAGE_DPI;
        if native_width <= 0.0 || native_height <= 0.0 {
            return;
        }
        let scale = (CONTENT_WIDTH / native_width).min(max_height / native_height);
        let height = native_height * scale;

        self.ensure(height);
        self.y -= height;
        Image::from_dynamic_image(&image).add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(LEFT)),
                translate_y: Some(Mm(self.y)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(IMAGE_DPI),
                ..Default::default()
            },
        );
        self.y -= ROW_HEIGHT;
    }
}

fn load_image(path: &Path) -> StageResult<DynamicImage> {
    if !path.exists() {
        return Err(StageError::MissingArtifact(path.to_path_buf()));
    }
    let image = image::open(path)
        .map_err(|err| StageError::Render(format!("decoding {}: {}", path.display(), err)))?;
    // PDF images are embedded without an alpha channel.
    Ok(DynamicImage::ImageRgb8(image.to_rgb8()))
}

fn rank_colour_name(rank: usize) -> &'static str {
    match rank {
        0 => "green",
        1 => "amber",
        _ => "red",
    }
}

fn render_error(err: impl std::fmt::Debug) -> StageError {
    StageError::Render(format!("{err:?}"))
}
