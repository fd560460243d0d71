use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use std::path::Path;

use crate::prelude::{StageError, StageResult};
use crate::processing::{SeverityTier, TierCount};
use crate::report::publish::publish_atomically;

pub const CHART_WIDTH: u32 = 640;
pub const CHART_HEIGHT: u32 = 400;
const MARGIN: u32 = 40;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([33, 33, 33]);

/// Bar colours by tier rank: least severe, middle, most severe.
pub const TIER_PALETTE: [Rgb<u8>; 3] = [
    Rgb([67, 160, 71]),
    Rgb([255, 179, 0]),
    Rgb([229, 57, 53]),
];

pub fn tier_color(tier: SeverityTier) -> Rgb<u8> {
    TIER_PALETTE[tier.rank()]
}

/// Draws one bar per tier, left to right in the order given.
pub fn draw_severity_chart(counts: &[TierCount]) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(CHART_WIDTH, CHART_HEIGHT, BACKGROUND);
    let plot_width = CHART_WIDTH - 2 * MARGIN;
    let plot_height = CHART_HEIGHT - 2 * MARGIN;
    let baseline = CHART_HEIGHT - MARGIN;

    fill_rect(&mut canvas, MARGIN, baseline, plot_width, 2, AXIS);
    fill_rect(&mut canvas, MARGIN, MARGIN, 2, plot_height, AXIS);

    let max_count = counts.iter().map(|entry| entry.count).max().unwrap_or(0);
    if counts.is_empty() || max_count == 0 {
        return canvas;
    }

    let slot = plot_width / counts.len() as u32;
    let bar_width = slot * 3 / 5;
    for (index, entry) in counts.iter().enumerate() {
        let height = (entry.count as u64 * u64::from(plot_height) / max_count as u64) as u32;
        let x = MARGIN + index as u32 * slot + (slot - bar_width) / 2;
        fill_rect(
            &mut canvas,
            x,
            baseline - height,
            bar_width,
            height,
            tier_color(entry.tier),
        );
    }
    canvas
}

pub fn render_severity_chart(counts: &[TierCount], dest: &Path) -> StageResult<()> {
    let chart = DynamicImage::ImageRgb8(draw_severity_chart(counts));
    publish_atomically(dest, |file| {
        chart
            .write_to(file, ImageOutputFormat::Png)
            .map_err(|err| StageError::Render(err.to_string()))
    })
}

fn fill_rect(canvas: &mut RgbImage, x: u32, y: u32, width: u32, height: u32, color: Rgb<u8>) {
    let x_end = (x + width).min(canvas.width());
    let y_end = (y + height).min(canvas.height());
    for py in y..y_end {
        for px in x..x_end {
            canvas.put_pixel(px, py, color);
        }
    }
}
