//! Inline SVG figures for the HTML report.

use geo::{BoundingRect, MultiLineString};

use crate::html::escape;

const BAR_HEIGHT: f64 = 22.0;
const BAR_GAP: f64 = 6.0;
const LABEL_WIDTH: f64 = 180.0;
const CHART_WIDTH: f64 = 640.0;
const OUTLINE_SIZE: f64 = 360.0;
const OUTLINE_MARGIN: f64 = 10.0;

/// Horizontal bar chart of `(label, value)` pairs, one bar per entry.
///
/// Bars are scaled to the largest value. An empty series renders an empty
/// figure with a short note instead of bars.
#[must_use]
#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    reason = "bar geometry scales small counts into figure units"
)]
pub fn bar_chart_svg(title: &str, series: &[(String, usize)]) -> String {
    let max = series.iter().map(|(_, value)| *value).max().unwrap_or(0);
    let rows = series.len().max(1);
    let height = rows as f64 * (BAR_HEIGHT + BAR_GAP) + BAR_GAP;
    let mut svg = format!(
        r#"<svg class="chart" role="img" viewBox="0 0 {CHART_WIDTH} {height}" width="{CHART_WIDTH}" height="{height}" xmlns="http://www.w3.org/2000/svg"><title>{}</title>"#,
        escape(title)
    );
    if max == 0 {
        svg.push_str(&format!(
            r#"<text x="8" y="{}" class="chart-empty">No features</text></svg>"#,
            BAR_GAP + BAR_HEIGHT * 0.7
        ));
        return svg;
    }
    let bar_space = CHART_WIDTH - LABEL_WIDTH - 60.0;
    for (row, (label, value)) in series.iter().enumerate() {
        let y = BAR_GAP + row as f64 * (BAR_HEIGHT + BAR_GAP);
        let width = bar_space * (*value as f64) / (max as f64);
        svg.push_str(&format!(
            concat!(
                r#"<text x="{lx}" y="{ty}" text-anchor="end">{label}</text>"#,
                r#"<rect x="{bx}" y="{y}" width="{width:.1}" height="{h}" rx="3"></rect>"#,
                r#"<text x="{vx:.1}" y="{ty}" class="value">{value}</text>"#,
            ),
            lx = LABEL_WIDTH - 8.0,
            ty = y + BAR_HEIGHT * 0.7,
            label = escape(label),
            bx = LABEL_WIDTH,
            y = y,
            width = width,
            h = BAR_HEIGHT,
            vx = LABEL_WIDTH + width + 6.0,
            value = value,
        ));
    }
    svg.push_str("</svg>");
    svg
}

/// Outline of projected boundary rings, scaled into a square figure with
/// north up. Returns an empty string when there is nothing to draw.
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "outline coordinates are scaled into figure units"
)]
pub fn boundary_outline_svg(name: &str, outline: &MultiLineString) -> String {
    let Some(extent) = outline.bounding_rect() else {
        return String::new();
    };
    let span = extent.width().max(extent.height());
    if span <= 0.0 {
        return String::new();
    }
    let scale = (OUTLINE_SIZE - 2.0 * OUTLINE_MARGIN) / span;
    let (min, max) = (extent.min(), extent.max());
    let mut path = String::new();
    for ring in outline {
        for (index, coord) in ring.coords().enumerate() {
            let command = if index == 0 { 'M' } else { 'L' };
            let x = OUTLINE_MARGIN + (coord.x - min.x) * scale;
            // SVG y grows downwards.
            let y = OUTLINE_MARGIN + (max.y - coord.y) * scale;
            path.push_str(&format!("{command}{x:.1},{y:.1}"));
        }
        path.push('Z');
    }
    format!(
        concat!(
            r#"<svg class="outline" role="img" viewBox="0 0 {size} {size}" width="{size}" height="{size}" xmlns="http://www.w3.org/2000/svg">"#,
            r#"<title>{name} boundary</title>"#,
            r#"<path d="{path}" fill="none" stroke="black" stroke-width="2" fill-rule="evenodd"></path>"#,
            "</svg>"
        ),
        size = OUTLINE_SIZE,
        name = escape(name),
        path = path,
    )
}
