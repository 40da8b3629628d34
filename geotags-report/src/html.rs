//! Static HTML rendering of [`SummaryStatistics`].
//!
//! The document is self-contained: styles are inlined and the figures are
//! inline SVG, so the file can be opened offline or attached to an email.
//! Every interpolated string passes through [`escape`].

use std::io::Write;

use camino::Utf8Path;
use chrono::NaiveDate;
use log::info;

use crate::chart::{bar_chart_svg, boundary_outline_svg};
use crate::{ReportError, SummaryStatistics};

/// Skipped features listed individually before the table is truncated.
const SKIPPED_ROWS: usize = 50;

const STYLE: &str = "
body { font-family: system-ui, sans-serif; margin: 0 auto; max-width: 1080px; padding: 24px; color: #1f2933; background: #f5f7fa; }
.header { background: #2f6b3a; color: #fff; padding: 28px 32px; border-radius: 10px; }
.header h1 { margin: 0 0 6px 0; }
.section { background: #fff; border-radius: 10px; padding: 20px 28px; margin-top: 20px; box-shadow: 0 1px 3px rgba(0,0,0,0.08); }
.stats-grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(160px, 1fr)); gap: 12px; }
.stat-card { background: #eef5ef; border-radius: 8px; padding: 14px; }
.stat-card .label { font-size: 0.85em; color: #52606d; }
.stat-card .number { font-size: 1.6em; font-weight: 600; }
table { border-collapse: collapse; width: 100%; margin: 8px 0 16px 0; }
th, td { text-align: left; padding: 6px 10px; border-bottom: 1px solid #e4e7eb; }
td.num, th.num { text-align: right; }
.failed { color: #b42318; }
.chart rect { fill: #3f8f4f; }
.chart text { font-size: 12px; fill: #1f2933; }
.chart .value { fill: #52606d; }
.step { border-left: 4px solid #3f8f4f; padding: 4px 14px; margin: 12px 0; }
.footer { text-align: center; color: #7b8794; font-size: 0.85em; margin: 28px 0 8px 0; }
";

/// Run details shown alongside the statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportContext {
    /// City name from the configuration.
    pub city: String,
    /// Country name from the configuration.
    pub country: String,
    /// Coordinate reference system identifier of the outputs.
    pub crs: String,
    /// Date the data was extracted.
    pub extraction_date: NaiveDate,
    /// File names of the artefacts written next to the report.
    pub artefacts: Vec<String>,
}

/// Escape text for HTML element content and quoted attribute values.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[expect(clippy::float_arithmetic, reason = "unit conversion to square kilometres")]
fn km2(square_metres: f64) -> String {
    format!("{:.2}", square_metres / 1_000_000.0)
}

#[expect(clippy::float_arithmetic, reason = "unit conversion to kilometres")]
fn km(metres: f64) -> String {
    format!("{:.2}", metres / 1_000.0)
}

#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    reason = "feature counts stay far below 2^52 and shares are only displayed"
)]
fn percent(part: usize, whole: usize) -> String {
    if whole == 0 {
        return "0.0".to_owned();
    }
    format!("{:.1}", part as f64 * 100.0 / whole as f64)
}

fn stat_card(label: &str, value: &str) -> String {
    format!(
        r#"<div class="stat-card"><div class="label">{}</div><div class="number">{}</div></div>"#,
        escape(label),
        escape(value)
    )
}

fn header(context: &ReportContext) -> String {
    format!(
        r#"<div class="header"><h1>{city}, {country}: OpenStreetMap extraction</h1><p>Extraction date: {date}</p><p>Coordinate reference system: {crs}</p></div>
"#,
        city = escape(&context.city),
        country = escape(&context.country),
        date = context.extraction_date.format("%B %d, %Y"),
        crs = escape(&context.crs),
    )
}

fn table_of_contents(stats: &SummaryStatistics) -> String {
    let mut entries = vec![
        ("dataset-overview", "Dataset overview"),
        ("categories", "Categories"),
        ("data-variables", "Data variables"),
        ("osm-tag-distribution", "OSM tag distribution"),
        ("geometry-distribution", "Geometry distribution"),
    ];
    if stats.failed_categories().next().is_some() {
        entries.push(("failed-categories", "Failed categories"));
    }
    if !stats.skipped.is_empty() {
        entries.push(("skipped-features", "Skipped features"));
    }
    entries.push(("processing-steps", "Processing steps"));
    let items: String = entries
        .iter()
        .map(|(anchor, title)| format!(r##"<li><a href="#{anchor}">{title}</a></li>"##))
        .collect();
    format!("<div class=\"section toc\"><h2>Table of contents</h2><ol>{items}</ol></div>\n")
}

fn overview(stats: &SummaryStatistics) -> String {
    let cards = [
        stat_card("Total features", &stats.total_features.to_string()),
        stat_card("Categories", &stats.categories.len().to_string()),
        stat_card("OSM tag types", &stats.tag_counts.len().to_string()),
        stat_card("Geometry types", &stats.geometry_counts.len().to_string()),
        stat_card("Boundary area (km²)", &km2(stats.boundary_area_m2)),
        stat_card("Polygon area (km²)", &km2(stats.total_area_m2())),
        stat_card("Line length (km)", &km(stats.total_length_m())),
    ]
    .concat();
    format!(
        "<div class=\"section\"><h2 id=\"dataset-overview\">Dataset overview</h2><div class=\"stats-grid\">{cards}</div><figure>{}<figcaption>Boundary of {} (equal-area projection)</figcaption></figure></div>\n",
        boundary_outline_svg(&stats.boundary_name, &stats.boundary_outline),
        escape(&stats.boundary_name),
    )
}

fn categories(stats: &SummaryStatistics) -> String {
    let rows: String = stats
        .categories
        .iter()
        .map(|c| {
            let status = c.failure.as_ref().map_or_else(
                || "ok".to_owned(),
                |_| "<span class=\"failed\">failed</span>".to_owned(),
            );
            format!(
                "<tr><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td>{status}</td></tr>",
                escape(&c.name),
                c.extracted.map_or_else(|| "-".to_owned(), |n| n.to_string()),
                c.count,
                km2(c.area_m2),
                km(c.length_m),
            )
        })
        .collect();
    let series: Vec<(String, usize)> = stats
        .categories
        .iter()
        .map(|c| (c.name.clone(), c.count))
        .collect();
    format!(
        "<div class=\"section\"><h2 id=\"categories\">Categories</h2><table><thead><tr><th>Category</th><th class=\"num\">Extracted</th><th class=\"num\">Exported</th><th class=\"num\">Area (km²)</th><th class=\"num\">Length (km)</th><th>Status</th></tr></thead><tbody>{rows}</tbody></table>{}</div>\n",
        bar_chart_svg("Exported features per category", &series)
    )
}

fn data_variables() -> String {
    let variables = [
        ("id", "Feature identifier in the form element/osm_id, e.g. way/123."),
        ("element", "OpenStreetMap element type: node, way or relation."),
        ("osm_id", "Numeric identifier of the element within its type."),
        ("category", "Configured category that selected the feature."),
        ("osm_tag", "The key=value tag that matched, e.g. leisure=park."),
        ("name", "Value of the OSM name tag, or null."),
        (
            "converted_from",
            "Original geometry class when the feature was converted to its category's class.",
        ),
        ("geometry", "Point, MultiLineString or MultiPolygon in WGS84."),
    ];
    let rows: String = variables
        .iter()
        .map(|(name, description)| format!("<tr><td><code>{name}</code></td><td>{description}</td></tr>"))
        .collect();
    format!(
        "<div class=\"section\"><h2 id=\"data-variables\">Data variables</h2><table><tbody>{rows}</tbody></table></div>\n"
    )
}

fn tag_distribution(stats: &SummaryStatistics) -> String {
    let mut body = String::new();
    for category in stats.categories.iter().filter(|c| !c.tags.is_empty()) {
        let rows: String = category
            .tags
            .iter()
            .map(|tag| {
                format!(
                    "<tr><td><code>{}</code></td><td class=\"num\">{}</td><td class=\"num\">{}%</td></tr>",
                    escape(&tag.osm_tag),
                    tag.count,
                    percent(tag.count, category.count)
                )
            })
            .collect();
        body.push_str(&format!(
            "<h3>{}</h3><table><thead><tr><th>OSM tag</th><th class=\"num\">Count</th><th class=\"num\">Share</th></tr></thead><tbody>{rows}</tbody></table>",
            escape(&category.name)
        ));
    }
    if body.is_empty() {
        body.push_str("<p>No features were exported.</p>");
    }
    format!(
        "<div class=\"section\"><h2 id=\"osm-tag-distribution\">OSM tag distribution</h2>{body}</div>\n"
    )
}

fn geometry_distribution(stats: &SummaryStatistics) -> String {
    let rows: String = stats
        .geometry_counts
        .iter()
        .map(|(kind, count)| {
            format!(
                "<tr><td>{kind}</td><td class=\"num\">{count}</td><td class=\"num\">{}%</td></tr>",
                percent(*count, stats.total_features)
            )
        })
        .collect();
    format!(
        "<div class=\"section\"><h2 id=\"geometry-distribution\">Geometry distribution</h2><table><thead><tr><th>Geometry type</th><th class=\"num\">Count</th><th class=\"num\">Share</th></tr></thead><tbody>{rows}</tbody></table></div>\n"
    )
}

fn failed_categories(stats: &SummaryStatistics) -> String {
    let items: String = stats
        .failed_categories()
        .map(|c| {
            format!(
                "<li><strong>{}</strong>: {}</li>",
                escape(&c.name),
                escape(c.failure.as_deref().unwrap_or_default())
            )
        })
        .collect();
    if items.is_empty() {
        return String::new();
    }
    format!(
        "<div class=\"section\"><h2 id=\"failed-categories\" class=\"failed\">Failed categories</h2><p>These categories produced no features; the rest of the run continued.</p><ul>{items}</ul></div>\n"
    )
}

fn skipped_features(stats: &SummaryStatistics) -> String {
    if stats.skipped.is_empty() {
        return String::new();
    }
    let reasons: String = stats
        .skipped_by_reason
        .iter()
        .map(|(reason, count)| {
            format!("<tr><td>{}</td><td class=\"num\">{count}</td></tr>", escape(reason.describe()))
        })
        .collect();
    let rows: String = stats
        .skipped
        .iter()
        .take(SKIPPED_ROWS)
        .map(|s| {
            format!(
                "<tr><td><code>{}</code></td><td>{}</td><td><code>{}</code></td><td>{}</td></tr>",
                s.id,
                escape(&s.category),
                escape(&s.osm_tag),
                escape(s.reason.describe())
            )
        })
        .collect();
    let more = stats.skipped.len().saturating_sub(SKIPPED_ROWS);
    let note = if more > 0 {
        format!("<p>{more} more skipped feature(s) not listed.</p>")
    } else {
        String::new()
    };
    format!(
        "<div class=\"section\"><h2 id=\"skipped-features\">Skipped features</h2><table><thead><tr><th>Reason</th><th class=\"num\">Count</th></tr></thead><tbody>{reasons}</tbody></table><table><thead><tr><th>Element</th><th>Category</th><th>OSM tag</th><th>Reason</th></tr></thead><tbody>{rows}</tbody></table>{note}</div>\n"
    )
}

fn processing_steps(stats: &SummaryStatistics, context: &ReportContext) -> String {
    let city = escape(&context.city);
    let place = format!("{city}, {}", escape(&context.country));
    let artefacts = if context.artefacts.is_empty() {
        "no files".to_owned()
    } else {
        context
            .artefacts
            .iter()
            .map(|file| format!("<code>{}</code>", escape(file)))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let filters: usize = stats.tag_counts.len();
    let steps = [
        (
            "Resolve boundary",
            format!(
                "Geocoded \"{place}\" with Nominatim and kept the administrative polygon <em>{}</em> ({} km²).",
                escape(&stats.boundary_name),
                km2(stats.boundary_area_m2)
            ),
        ),
        (
            "Extract features",
            format!(
                "Queried Overpass for each tag filter of {} categor(y/ies) within the boundary's bounding box, clipped results to the boundary and removed duplicate elements per category.",
                stats.categories.len()
            ),
        ),
        (
            "Normalize geometries",
            format!(
                "Assembled rings from member ways and coerced every feature to its category's geometry class; {} feature(s) were skipped.",
                stats.skipped.len()
            ),
        ),
        (
            "Export",
            format!(
                "Wrote {} feature(s) carrying {filters} distinct OSM tag(s) as {}: {artefacts}.",
                stats.total_features,
                escape(&context.crs)
            ),
        ),
    ];
    let body: String = steps
        .iter()
        .enumerate()
        .map(|(index, (title, description))| {
            format!(
                "<div class=\"step\"><h3>{}. {title}</h3><p>{description}</p></div>",
                index + 1
            )
        })
        .collect();
    format!(
        "<div class=\"section\"><h2 id=\"processing-steps\">Processing steps</h2>{body}</div>\n"
    )
}

/// Render the report as a complete HTML document.
///
/// Pure: the same statistics and context always yield the same bytes.
#[must_use]
pub fn render_html(stats: &SummaryStatistics, context: &ReportContext) -> String {
    let title = format!(
        "{}, {}: OpenStreetMap summary",
        escape(&context.city),
        escape(&context.country)
    );
    [
        format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n<title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n"
        ),
        header(context),
        table_of_contents(stats),
        overview(stats),
        categories(stats),
        data_variables(),
        tag_distribution(stats),
        geometry_distribution(stats),
        failed_categories(stats),
        skipped_features(stats),
        processing_steps(stats, context),
        "<div class=\"footer\"><p>Report generated by geotags</p><p>Data © OpenStreetMap contributors, available under the Open Database License (ODbL)</p></div>\n</body>\n</html>\n".to_owned(),
    ]
    .concat()
}

/// Render and write the report to `path`, atomically.
///
/// # Errors
/// [`ReportError::Write`] when the file cannot be staged or replaced.
pub fn write_report(
    path: &Utf8Path,
    stats: &SummaryStatistics,
    context: &ReportContext,
) -> Result<(), ReportError> {
    let html = render_html(stats, context);
    geotags_fs::write_atomic(path, |writer| writer.write_all(html.as_bytes())).map_err(
        |source| ReportError::Write {
            path: path.to_path_buf(),
            source,
        },
    )?;
    info!("wrote summary report to {path}");
    Ok(())
}
