//! SVG Chart Generator for Confidence Histograms
//!
//! Renders overlaid histograms (correct vs. incorrect predictions) as a
//! standalone SVG file.

use std::fs;
use std::path::Path;

/// Chart styling constants
const CHART_WIDTH: f64 = 800.0;
const CHART_HEIGHT: f64 = 500.0;
const MARGIN_TOP: f64 = 60.0;
const MARGIN_RIGHT: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 80.0;
const MARGIN_LEFT: f64 = 80.0;

pub const COLOR_CORRECT: &str = "#2ecc71";
pub const COLOR_INCORRECT: &str = "#e74c3c";
const COLOR_GRID: &str = "#ecf0f1";
const COLOR_AXIS: &str = "#2c3e50";
const COLOR_TEXT: &str = "#2c3e50";

/// One histogram drawn on the shared [0, 1] axis
#[derive(Debug, Clone)]
pub struct HistogramSeries {
    pub name: String,
    /// Counts per equal-width bin over [0, 1]
    pub counts: Vec<usize>,
    pub color: String,
}

/// Generate an overlaid histogram chart SVG
///
/// All series must share the same number of bins. Bars are drawn
/// semi-transparent so overlapping bins stay readable.
pub fn generate_histogram_chart(
    title: &str,
    x_label: &str,
    y_label: &str,
    series: &[HistogramSeries],
    output_path: &Path,
) -> std::io::Result<()> {
    fs::write(output_path, render_histogram_svg(title, x_label, y_label, series))
}

/// Render the histogram chart to an SVG string
pub fn render_histogram_svg(
    title: &str,
    x_label: &str,
    y_label: &str,
    series: &[HistogramSeries],
) -> String {
    let plot_width = CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;

    let num_bins = series.iter().map(|s| s.counts.len()).max().unwrap_or(0).max(1);
    let y_max = series
        .iter()
        .flat_map(|s| s.counts.iter().copied())
        .max()
        .unwrap_or(0)
        .max(1) as f64;
    let bin_width = plot_width / num_bins as f64;

    let mut svg = String::new();

    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {} {}" width="{}" height="{}">"#,
        CHART_WIDTH, CHART_HEIGHT, CHART_WIDTH, CHART_HEIGHT
    ));
    svg.push_str(&format!(
        r#"<rect width="{}" height="{}" fill="white"/>"#,
        CHART_WIDTH, CHART_HEIGHT
    ));
    svg.push_str(&format!(
        r#"<text x="{}" y="35" text-anchor="middle" font-family="Arial, sans-serif" font-size="18" font-weight="bold" fill="{}">{}</text>"#,
        CHART_WIDTH / 2.0, COLOR_TEXT, escape_xml(title)
    ));

    // Horizontal grid with frequency labels
    for i in 0..=5 {
        let y = MARGIN_TOP + plot_height - (i as f64 / 5.0) * plot_height;
        let value = (i as f64 / 5.0) * y_max;

        svg.push_str(&format!(
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="1"/>"#,
            MARGIN_LEFT, y, MARGIN_LEFT + plot_width, y, COLOR_GRID
        ));
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" text-anchor="end" font-family="Arial, sans-serif" font-size="12" fill="{}">{:.0}</text>"#,
            MARGIN_LEFT - 10.0, y + 4.0, COLOR_TEXT, value
        ));
    }

    // Bars
    for series_data in series {
        for (bin, &count) in series_data.counts.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let bar_height = (count as f64 / y_max) * plot_height;
            let x = MARGIN_LEFT + bin as f64 * bin_width;
            let y = MARGIN_TOP + plot_height - bar_height;

            svg.push_str(&format!(
                r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}" fill-opacity="0.5" stroke="{}" stroke-width="1"/>"#,
                x, y, bin_width, bar_height, series_data.color, series_data.color
            ));
        }
    }

    // Axes
    svg.push_str(&format!(
        r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="2"/>"#,
        MARGIN_LEFT, MARGIN_TOP + plot_height, MARGIN_LEFT + plot_width, MARGIN_TOP + plot_height, COLOR_AXIS
    ));
    svg.push_str(&format!(
        r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="2"/>"#,
        MARGIN_LEFT, MARGIN_TOP, MARGIN_LEFT, MARGIN_TOP + plot_height, COLOR_AXIS
    ));

    // X ticks every 0.1
    for i in 0..=10 {
        let x = MARGIN_LEFT + (i as f64 / 10.0) * plot_width;
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="11" fill="{}">{:.1}</text>"#,
            x, MARGIN_TOP + plot_height + 20.0, COLOR_TEXT, i as f64 / 10.0
        ));
    }

    // Axis labels
    svg.push_str(&format!(
        r#"<text x="{}" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="14" fill="{}">{}</text>"#,
        MARGIN_LEFT + plot_width / 2.0, CHART_HEIGHT - 20.0, COLOR_TEXT, escape_xml(x_label)
    ));
    svg.push_str(&format!(
        r#"<text x="20" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="14" fill="{}" transform="rotate(-90 20 {})">{}</text>"#,
        CHART_HEIGHT / 2.0, COLOR_TEXT, CHART_HEIGHT / 2.0, escape_xml(y_label)
    ));

    // Legend
    let mut legend_y = MARGIN_TOP + 10.0;
    for series_data in series {
        svg.push_str(&format!(
            r#"<rect x="{}" y="{}" width="15" height="15" fill="{}" fill-opacity="0.5"/>"#,
            CHART_WIDTH - MARGIN_RIGHT - 120.0, legend_y, series_data.color
        ));
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" font-family="Arial, sans-serif" font-size="12" fill="{}">{}</text>"#,
            CHART_WIDTH - MARGIN_RIGHT - 100.0, legend_y + 12.0, COLOR_TEXT, escape_xml(&series_data.name)
        ));
        legend_y += 25.0;
    }

    svg.push_str("</svg>");
    svg
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_series() -> Vec<HistogramSeries> {
        vec![
            HistogramSeries {
                name: "Correct".to_string(),
                counts: vec![0, 1, 2, 10],
                color: COLOR_CORRECT.to_string(),
            },
            HistogramSeries {
                name: "Incorrect".to_string(),
                counts: vec![3, 2, 1, 0],
                color: COLOR_INCORRECT.to_string(),
            },
        ]
    }

    #[test]
    fn test_histogram_svg_contains_axes_and_legend() {
        let svg = render_histogram_svg("EDL <CIFAR-10>", "Confidence", "Frequency", &sample_series());
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains(">Confidence<"));
        assert!(svg.contains(">Frequency<"));
        assert!(svg.contains(">Correct<"));
        assert!(svg.contains("EDL &lt;CIFAR-10&gt;"));
    }

    #[test]
    fn test_histogram_skips_empty_bins() {
        let svg = render_histogram_svg("t", "x", "y", &sample_series());
        // 3 non-empty correct bins + 3 non-empty incorrect bins
        assert_eq!(svg.matches("fill-opacity=\"0.5\" stroke=").count(), 6);
    }

    #[test]
    fn test_histogram_chart_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hist.svg");
        generate_histogram_chart("t", "Confidence", "Frequency", &sample_series(), &path).unwrap();
        assert!(path.exists());
    }
}
