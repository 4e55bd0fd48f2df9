//! Plain-text preview of a result frame
//!
//! Column widths are measured in terminal cells, so CJK and other wide
//! characters stay aligned.

use crate::frame::GeoFrame;
use unicode_truncate::UnicodeTruncateStr;
use unicode_width::UnicodeWidthStr;

const MIN_WIDTH: usize = 4;
const MAX_WIDTH: usize = 40;
const GEOMETRY_HEADER: &str = "geometry";

/// Render up to `limit` rows of `frame` as an aligned text table.
///
/// The geometry column shows the WKT, truncated like any other cell.
pub fn render(frame: &GeoFrame, limit: usize) -> String {
    let mut header: Vec<String> = frame.columns.iter().map(|c| c.name.clone()).collect();
    header.push(GEOMETRY_HEADER.to_string());

    let wkt = frame.wkt();
    let body: Vec<Vec<String>> = frame
        .rows
        .iter()
        .zip(wkt)
        .take(limit)
        .map(|(row, wkt)| {
            let mut cells: Vec<String> =
                row.values.iter().map(|v| v.display_string(MAX_WIDTH)).collect();
            cells.push(wkt);
            cells
        })
        .collect();

    let widths = compute_column_widths(&header, &body);

    let mut out = String::new();
    push_line(&mut out, &header, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("-+-"));
    out.push('\n');
    for cells in &body {
        push_line(&mut out, cells, &widths);
    }

    let hidden = frame.len().saturating_sub(limit);
    if hidden > 0 {
        out.push_str(&format!("... {} more rows\n", hidden));
    }
    out.push_str(&format!(
        "({} rows, EPSG:{})\n",
        frame.len(),
        frame.srid
    ));
    out
}

fn compute_column_widths(header: &[String], body: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = header.iter().map(|h| h.width()).collect();
    for cells in body {
        for (i, cell) in cells.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.width());
            }
        }
    }
    for w in &mut widths {
        *w = (*w).clamp(MIN_WIDTH, MAX_WIDTH);
    }
    widths
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, w)| fit(cell, *w))
        .collect();
    out.push_str(padded.join(" | ").trim_end());
    out.push('\n');
}

/// Truncate to `width` cells (with a trailing `...` when cut) and pad
fn fit(s: &str, width: usize) -> String {
    let text = if s.width() <= width {
        s.to_string()
    } else {
        let (kept, _) = s.unicode_truncate(width.saturating_sub(3));
        format!("{}...", kept)
    };
    let pad = width.saturating_sub(text.width());
    format!("{}{}", text, " ".repeat(pad))
}
