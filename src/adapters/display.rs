//! Plain-text table rendering for CLI output.

/// Render rows as a fixed-width table with a header rule. Columns are
/// left-aligned and sized to their widest cell.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let render_row = |cells: &[String]| -> String {
        let mut line = String::new();
        for (i, cell) in cells.iter().enumerate() {
            if i > 0 {
                line.push_str("  ");
            }
            line.push_str(cell);
            if i + 1 < cells.len() {
                for _ in cell.len()..widths[i] {
                    line.push(' ');
                }
            }
        }
        line
    };

    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let mut out = render_row(&header_cells);
    out.push('\n');
    out.push_str(&"-".repeat(widths.iter().sum::<usize>() + 2 * (widths.len() - 1)));
    out.push('\n');
    for row in rows {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out
}

/// Render a histogram of values bucketed to the nearest integer, one `*`
/// per occurrence, buckets in ascending order.
pub fn render_histogram(values: &[f64]) -> String {
    use std::collections::BTreeMap;

    let mut buckets: BTreeMap<i64, usize> = BTreeMap::new();
    for &value in values {
        *buckets.entry(value.round() as i64).or_default() += 1;
    }

    let width = buckets
        .keys()
        .map(|k| k.to_string().len())
        .max()
        .unwrap_or(1);

    let mut out = String::new();
    for (bucket, count) in buckets {
        out.push_str(&format!("{bucket:>width$} {}\n", "*".repeat(count)));
    }
    out
}
