//! Listing output: tab-separated tables of dataset rows.

use crate::dataset::Dataset;

/// Table layout options for [`render_table`].
#[derive(Debug, Clone, Default)]
pub struct TableOptions<'a> {
    /// Title line printed first, if any.
    pub title: Option<&'a str>,
    /// Columns to print; empty prints every declared column.
    pub columns: &'a [String],
    /// Print at most this many rows.
    pub obs: Option<usize>,
    /// Suppress the `Obs` column.
    pub noobs: bool,
    /// Text shown for missing and absent values.
    pub missing: &'a str,
}

/// Render a dataset with every declared column and an `Obs` column.
pub fn render_dataset(ds: &Dataset, title: Option<&str>, missing: &str) -> Vec<String> {
    render_table(
        ds,
        &TableOptions {
            title,
            missing,
            ..Default::default()
        },
    )
}

/// Render a dataset as listing lines.
pub fn render_table(ds: &Dataset, opts: &TableOptions<'_>) -> Vec<String> {
    let columns = if opts.columns.is_empty() {
        &ds.column_order[..]
    } else {
        opts.columns
    };
    let mut lines = Vec::with_capacity(ds.len() + 2);
    if let Some(title) = opts.title {
        lines.push(format!("Title: {title}"));
    }

    let mut header: Vec<&str> = Vec::with_capacity(columns.len() + 1);
    if !opts.noobs {
        header.push("Obs");
    }
    header.extend(columns.iter().map(String::as_str));
    lines.push(header.join("\t"));

    let limit = opts.obs.unwrap_or(usize::MAX);
    for (i, row) in ds.rows.iter().take(limit).enumerate() {
        let mut cells = Vec::with_capacity(columns.len() + 1);
        if !opts.noobs {
            cells.push((i + 1).to_string());
        }
        for col in columns {
            cells.push(match row.get(col) {
                Some(v) => v.display_with(opts.missing),
                None => opts.missing.to_string(),
            });
        }
        lines.push(cells.join("\t"));
    }
    lines
}
