use serde::Serialize;

/// Free-text cells (feedback, revision notes) are cut to this many chars.
const MAX_CELL: usize = 60;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    for line in render_table(headers, rows) {
        println!("{line}");
    }
}

fn clip(cell: &str) -> String {
    let flat = cell.replace('\n', " ");
    if flat.chars().count() <= MAX_CELL {
        return flat;
    }
    let mut out: String = flat.chars().take(MAX_CELL - 1).collect();
    out.push('…');
    out
}

fn pad(cell: &str, width: usize) -> String {
    let n = cell.chars().count();
    format!("{cell}{}", " ".repeat(width.saturating_sub(n)))
}

fn render_table(headers: &[&str], rows: Vec<Vec<String>>) -> Vec<String> {
    let rows: Vec<Vec<String>> = rows
        .into_iter()
        .map(|r| r.iter().map(|c| clip(c)).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let join = |cells: Vec<String>| cells.join("  ").trim_end().to_string();

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(join(
        headers
            .iter()
            .zip(&widths)
            .map(|(h, &w)| pad(h, w))
            .collect(),
    ));
    lines.push(join(widths.iter().map(|&w| "-".repeat(w)).collect()));
    for row in &rows {
        lines.push(join(
            row.iter()
                .enumerate()
                .map(|(i, cell)| pad(cell, widths.get(i).copied().unwrap_or(0)))
                .collect(),
        ));
    }
    lines
}
