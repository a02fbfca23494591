//! psql-style text tables.
//!
//! ```text
//! +------+--------+
//! | ID   | Status |
//! |------+--------|
//! | cs-1 | Online |
//! +------+--------+
//! ```

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

/// Render rows under headers. Columns whose cells are all numeric are
/// right-aligned; everything else is left-aligned. Missing cells are blank.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let columns = headers.len();
    let cell = |row: &Vec<String>, col: usize| -> String {
        row.get(col).map(|c| c.replace('\n', " ")).unwrap_or_default()
    };

    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|row| (0..columns).map(|col| cell(row, col)).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &body {
        for (col, text) in row.iter().enumerate() {
            widths[col] = widths[col].max(text.chars().count());
        }
    }

    let aligns: Vec<Align> = (0..columns)
        .map(|col| {
            let numeric = body.iter().any(|r| !r[col].is_empty())
                && body
                    .iter()
                    .all(|r| r[col].is_empty() || r[col].parse::<f64>().is_ok());
            if numeric { Align::Right } else { Align::Left }
        })
        .collect();

    let rule = |corner: char, join: char| -> String {
        let mut line = String::new();
        line.push(corner);
        for (i, w) in widths.iter().enumerate() {
            if i > 0 {
                line.push(join);
            }
            line.push_str(&"-".repeat(w + 2));
        }
        line.push(corner);
        line
    };

    let render_row = |cells: &[String]| -> String {
        let mut line = String::from("|");
        for (col, text) in cells.iter().enumerate() {
            let pad = widths[col] - text.chars().count();
            let padded = match aligns[col] {
                Align::Left => format!(" {text}{} ", " ".repeat(pad)),
                Align::Right => format!(" {}{text} ", " ".repeat(pad)),
            };
            line.push_str(&padded);
            line.push('|');
        }
        line
    };

    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let mut lines = Vec::with_capacity(body.len() + 4);
    lines.push(rule('+', '-'));
    lines.push(render_row(&header_cells));
    lines.push(rule('|', '+'));
    lines.extend(body.iter().map(|row| render_row(row)));
    lines.push(rule('+', '-'));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(cells: &[&[&str]]) -> Vec<Vec<String>> {
        cells
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_psql_layout() {
        let rows = rows(&[&["cs-1", "Online"], &["cs-22", "OFFLINE"]]);
        let table = render_table(&["ID", "Status"], &rows);
        let expected = "\
+-------+---------+
| ID    | Status  |
|-------+---------|
| cs-1  | Online  |
| cs-22 | OFFLINE |
+-------+---------+";
        assert_eq!(table, expected);
    }

    #[test]
    fn test_numeric_columns_right_aligned() {
        let rows = rows(&[&["a", "7"], &["b", "12.5"]]);
        let table = render_table(&["Name", "Amps"], &rows);
        assert!(table.contains("| a    |    7 |"));
        assert!(table.contains("| b    | 12.5 |"));
    }

    #[test]
    fn test_empty_rows_and_short_rows() {
        assert_eq!(render_table(&["X"], &[]).lines().count(), 4);

        let rows = rows(&[&["only"]]);
        let table = render_table(&["A", "B"], &rows);
        assert!(table.contains("| only |   |"));
    }
}
