//! Format tables with a stupid API.
//!
//! Each row is a single tab-separated string; columns are aligned to the
//! widest cell in that column across all rows, then printed to stdout
//! space-padded. Used by the `shock` CLI for `user list` / `node list`.

/// Prints `rows` (each a tab-separated line, first row is typically a
/// header) as a column-aligned table.
pub fn format_table(rows: Vec<String>) {
	let split: Vec<Vec<&str>> = rows.iter().map(|row| row.split('\t').collect()).collect();

	let n_cols = split.iter().map(|r| r.len()).max().unwrap_or(0);
	let mut col_width = vec![0usize; n_cols];
	for row in &split {
		for (i, cell) in row.iter().enumerate() {
			col_width[i] = col_width[i].max(cell.chars().count());
		}
	}

	for row in &split {
		let mut line = String::new();
		for (i, cell) in row.iter().enumerate() {
			if i + 1 == row.len() {
				line.push_str(cell);
			} else {
				line.push_str(&format!("{:width$}  ", cell, width = col_width[i]));
			}
		}
		println!("{}", line);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn aligns_columns_to_widest_cell() {
		// Smoke test: just confirm it doesn't panic on ragged rows.
		format_table(vec![
			"ID\tName\tSize".to_string(),
			"1\ta-long-name\t10".to_string(),
			"22\tb\t2".to_string(),
		]);
	}
}
