//! Plain-text summary of a strategy book for console output.

use std::fmt;

use super::book::StrategyBook;

/// Borrowing wrapper that renders a book as aligned text tables.
pub struct BookSummary<'a> {
    pub name: &'a str,
    pub book: &'a StrategyBook,
}

impl<'a> BookSummary<'a> {
    pub fn new(name: &'a str, book: &'a StrategyBook) -> Self {
        BookSummary { name, book }
    }
}

fn write_row<'s>(
    f: &mut fmt::Formatter<'_>,
    widths: &[usize],
    cells: impl Iterator<Item = &'s str>,
) -> fmt::Result {
    for (i, (cell, width)) in cells.zip(widths.iter().copied()).enumerate() {
        if i > 0 {
            f.write_str("  ")?;
        }
        write!(f, "{cell:<width$}")?;
    }
    writeln!(f)
}

fn write_table(f: &mut fmt::Formatter<'_>, header: &[&str], rows: &[Vec<String>]) -> fmt::Result {
    let mut widths: Vec<usize> = header.iter().map(|h| h.len()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.len());
        }
    }
    write_row(f, &widths, header.iter().copied())?;
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    write_row(f, &widths, rule.iter().map(String::as_str))?;
    for row in rows {
        write_row(f, &widths, row.iter().map(String::as_str))?;
    }
    Ok(())
}

impl fmt::Display for BookSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== {} ===", self.name)?;

        writeln!(f, "@@@ POSITION @@@")?;
        let positions: Vec<Vec<String>> = self
            .book
            .positions()
            .map(|(inst, pos)| vec![inst.to_string(), pos.long.to_string(), pos.short.to_string()])
            .collect();
        write_table(f, &["instrument", "LONG", "SHORT"], &positions)?;

        writeln!(f, "@@@ ORDER @@@")?;
        let orders: Vec<Vec<String>> = self
            .book
            .outstanding()
            .map(|o| {
                vec![
                    o.index.to_string(),
                    o.instrument.clone(),
                    o.action.to_string(),
                    o.direction.to_string(),
                    o.quantity.to_string(),
                ]
            })
            .collect();
        write_table(
            f,
            &["index", "instrument", "ACTION", "DIRECTION", "QUANTITY"],
            &orders,
        )?;

        writeln!(f, "@@@ UNFILLED ORDER @@@")?;
        writeln!(f, "{:?}", self.book.outstanding_indices())?;

        writeln!(f, "@@@ RECORD @@@")?;
        writeln!(f, " - Signal: {}", self.book.signals().len())?;
        writeln!(f, " - Order: {}", self.book.orders().len())?;
        write!(f, " - Fill: {}", self.book.fills().len())
    }
}
