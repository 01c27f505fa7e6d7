//! Minimal CSV codec for the persisted tables. Tolerates quoted fields and
//! CRLF on read; quotes only the fields that need it on write.

use std::fmt::Display;
use std::io::{self, Write};
use std::mem::take;
use std::str::FromStr;

const SEP: char = ',';

pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes {
                    if matches!(chars.peek(), Some('"')) {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            SEP if !in_quotes => row.push(take(&mut field)),
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && matches!(chars.peek(), Some('\n')) {
                    chars.next();
                }
                row.push(take(&mut field));
                if row.len() > 1 || !row[0].is_empty() {
                    rows.push(take(&mut row));
                } else {
                    row.clear();
                }
            }
            _ => field.push(ch),
        }
    }

    // Flush a trailing record with no final newline.
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    rows
}

fn needs_quotes(field: &str) -> bool {
    field.contains(SEP) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

pub fn write_row<W: Write>(mut w: W, cells: &[String]) -> io::Result<()> {
    for (idx, cell) in cells.iter().enumerate() {
        if idx > 0 {
            write!(w, "{SEP}")?;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{cell}")?;
        }
    }
    writeln!(w)
}

/// Render a header plus data rows as one CSV document.
pub fn table_to_string(header: &[String], rows: &[Vec<String>]) -> String {
    let mut buf: Vec<u8> = Vec::new();
    let _ = write_row(&mut buf, header);
    for row in rows {
        let _ = write_row(&mut buf, row);
    }
    match String::from_utf8(buf) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(&e.into_bytes()).into_owned(),
    }
}

/// Optional values serialize as the empty cell.
pub fn opt_cell<T: Display>(value: &Option<T>) -> String {
    value.as_ref().map(|v| v.to_string()).unwrap_or_default()
}

/// Empty cells deserialize as `None`; anything unparseable too.
pub fn parse_cell<T: FromStr>(cell: &str) -> Option<T> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<T>().ok()
}
