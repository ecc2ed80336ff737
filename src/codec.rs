//! Coordinate and color codec
//!
//! Conversions between zero-based grid coordinates and A1 notation, between
//! `#rrggbb` colors and the service's fractional RGB, and parsing of
//! sheet-qualified ranges such as `'[DB] Investors'!A2:A`.

use crate::error::{SheetError, SheetResult};
use crate::types::Rgb;

/// Convert a zero-based column index to its letter form
///
/// Examples:
/// - 0 → A
/// - 25 → Z
/// - 26 → AA
/// - 701 → ZZ
pub fn column_to_letters(index: usize) -> String {
    let mut result = String::new();
    let mut idx = index;

    loop {
        let remainder = idx % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }

    result
}

/// Inverse of [`column_to_letters`]. Letters are case-insensitive.
pub fn letters_to_column(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    // One-based while accumulating, so the widest column needs usize::MAX + 1.
    let mut acc: u128 = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = u128::from(ch.to_ascii_uppercase() as u8 - b'A') + 1;
        acc = acc.checked_mul(26)?.checked_add(digit)?;
    }
    usize::try_from(acc - 1).ok()
}

/// Encode zero-based `(row, col)` as an A1 reference: `(1, 1)` → `B2`.
/// Defined for every `usize` pair.
pub fn encode_ref(row: usize, col: usize) -> String {
    format!("{}{}", column_to_letters(col), row as u128 + 1)
}

/// Decode an A1 reference to zero-based `(row, col)`.
pub fn decode_ref(reference: &str) -> SheetResult<(usize, usize)> {
    let invalid = || SheetError::InvalidReference(reference.to_string());

    let split = reference
        .find(|c: char| !c.is_ascii_alphabetic())
        .ok_or_else(invalid)?;
    let (letters, digits) = reference.split_at(split);

    let col = letters_to_column(letters).ok_or_else(invalid)?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let row: u128 = digits.parse().map_err(|_| invalid())?;
    if row == 0 {
        return Err(invalid());
    }
    let row = usize::try_from(row - 1).map_err(|_| invalid())?;

    Ok((row, col))
}

/// Parse `#rrggbb` (or `rrggbb`, `0xrrggbb`) into fractional RGB.
pub fn hex_to_fraction(hex: &str) -> SheetResult<Rgb> {
    let invalid = || SheetError::InvalidColor(hex.to_string());

    let digits = hex
        .strip_prefix('#')
        .or_else(|| hex.strip_prefix("0x"))
        .or_else(|| hex.strip_prefix("0X"))
        .unwrap_or(hex);
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let byte = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| invalid());
    Ok(Rgb {
        red: byte(0)? as f64 / 255.0,
        green: byte(2)? as f64 / 255.0,
        blue: byte(4)? as f64 / 255.0,
    })
}

/// Inverse of [`hex_to_fraction`], rounding to the nearest byte.
pub fn fraction_to_hex(rgb: Rgb) -> String {
    let byte = |f: f64| (f.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!(
        "#{:02x}{:02x}{:02x}",
        byte(rgb.red),
        byte(rgb.green),
        byte(rgb.blue)
    )
}

/// Quote a sheet title for use in a range: `It's` → `'It''s'`.
pub fn quote_sheet(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// Sheet-qualified A1 range: `'Sheet'!A1`, `'Sheet'!B:B` or just `'Sheet'`.
pub fn sheet_range(title: &str, cells: &str) -> String {
    if cells.is_empty() {
        quote_sheet(title)
    } else {
        format!("{}!{}", quote_sheet(title), cells)
    }
}

/// A parsed range. Missing bounds mean "unbounded" in that direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRef {
    pub sheet: String,
    pub start_row: Option<usize>,
    pub start_col: Option<usize>,
    pub end_row: Option<usize>,
    pub end_col: Option<usize>,
}

impl RangeRef {
    /// The whole sheet.
    pub fn is_whole_sheet(&self) -> bool {
        self.start_row.is_none()
            && self.start_col.is_none()
            && self.end_row.is_none()
            && self.end_col.is_none()
    }
}

/// Parse `Sheet`, `'Quoted Sheet'!A1`, `Sheet!A2:C5`, `Sheet!B:B` or `Sheet!A2:A`.
pub fn parse_range(range: &str) -> SheetResult<RangeRef> {
    let invalid = || SheetError::InvalidReference(range.to_string());

    let (sheet, rest) = if let Some(quoted) = range.strip_prefix('\'') {
        // Find the closing quote, skipping doubled quotes.
        let bytes = quoted.as_bytes();
        let mut i = 0;
        let mut close = None;
        while i < bytes.len() {
            if bytes[i] == b'\'' {
                if bytes.get(i + 1) == Some(&b'\'') {
                    i += 2;
                    continue;
                }
                close = Some(i);
                break;
            }
            i += 1;
        }
        let close = close.ok_or_else(invalid)?;
        let sheet = quoted[..close].replace("''", "'");
        (sheet, &quoted[close + 1..])
    } else {
        match range.rfind('!') {
            Some(pos) => (range[..pos].to_string(), &range[pos..]),
            None => (range.to_string(), ""),
        }
    };

    if sheet.is_empty() {
        return Err(invalid());
    }

    let cells = if rest.is_empty() {
        ""
    } else {
        let cells = rest.strip_prefix('!').ok_or_else(invalid)?;
        if cells.is_empty() {
            return Err(invalid());
        }
        cells
    };

    let mut parsed = RangeRef {
        sheet,
        start_row: None,
        start_col: None,
        end_row: None,
        end_col: None,
    };
    if cells.is_empty() {
        return Ok(parsed);
    }

    let (start, end) = match cells.split_once(':') {
        Some((a, b)) => (a, Some(b)),
        None => (cells, None),
    };

    let (start_col, start_row) = parse_endpoint(start).ok_or_else(invalid)?;
    parsed.start_col = start_col;
    parsed.start_row = start_row;
    match end {
        Some(end) => {
            let (end_col, end_row) = parse_endpoint(end).ok_or_else(invalid)?;
            parsed.end_col = end_col;
            parsed.end_row = end_row;
        }
        None => {
            // A single cell covers exactly itself.
            parsed.end_col = start_col;
            parsed.end_row = start_row;
        }
    }

    Ok(parsed)
}

/// `B2` → `(Some(1), Some(1))`, `B` → `(Some(1), None)`, `2` → `(None, Some(1))`.
fn parse_endpoint(endpoint: &str) -> Option<(Option<usize>, Option<usize>)> {
    if endpoint.is_empty() {
        return None;
    }
    let split = endpoint
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(endpoint.len());
    let (letters, digits) = endpoint.split_at(split);

    let col = if letters.is_empty() {
        None
    } else {
        Some(letters_to_column(letters)?)
    };
    let row = if digits.is_empty() {
        None
    } else {
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let n: usize = digits.parse().ok()?;
        if n == 0 {
            return None;
        }
        Some(n - 1)
    };
    Some((col, row))
}
