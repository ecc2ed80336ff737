//! Coordinate and color codec tests

use pretty_assertions::assert_eq;
use sheetbase::codec::{
    decode_ref, encode_ref, fraction_to_hex, hex_to_fraction, parse_range, sheet_range,
};
use sheetbase::error::SheetError;

// ═══════════════════════════════════════════════════════════════════════════
// CELL REFERENCES
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_reference_round_trip_over_grid() {
    for row in 0..10_000 {
        for col in 0..1_000 {
            let encoded = encode_ref(row, col);
            assert_eq!(
                decode_ref(&encoded).unwrap(),
                (row, col),
                "round trip failed for {}",
                encoded
            );
        }
    }
}

#[test]
fn test_known_references() {
    assert_eq!(encode_ref(0, 0), "A1");
    assert_eq!(encode_ref(1, 1), "B2");
    assert_eq!(encode_ref(9, 25), "Z10");
    assert_eq!(encode_ref(0, 26), "AA1");
    assert_eq!(encode_ref(99, 701), "ZZ100");
    assert_eq!(encode_ref(0, 702), "AAA1");
    assert_eq!(decode_ref("c2").unwrap(), (1, 2));
}

#[test]
fn test_malformed_references_rejected() {
    for bad in ["", "A", "12", "A0", "2C", "A1B", "A-1", "A 1", "$A$1"] {
        assert!(
            matches!(decode_ref(bad), Err(SheetError::InvalidReference(_))),
            "accepted '{}'",
            bad
        );
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// COLORS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_color_round_trip() {
    for hex in ["#000000", "#ffffff", "#cfe2f3", "#d9ead3", "#fce5cd", "#0a0b0c"] {
        let rgb = hex_to_fraction(hex).unwrap();
        assert_eq!(fraction_to_hex(rgb), hex);
    }
}

#[test]
fn test_color_round_trip_every_channel_value() {
    for value in 0..=255u32 {
        let hex = format!("#{:02x}{:02x}{:02x}", value, 255 - value, value / 2);
        assert_eq!(fraction_to_hex(hex_to_fraction(&hex).unwrap()), hex);
    }
}

#[test]
fn test_color_prefixes_and_case() {
    let plain = hex_to_fraction("CFE2F3").unwrap();
    assert_eq!(hex_to_fraction("#cfe2f3").unwrap(), plain);
    assert_eq!(hex_to_fraction("0xcfe2f3").unwrap(), plain);
    assert!((plain.red - 207.0 / 255.0).abs() < 1e-12);
}

#[test]
fn test_bad_colors_rejected() {
    for bad in ["", "#fff", "#ggeeff", "#cfe2f3aa", "blue"] {
        assert!(
            matches!(hex_to_fraction(bad), Err(SheetError::InvalidColor(_))),
            "accepted '{}'",
            bad
        );
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// RANGES
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_sheet_range_quotes_names() {
    assert_eq!(sheet_range("[DB] Investors", "A:A"), "'[DB] Investors'!A:A");
    assert_eq!(sheet_range("Bob's", "A1"), "'Bob''s'!A1");
    assert_eq!(sheet_range("Summary", ""), "'Summary'");
}

#[test]
fn test_parse_quoted_range() {
    let range = parse_range(&sheet_range("Bob's", "B2:C5")).unwrap();
    assert_eq!(range.sheet, "Bob's");
    assert_eq!(range.start_row, Some(1));
    assert_eq!(range.start_col, Some(1));
    assert_eq!(range.end_row, Some(4));
    assert_eq!(range.end_col, Some(2));
}
