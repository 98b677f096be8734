//! Patch codes in the `size, address, original, changed` text form.
//!
//! ```text
//! # skip the modem check
//! 32, 003c4f58, 0x00000000, 0x0015f110
//! 16, 0x0035a662, 0, 0x2403
//! ```
//!
//! `address` is always hex (the `0x` is optional). `original` and `changed` take a prefix to pick
//! the base (`0x`, `0o`, `0b`, a leading `0` for octal), decimal otherwise.

use tracing::trace;

use super::{DataPatch, PatchWidth};
use crate::error::PatchCodeError;

/// Parses every code in `text`. Lines with fewer than four fields are ignored.
pub fn parse_patch_codes(text: &str) -> Result<Vec<DataPatch>, PatchCodeError> {
    let mut patches = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line_number = index + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields = line.split(',').map(str::trim).collect::<Vec<_>>();
        let [size, address, original, changed, ..] = fields.as_slice() else {
            trace!(line = line_number, "skipping short patch code line");
            continue;
        };

        let width = size
            .parse::<u32>()
            .ok()
            .and_then(PatchWidth::from_bits)
            .ok_or_else(|| PatchCodeError::InvalidSize {
                line: line_number,
                value: size.to_string(),
            })?;

        let address = u32::from_str_radix(address.trim_start_matches("0x"), 16).map_err(|_| {
            PatchCodeError::InvalidNumber {
                line: line_number,
                field: "address",
                value: address.to_string(),
            }
        })?;

        let original = parse_prefixed(original)
            .filter(|value| *value <= width.max_value())
            .ok_or_else(|| PatchCodeError::InvalidNumber {
                line: line_number,
                field: "original",
                value: original.to_string(),
            })?;

        let value = parse_prefixed(changed)
            .filter(|value| *value <= width.max_value())
            .ok_or_else(|| PatchCodeError::InvalidNumber {
                line: line_number,
                field: "changed",
                value: changed.to_string(),
            })?;

        patches.push(DataPatch {
            width,
            address,
            original: Some(original),
            value,
        });
    }

    Ok(patches)
}

fn parse_prefixed(value: &str) -> Option<u32> {
    let lower = value.to_ascii_lowercase();

    let (digits, radix) = if let Some(hex) = lower.strip_prefix("0x") {
        (hex, 16)
    } else if let Some(octal) = lower.strip_prefix("0o") {
        (octal, 8)
    } else if let Some(binary) = lower.strip_prefix("0b") {
        (binary, 2)
    } else if let Some(octal) = lower.strip_prefix('0').filter(|rest| !rest.is_empty()) {
        (octal, 8)
    } else {
        (lower.as_str(), 10)
    };

    u32::from_str_radix(digits, radix).ok()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn parses_simple_lines() {
        let patches = parse_patch_codes("8,0,0,0\n32,0xffffffff,1,2").unwrap();

        assert_eq!(
            patches,
            vec![
                DataPatch {
                    width: PatchWidth::Byte,
                    address: 0,
                    original: Some(0),
                    value: 0,
                },
                DataPatch {
                    width: PatchWidth::Word,
                    address: 0xffff_ffff,
                    original: Some(1),
                    value: 2,
                },
            ]
        );
    }

    #[rstest]
    fn skips_comments_blanks_and_short_lines() {
        let text = "\t# comment
            32, ffffffff, 123, 0x0c500000,
            16, 0x8c500000,   0x0000, 0x911f

            16, 0x8c500006, 10, 0x630c,
            16, 0x8c500008
        ";

        let patches = parse_patch_codes(text).unwrap();

        assert_eq!(patches.len(), 3);
        assert_eq!(patches[0].original, Some(123));
        assert_eq!(patches[0].value, 0x0c50_0000);
        assert_eq!(patches[1].address, 0x8c50_0000);
        assert_eq!(patches[2].original, Some(10));
    }

    #[rstest]
    #[case("0x1f", Some(0x1f))]
    #[case("0o17", Some(0o17))]
    #[case("017", Some(0o17))]
    #[case("0b101", Some(0b101))]
    #[case("0", Some(0))]
    #[case("42", Some(42))]
    #[case("0x", None)]
    #[case("09", None)]
    fn prefixed_numbers(#[case] value: &str, #[case] expected: Option<u32>) {
        assert_eq!(parse_prefixed(value), expected);
    }

    #[rstest]
    fn rejects_bad_sizes() {
        assert_eq!(
            parse_patch_codes("# header\n24, 0, 0, 0"),
            Err(PatchCodeError::InvalidSize {
                line: 2,
                value: "24".into(),
            })
        );
    }

    #[rstest]
    fn rejects_values_wider_than_the_patch() {
        assert!(matches!(
            parse_patch_codes("8, 100, 0, 0x100"),
            Err(PatchCodeError::InvalidNumber {
                field: "changed",
                ..
            })
        ));
    }
}
