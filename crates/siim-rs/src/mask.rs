//! RLE codec for the SIIM pneumothorax mask format.
//!
//! The label file stores each mask as a string of space-separated integers
//! read as (gap, run-length) pairs over the column-major (Fortran order)
//! flattening of the image: advance the cursor by `gap`, write `run-length`
//! foreground pixels, repeat. The first gap is measured from position 0, so
//! it doubles as the absolute start of the first run.
//!
//! Both directions are exact: `decode(encode(m), h, w) == m` for any binary
//! mask, and `encode(decode(s, h, w)) == s` for canonical label strings.
//! Malformed input is an error, never a silently truncated mask.

use thiserror::Error;

use crate::types::Mask;

/// Sentinel label meaning "examined, no pneumothorax found".
///
/// Distinct from an RLE string with zero runs: the dataset uses `"-1"` as a
/// negative label, while `""` is simply an empty run list. Both decode to an
/// all-background mask.
pub const NO_MASK: &str = "-1";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RleError {
    #[error("non-numeric RLE token '{token}' at position {index}")]
    NonNumericToken { token: String, index: usize },
    #[error("RLE has {count} tokens; expected an even number of (gap, length) pairs")]
    OddTokenCount { count: usize },
    #[error("RLE run ends at pixel {end} but the mask holds only {capacity} pixels")]
    RunOutOfBounds { end: u64, capacity: u64 },
}

/// Decode an RLE label into a dense `(height, width)` mask with foreground
/// pixels set to 1.
pub fn decode(rle: &str, height: u32, width: u32) -> Result<Mask, RleError> {
    decode_with_fill(rle, height, width, 1)
}

/// Decode an RLE label into a dense `(height, width)` mask with foreground
/// pixels set to `fill`.
///
/// The `"-1"` sentinel and the empty string both decode to an all-background
/// mask without any integer parsing. Runs are written into a column-major
/// buffer and transposed into the row-major [`Mask`] at the end.
pub fn decode_with_fill(rle: &str, height: u32, width: u32, fill: u8) -> Result<Mask, RleError> {
    let rle = rle.trim();
    if rle.is_empty() || rle == NO_MASK {
        return Ok(Mask::zeros(height, width));
    }

    let tokens = parse_tokens(rle)?;
    if tokens.len() % 2 != 0 {
        return Err(RleError::OddTokenCount {
            count: tokens.len(),
        });
    }

    let total = (height as u64) * (width as u64);
    let mut buf = vec![0u8; total as usize];
    let mut cursor: u64 = 0;
    for pair in tokens.chunks_exact(2) {
        let start = cursor.saturating_add(pair[0]);
        let end = start.saturating_add(pair[1]);
        if end > total {
            return Err(RleError::RunOutOfBounds {
                end,
                capacity: total,
            });
        }
        for slot in &mut buf[start as usize..end as usize] {
            *slot = fill;
        }
        cursor = end;
    }

    Ok(Mask::from_column_major(height, width, buf))
}

/// Encode a dense mask into an RLE label string.
///
/// The mask is scanned in column-major order with explicit run tracking, so
/// a run beginning at flattened position 0 or extending to the final pixel
/// is captured like any other. Each run emits its gap from the previous
/// run's end (from position 0 for the first run) followed by its length.
/// An all-background mask encodes to the empty string.
pub fn encode(mask: &Mask) -> String {
    let buf = mask.to_column_major();

    let mut parts: Vec<String> = Vec::new();
    let mut prev_end: usize = 0;
    let mut run_start: Option<usize> = None;
    for (pos, &v) in buf.iter().enumerate() {
        match (v > 0, run_start) {
            (true, None) => run_start = Some(pos),
            (false, Some(start)) => {
                parts.push((start - prev_end).to_string());
                parts.push((pos - start).to_string());
                prev_end = pos;
                run_start = None;
            }
            _ => {}
        }
    }
    // Run still open at the last flattened position
    if let Some(start) = run_start {
        parts.push((start - prev_end).to_string());
        parts.push((buf.len() - start).to_string());
    }

    parts.join(" ")
}

/// Foreground pixel count of an RLE label, straight from the run lengths.
pub fn area(rle: &str) -> Result<u64, RleError> {
    let rle = rle.trim();
    if rle.is_empty() || rle == NO_MASK {
        return Ok(0);
    }
    let tokens = parse_tokens(rle)?;
    if tokens.len() % 2 != 0 {
        return Err(RleError::OddTokenCount {
            count: tokens.len(),
        });
    }
    Ok(tokens.iter().skip(1).step_by(2).sum())
}

/// Whether a label denotes at least one foreground pixel.
///
/// The `"-1"` sentinel and the empty string are both negative; everything
/// else is taken at face value, matching how the dataset derives its
/// `has_mask` flag.
pub fn has_mask(rle: &str) -> bool {
    let rle = rle.trim();
    !rle.is_empty() && rle != NO_MASK
}

fn parse_tokens(rle: &str) -> Result<Vec<u64>, RleError> {
    rle.split_whitespace()
        .enumerate()
        .map(|(index, token)| {
            token.parse::<u64>().map_err(|_| RleError::NonNumericToken {
                token: token.to_string(),
                index,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_scenario_2x2() {
        // "0 3" over 2x2: column-major buffer [1,1,1,0] transposes to
        //   1 1
        //   1 0
        let mask = decode("0 3", 2, 2).unwrap();
        assert_eq!(mask, Mask::from_rows(2, 2, vec![1, 1, 1, 0]));
    }

    #[test]
    fn test_decode_sentinel() {
        let mask = decode(NO_MASK, 4, 6).unwrap();
        assert_eq!(mask, Mask::zeros(4, 6));
    }

    #[test]
    fn test_decode_empty_string() {
        let mask = decode("", 4, 6).unwrap();
        assert_eq!(mask, Mask::zeros(4, 6));
        let mask = decode("   ", 4, 6).unwrap();
        assert_eq!(mask, Mask::zeros(4, 6));
    }

    #[test]
    fn test_encode_all_zeros() {
        assert_eq!(encode(&Mask::zeros(5, 5)), "");
    }

    #[test]
    fn test_encode_all_ones() {
        let mask = Mask::from_rows(3, 4, vec![1u8; 12]);
        assert_eq!(encode(&mask), "0 12");
        assert_eq!(decode("0 12", 3, 4).unwrap(), mask);
    }

    #[test]
    fn test_roundtrip() {
        // 3x4 mask with two separate blobs
        let mask = Mask::from_rows(3, 4, vec![0, 1, 0, 1, 0, 1, 0, 0, 0, 1, 1, 0]);
        let rle = encode(&mask);
        assert_eq!(decode(&rle, 3, 4).unwrap(), mask);
    }

    #[test]
    fn test_roundtrip_boundary_start() {
        // Foreground run starting at flattened position 0 (top-left column)
        let mut mask = Mask::zeros(4, 4);
        mask.set(0, 0, 1);
        mask.set(1, 0, 1);
        let rle = encode(&mask);
        assert_eq!(rle, "0 2");
        assert_eq!(decode(&rle, 4, 4).unwrap(), mask);
    }

    #[test]
    fn test_roundtrip_boundary_end() {
        // Foreground run ending at the final flattened position (bottom-right)
        let mut mask = Mask::zeros(4, 4);
        mask.set(2, 3, 1);
        mask.set(3, 3, 1);
        let rle = encode(&mask);
        assert_eq!(rle, "14 2");
        assert_eq!(decode(&rle, 4, 4).unwrap(), mask);
    }

    #[test]
    fn test_inverse_roundtrip_canonical() {
        // Canonical string: ascending, non-adjacent runs
        let rle = "3 2 5 1";
        let mask = decode(rle, 4, 4).unwrap();
        assert_eq!(encode(&mask), rle);
    }

    #[test]
    fn test_decode_with_fill() {
        let mask = decode_with_fill("0 3", 2, 2, 255).unwrap();
        assert_eq!(mask, Mask::from_rows(2, 2, vec![255, 255, 255, 0]));
        // Binarization is >0, so a non-unit fill still round-trips
        assert_eq!(encode(&mask), "0 3");
    }

    #[test]
    fn test_decode_odd_token_count() {
        assert_eq!(
            decode("0 3 5", 4, 4),
            Err(RleError::OddTokenCount { count: 3 })
        );
    }

    #[test]
    fn test_decode_non_numeric_token() {
        assert_eq!(
            decode("0 3 x 2", 4, 4),
            Err(RleError::NonNumericToken {
                token: "x".to_string(),
                index: 2
            })
        );
    }

    #[test]
    fn test_decode_run_out_of_bounds() {
        assert_eq!(
            decode("10 8", 4, 4),
            Err(RleError::RunOutOfBounds {
                end: 18,
                capacity: 16
            })
        );
    }

    #[test]
    fn test_area() {
        assert_eq!(area("0 3 5 2").unwrap(), 5);
        assert_eq!(area(NO_MASK).unwrap(), 0);
        assert_eq!(area("").unwrap(), 0);
        assert!(area("1 2 3").is_err());
    }

    #[test]
    fn test_has_mask() {
        assert!(has_mask("0 3"));
        assert!(!has_mask(NO_MASK));
        assert!(!has_mask(""));
        assert!(!has_mask(" -1 "));
    }

    #[test]
    fn test_determinism() {
        let mask = Mask::from_rows(3, 4, vec![0, 1, 0, 1, 0, 1, 0, 0, 0, 1, 1, 0]);
        assert_eq!(encode(&mask), encode(&mask));
        assert_eq!(decode("2 3 4 1", 3, 4), decode("2 3 4 1", 3, 4));
    }
}
