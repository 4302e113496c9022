//! Cubic curve chain decomposition.
//!
//! The plotter only understands single cubic Bézier records, so a path is
//! treated as a chain of curves sharing anchor points:
//!
//! ```text
//! M x0 y0 C x1 y1 x2 y2 x3 y3 C x4 y4 x5 y5 x6 y6 ...
//! ```
//!
//! Command letters are ignored. The first segment takes coordinates
//! `[0, 8)` and segment `i > 0` takes `[6 + 8(i-1), 14 + 8(i-1))`. The
//! second segment therefore starts on the first segment's end anchor;
//! from the third segment on, records are contiguous eight-number runs.
//! The firmware was fed exactly these offsets, so they are kept.

use xyplot_core::GeometryError;

/// Coordinates consumed by one cubic segment
pub const SEGMENT_LEN: usize = 8;

/// Coordinates the second segment shares with the first (one anchor pair)
pub const SEGMENT_OVERLAP: usize = 2;

/// Offset of the second segment within the coordinate list
const SECOND_SEGMENT_START: usize = SEGMENT_LEN - SEGMENT_OVERLAP;

/// Smallest coordinate count that satisfies the chain rule
pub const MIN_CHAIN_LEN: usize = SECOND_SEGMENT_START + SEGMENT_LEN;

/// Extract every number from SVG path or point data
///
/// Letters, commas and whitespace act as separators. A sign starts a new
/// number, and so does a second decimal point (`1.5.5` is `1.5`, `0.5`).
/// Exponents (`1e3`, `2.5E-2`) are accepted.
pub fn extract_coordinates(data: &str) -> Vec<f64> {
    let bytes = data.as_bytes();
    let mut values = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let starts_number = c.is_ascii_digit()
            || (c == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit))
            || ((c == b'-' || c == b'+')
                && bytes
                    .get(i + 1)
                    .is_some_and(|n| n.is_ascii_digit() || *n == b'.'));
        if !starts_number {
            i += 1;
            continue;
        }

        let start = i;
        if c == b'-' || c == b'+' {
            i += 1;
        }
        let mut seen_dot = false;
        while i < bytes.len() {
            match bytes[i] {
                b'0'..=b'9' => i += 1,
                b'.' if !seen_dot => {
                    seen_dot = true;
                    i += 1;
                }
                _ => break,
            }
        }
        // Exponent only when digits follow, so "2e" leaves the 'e' alone
        if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
            let mut j = i + 1;
            if j < bytes.len() && (bytes[j] == b'-' || bytes[j] == b'+') {
                j += 1;
            }
            if j < bytes.len() && bytes[j].is_ascii_digit() {
                while j < bytes.len() && bytes[j].is_ascii_digit() {
                    j += 1;
                }
                i = j;
            }
        }

        if let Ok(value) = data[start..i].parse::<f64>() {
            values.push(value);
        }
    }

    values
}

/// Number of cubic segments described by `count` coordinates
///
/// The count must satisfy `(count - 6) % 8 == 0`, giving
/// `(count - 6) / 8 + 1` segments. Anything else, including a lone
/// eight-number curve, is rejected rather than truncated.
pub fn segment_count(count: usize) -> Result<usize, GeometryError> {
    if count < MIN_CHAIN_LEN || (count - SECOND_SEGMENT_START) % SEGMENT_LEN != 0 {
        return Err(GeometryError::PathCoordinateCount { count });
    }
    Ok((count - SECOND_SEGMENT_START) / SEGMENT_LEN + 1)
}

/// Start offset of segment `index` within the coordinate list
pub fn segment_start(index: usize) -> usize {
    match index {
        0 => 0,
        i => SECOND_SEGMENT_START + SEGMENT_LEN * (i - 1),
    }
}

/// Split a coordinate chain into eight-number segments
pub fn split_segments(coordinates: &[f64]) -> Result<Vec<&[f64; SEGMENT_LEN]>, GeometryError> {
    let segments = segment_count(coordinates.len())?;

    (0..segments)
        .map(|i| {
            let start = segment_start(i);
            coordinates[start..start + SEGMENT_LEN]
                .try_into()
                .map_err(|_| GeometryError::PathCoordinateCount {
                    count: coordinates.len(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_extract_plain_numbers() {
        assert_eq!(
            extract_coordinates("M10 20 C 30,40 50.5,60 70 80"),
            vec![10.0, 20.0, 30.0, 40.0, 50.5, 60.0, 70.0, 80.0]
        );
    }

    #[test]
    fn test_extract_signs_and_dots() {
        assert_eq!(
            extract_coordinates("M-1-2c.5.5 1.5.25"),
            vec![-1.0, -2.0, 0.5, 0.5, 1.5, 0.25]
        );
        assert_eq!(extract_coordinates("1e2 3E-1"), vec![100.0, 0.3]);
    }

    #[test]
    fn test_extract_ignores_letters() {
        assert!(extract_coordinates("M Z c e").is_empty());
        assert_eq!(extract_coordinates("2e"), vec![2.0]);
    }

    #[test]
    fn test_segment_count() {
        assert_eq!(segment_count(14).unwrap(), 2);
        assert_eq!(segment_count(22).unwrap(), 3);
    }

    #[test]
    fn test_segment_count_rejects_partial_chains() {
        for bad in [0, 6, 7, 8, 9, 13, 15, 16] {
            assert_eq!(
                segment_count(bad),
                Err(GeometryError::PathCoordinateCount { count: bad }),
                "count {}",
                bad
            );
        }
    }

    #[test]
    fn test_split_fourteen() {
        let coords: Vec<f64> = (0..14).map(f64::from).collect();
        let segments = split_segments(&coords).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0], &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(segments[1], &[6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 13.0]);
    }

    #[test]
    fn test_split_twenty_two() {
        let coords: Vec<f64> = (0..22).map(f64::from).collect();
        let segments = split_segments(&coords).unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[2][0], 14.0);
        assert_eq!(segments[2][7], 21.0);
    }

    proptest! {
        #[test]
        fn prop_segments_cover_chain(k in 0usize..20) {
            let n = 14 + 8 * k;
            let coords: Vec<f64> = (0..n).map(|v| v as f64).collect();
            let segments = split_segments(&coords).unwrap();
            prop_assert_eq!(segments.len(), (n - 6) / 8 + 1);
            // The second curve starts on the first curve's end anchor
            prop_assert_eq!(&segments[1][..2], &segments[0][6..]);
            for (i, segment) in segments.iter().enumerate() {
                prop_assert_eq!(segment[0], segment_start(i) as f64);
            }
            prop_assert_eq!(segments.last().unwrap()[7], (n - 1) as f64);
        }

        #[test]
        fn prop_invalid_counts_rejected(n in 0usize..200) {
            prop_assume!(n < 14 || (n - 6) % 8 != 0);
            prop_assert!(segment_count(n).is_err());
        }
    }
}
