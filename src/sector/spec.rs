//! Parser for bad sector lists such as `"0-4,9,12-15"`.

use crate::config::MAX_SPEC_SECTORS;
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors produced while parsing a bad sector list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A term is not a non-negative decimal integer.
    #[error("invalid sector number {token:?}")]
    InvalidNumber { token: String },

    /// A range term is missing a bound or has extra separators.
    #[error("malformed sector range {token:?}")]
    MalformedRange { token: String },

    /// A range whose first sector is greater than its last.
    #[error("reversed sector range {token:?} ({first} > {last})")]
    ReversedRange { token: String, first: u64, last: u64 },

    /// The list expands to more sectors than the simulator will track.
    #[error("sector list expands to more than {limit} sectors")]
    TooManySectors { limit: u64 },
}

/// Parse a bad sector list into the set of sectors it names.
///
/// Grammar: `spec = "" | term ("," term)*`, `term = N | N "-" M`, where the
/// range `N-M` is inclusive. Ranges are expanded eagerly.
pub fn parse_sector_spec(spec: &str) -> Result<BTreeSet<u64>, ParseError> {
    let mut sectors = BTreeSet::new();

    if spec.is_empty() {
        return Ok(sectors);
    }

    let mut expanded: u64 = 0;

    for term in spec.split(',') {
        let (first, last) = parse_term(term)?;

        // Counts overlapping terms twice; the limit is on work, not on set size.
        expanded = expanded.saturating_add((last - first).saturating_add(1));
        if expanded > MAX_SPEC_SECTORS {
            return Err(ParseError::TooManySectors {
                limit: MAX_SPEC_SECTORS,
            });
        }

        sectors.extend(first..=last);
    }

    Ok(sectors)
}

/// Format ascending sectors back into the compact list form, e.g. `"1-3,7"`.
pub fn format_sector_spec(sectors: &[u64]) -> String {
    let mut terms: Vec<String> = Vec::new();
    let mut iter = sectors.iter().copied().peekable();

    while let Some(first) = iter.next() {
        let mut last = first;
        while last < u64::MAX && iter.peek() == Some(&(last + 1)) {
            last += 1;
            iter.next();
        }
        if first == last {
            terms.push(first.to_string());
        } else {
            terms.push(format!("{}-{}", first, last));
        }
    }

    terms.join(",")
}

/// Parse one term into an inclusive `(first, last)` pair.
fn parse_term(term: &str) -> Result<(u64, u64), ParseError> {
    match term.split_once('-') {
        None => {
            let sector = parse_number(term)?;
            Ok((sector, sector))
        }
        Some((lo, hi)) => {
            if lo.is_empty() || hi.is_empty() || hi.contains('-') {
                return Err(ParseError::MalformedRange {
                    token: term.to_string(),
                });
            }
            let first = parse_number(lo)?;
            let last = parse_number(hi)?;
            if first > last {
                return Err(ParseError::ReversedRange {
                    token: term.to_string(),
                    first,
                    last,
                });
            }
            Ok((first, last))
        }
    }
}

fn parse_number(token: &str) -> Result<u64, ParseError> {
    // `u64::from_str` also accepts a leading '+'.
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidNumber {
            token: token.to_string(),
        });
    }
    token.parse().map_err(|_| ParseError::InvalidNumber {
        token: token.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(sectors: &[u64]) -> BTreeSet<u64> {
        sectors.iter().copied().collect()
    }

    #[test]
    fn test_range() {
        assert_eq!(parse_sector_spec("0-4").unwrap(), set(&[0, 1, 2, 3, 4]));
    }

    #[test]
    fn test_mixed_terms() {
        assert_eq!(
            parse_sector_spec("1,3,5-7").unwrap(),
            set(&[1, 3, 5, 6, 7])
        );
    }

    #[test]
    fn test_empty() {
        assert!(parse_sector_spec("").unwrap().is_empty());
    }

    #[test]
    fn test_single_sector_range() {
        assert_eq!(parse_sector_spec("9-9").unwrap(), set(&[9]));
    }

    #[test]
    fn test_overlapping_terms_merge() {
        assert_eq!(parse_sector_spec("2-5,4,3-6").unwrap(), set(&[2, 3, 4, 5, 6]));
    }

    #[test]
    fn test_non_numeric_token() {
        assert_eq!(
            parse_sector_spec("x"),
            Err(ParseError::InvalidNumber {
                token: "x".to_string()
            })
        );
    }

    #[test]
    fn test_missing_upper_bound() {
        assert_eq!(
            parse_sector_spec("3-"),
            Err(ParseError::MalformedRange {
                token: "3-".to_string()
            })
        );
    }

    #[test]
    fn test_missing_lower_bound() {
        assert!(matches!(
            parse_sector_spec("-3"),
            Err(ParseError::MalformedRange { .. })
        ));
    }

    #[test]
    fn test_trailing_garbage() {
        assert_eq!(
            parse_sector_spec("1,2x"),
            Err(ParseError::InvalidNumber {
                token: "2x".to_string()
            })
        );
        assert!(matches!(
            parse_sector_spec("1-2-3"),
            Err(ParseError::MalformedRange { .. })
        ));
    }

    #[test]
    fn test_empty_terms() {
        assert!(parse_sector_spec(",").is_err());
        assert!(parse_sector_spec("1,").is_err());
        assert!(parse_sector_spec("1,,2").is_err());
    }

    #[test]
    fn test_sign_and_whitespace_rejected() {
        assert!(parse_sector_spec("+3").is_err());
        assert!(parse_sector_spec("1, 2").is_err());
        assert!(parse_sector_spec(" 1").is_err());
    }

    #[test]
    fn test_reversed_range() {
        assert_eq!(
            parse_sector_spec("7-5"),
            Err(ParseError::ReversedRange {
                token: "7-5".to_string(),
                first: 7,
                last: 5
            })
        );
    }

    #[test]
    fn test_overflowing_number() {
        assert!(matches!(
            parse_sector_spec("99999999999999999999999"),
            Err(ParseError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_format_collapses_runs() {
        assert_eq!(format_sector_spec(&[]), "");
        assert_eq!(format_sector_spec(&[4]), "4");
        assert_eq!(format_sector_spec(&[1, 2, 3, 7, 9, 10]), "1-3,7,9-10");
    }

    #[test]
    fn test_format_parses_back() {
        let sectors = parse_sector_spec("0-2,5,8-11").unwrap();
        let listed: Vec<u64> = sectors.iter().copied().collect();
        assert_eq!(format_sector_spec(&listed), "0-2,5,8-11");
    }

    #[test]
    fn test_too_many_sectors() {
        let spec = format!("0-{}", MAX_SPEC_SECTORS);
        assert_eq!(
            parse_sector_spec(&spec),
            Err(ParseError::TooManySectors {
                limit: MAX_SPEC_SECTORS
            })
        );
    }

    #[test]
    fn test_full_u64_range_does_not_overflow() {
        let spec = format!("0-{}", u64::MAX);
        assert!(matches!(
            parse_sector_spec(&spec),
            Err(ParseError::TooManySectors { .. })
        ));
    }
}
