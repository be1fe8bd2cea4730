//! Human-readable capacity parsing
//!
//! Plans request sizes as strings like "100Gi" or "2Ti". Decimal modifiers
//! (K, M, G, T, P) are powers of 1000, binary modifiers (Ki, Mi, Gi, Ti, Pi)
//! are powers of 1024.

use crate::error::{Error, Result};

/// Smallest volume ONTAP will provision for a share: 20 MiB.
pub const MIN_VOLUME_SIZE_BYTES: u64 = 20 * 1024 * 1024;

/// Parse a capacity string (e.g. "100Gi", "2Ti", "500M") to bytes.
pub fn parse_capacity(s: &str) -> Result<u64> {
    let s = s.trim();
    if s.is_empty() {
        return Err(Error::CapacityParse("empty capacity string".into()));
    }

    // Find where the number ends and the modifier begins
    let mut num_end = 0;
    for (i, c) in s.char_indices() {
        if !c.is_ascii_digit() && c != '.' {
            num_end = i;
            break;
        }
        num_end = i + 1;
    }

    let num_str = &s[..num_end];
    let unit_str = s[num_end..].trim();

    let num: f64 = num_str
        .parse()
        .map_err(|_| Error::CapacityParse(format!("invalid number: {}", num_str)))?;

    let multiplier: u64 = match unit_str {
        "" | "B" => 1,
        "K" => 1000,
        "M" => 1000 * 1000,
        "G" => 1000 * 1000 * 1000,
        "T" => 1000 * 1000 * 1000 * 1000,
        "P" => 1000 * 1000 * 1000 * 1000 * 1000,
        "Ki" => 1024,
        "Mi" => 1024 * 1024,
        "Gi" => 1024 * 1024 * 1024,
        "Ti" => 1024 * 1024 * 1024 * 1024,
        "Pi" => 1024 * 1024 * 1024 * 1024 * 1024,
        _ => {
            return Err(Error::CapacityParse(format!(
                "unknown modifier: {}. Allowed modifiers: K,M,G,T,P,Ki,Mi,Gi,Ti,Pi",
                unit_str
            )))
        }
    };

    Ok((num * multiplier as f64) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_capacity() {
        assert_eq!(parse_capacity("100").unwrap(), 100);
        assert_eq!(parse_capacity("100B").unwrap(), 100);
        assert_eq!(parse_capacity("1K").unwrap(), 1000);
        assert_eq!(parse_capacity("1Ki").unwrap(), 1024);
        assert_eq!(parse_capacity("1M").unwrap(), 1000 * 1000);
        assert_eq!(parse_capacity("1Mi").unwrap(), 1024 * 1024);
        assert_eq!(parse_capacity("1Gi").unwrap(), 1024 * 1024 * 1024);
        assert_eq!(parse_capacity("100Gi").unwrap(), 100 * 1024 * 1024 * 1024);
        assert_eq!(parse_capacity("2Ti").unwrap(), 2 * 1024 * 1024 * 1024 * 1024);

        assert!(parse_capacity("").is_err());
        assert!(parse_capacity("abc").is_err());
        assert!(parse_capacity("100X").is_err());
        assert!(parse_capacity("100mi").is_err());
    }

    #[test]
    fn test_minimum_boundary() {
        // 20Mi is the exact floor; one byte less must land below it
        assert_eq!(parse_capacity("20Mi").unwrap(), MIN_VOLUME_SIZE_BYTES);
        assert_eq!(parse_capacity("20Mi").unwrap(), 20_971_520);
        assert!(parse_capacity("20971519").unwrap() < MIN_VOLUME_SIZE_BYTES);
    }

    #[test]
    fn test_fractional_sizes() {
        assert_eq!(parse_capacity("1.5Ki").unwrap(), 1536);
        assert_eq!(parse_capacity("0.5Gi").unwrap(), 512 * 1024 * 1024);
    }
}
