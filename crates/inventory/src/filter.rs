//! VID:PID device filters
//!
//! Filter format is `"0xVID:0xPID"` where either half may be `*`, e.g.
//! `"0x1234:0x5678"`, `"0x04f9:*"` or `"*:*"`.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from parsing a filter pattern
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("Invalid filter format '{0}', expected VID:PID (e.g., '0x1234:0x5678' or '0x1234:*')")]
    Format(String),

    #[error("Invalid {name} '{value}', must start with '0x' (e.g., '0x1234')")]
    MissingPrefix { name: &'static str, value: String },

    #[error("Invalid {name} '{value}', hex part must be 1-4 digits")]
    Length { name: &'static str, value: String },

    #[error("Invalid {name} '{value}', not a valid hex number")]
    NotHex { name: &'static str, value: String },
}

/// One side of a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPattern {
    Any,
    Exact(u16),
}

impl IdPattern {
    fn matches(&self, id: u16) -> bool {
        match self {
            IdPattern::Any => true,
            IdPattern::Exact(expected) => *expected == id,
        }
    }

    fn parse(value: &str, name: &'static str) -> Result<Self, FilterError> {
        if value == "*" {
            return Ok(IdPattern::Any);
        }

        let Some(hex_part) = value
            .strip_prefix("0x")
            .or_else(|| value.strip_prefix("0X"))
        else {
            return Err(FilterError::MissingPrefix {
                name,
                value: value.to_string(),
            });
        };

        if hex_part.is_empty() || hex_part.len() > 4 {
            return Err(FilterError::Length {
                name,
                value: value.to_string(),
            });
        }

        u16::from_str_radix(hex_part, 16)
            .map(IdPattern::Exact)
            .map_err(|_| FilterError::NotHex {
                name,
                value: value.to_string(),
            })
    }
}

impl fmt::Display for IdPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdPattern::Any => f.write_str("*"),
            IdPattern::Exact(id) => write!(f, "0x{:04x}", id),
        }
    }
}

/// VID:PID match pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFilter {
    pub vendor: IdPattern,
    pub product: IdPattern,
}

impl DeviceFilter {
    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor.matches(vendor_id) && self.product.matches(product_id)
    }
}

impl FromStr for DeviceFilter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let [vid, pid] = parts.as_slice() else {
            return Err(FilterError::Format(s.to_string()));
        };

        Ok(Self {
            vendor: IdPattern::parse(vid, "VID")?,
            product: IdPattern::parse(pid, "PID")?,
        })
    }
}

impl fmt::Display for DeviceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.vendor, self.product)
    }
}

/// Parse a list of filter patterns, failing on the first invalid one
pub fn parse_filters<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<DeviceFilter>, FilterError> {
    patterns.iter().map(|p| p.as_ref().parse()).collect()
}

/// Check a VID/PID pair against a filter list
///
/// An empty list allows every device.
pub fn is_allowed(filters: &[DeviceFilter], vendor_id: u16, product_id: u16) -> bool {
    filters.is_empty() || filters.iter().any(|f| f.matches(vendor_id, product_id))
}
