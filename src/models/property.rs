//! Tri-state property values
//!
//! A previously computed column is either missing, a literal `FAILED`
//! marker left by an earlier run, or a real value.

use std::fmt;
use std::str::FromStr;

/// Marker written into a column when extraction of that property failed
pub const FAILED_SENTINEL: &str = "FAILED";

/// One locally computed document property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Property<T> {
    /// Not computed yet (empty cell)
    #[default]
    Unknown,
    /// A previous attempt failed
    Failed,
    /// A computed value
    Value(T),
}

impl<T> Property<T> {
    /// A property needs (re)computation when it is missing or failed
    pub fn is_needed(&self) -> bool {
        !matches!(self, Property::Value(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Property::Failed)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Property::Value(v) => Some(v),
            _ => None,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Property::Unknown => Ok(()),
            Property::Failed => f.write_str(FAILED_SENTINEL),
            Property::Value(v) => write!(f, "{}", v),
        }
    }
}

/// Parses a numeric cell.
///
/// Spreadsheet exports often store integers as `2048.0`, so whole floats are
/// accepted. Anything else that is not empty is treated as a failed value and
/// will be recomputed.
pub fn parse_count<T>(raw: &str) -> Property<T>
where
    T: FromStr + TryFrom<u64>,
{
    let cell = raw.trim();
    if cell.is_empty() {
        return Property::Unknown;
    }
    if cell.eq_ignore_ascii_case(FAILED_SENTINEL) {
        return Property::Failed;
    }
    if let Ok(v) = cell.parse::<T>() {
        return Property::Value(v);
    }
    match cell.parse::<f64>() {
        Ok(f) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => {
            T::try_from(f as u64).map_or(Property::Failed, Property::Value)
        }
        _ => Property::Failed,
    }
}

/// Parses a boolean cell (`TRUE`/`FALSE` in any case).
pub fn parse_flag(raw: &str) -> Property<bool> {
    let cell = raw.trim();
    if cell.is_empty() {
        return Property::Unknown;
    }
    match cell.to_ascii_uppercase().as_str() {
        "FAILED" => Property::Failed,
        "TRUE" => Property::Value(true),
        "FALSE" => Property::Value(false),
        _ => Property::Failed,
    }
}

/// Parses the `Tagged` cell.
///
/// Any non-empty value other than `TRUE` or `FAILED` counts as `false`.
pub fn parse_tagged(raw: &str) -> Property<bool> {
    let cell = raw.trim();
    if cell.is_empty() {
        return Property::Unknown;
    }
    match cell.to_ascii_uppercase().as_str() {
        "FAILED" => Property::Failed,
        "TRUE" => Property::Value(true),
        _ => Property::Value(false),
    }
}
