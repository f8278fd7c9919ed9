//! Threshold conditions and their evaluation
//!
//! A condition describes the *acceptable* region for a reading. A reading
//! outside that region is the alarm case.

use std::fmt;

use super::error::WatchError;

const MORE_CODE: u8 = 0;
const LESS_CODE: u8 = 1;
const RANGE_CODE: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Condition {
    /// Acceptable while reading > threshold
    MoreThan(f64),
    /// Acceptable while reading < threshold
    LessThan(f64),
    /// Acceptable while min < reading < max
    ExclusiveRange { min: f64, max: f64 },
}

impl Condition {
    pub fn exclusive_range(min: f64, max: f64) -> Result<Self, WatchError> {
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(WatchError::InvalidRange { min, max });
        }
        Ok(Condition::ExclusiveRange { min, max })
    }

    /// Build from the on-disk condition code and value field
    pub fn from_parts(code: &str, value: &str) -> Result<Self, WatchError> {
        let code: u8 = code
            .parse()
            .map_err(|_| WatchError::InvalidCondition(code.to_string()))?;
        match code {
            MORE_CODE => Ok(Condition::MoreThan(parse_threshold(value)?)),
            LESS_CODE => Ok(Condition::LessThan(parse_threshold(value)?)),
            RANGE_CODE => {
                let (min, max) = value
                    .split_once(':')
                    .ok_or_else(|| WatchError::InvalidThreshold(value.to_string()))?;
                Self::exclusive_range(parse_threshold(min)?, parse_threshold(max)?)
            }
            other => Err(WatchError::InvalidCondition(other.to_string())),
        }
    }

    /// Build from a user-facing kind name ("more", "less", "range")
    pub fn from_kind(kind: &str, value: &str) -> Result<Self, WatchError> {
        let value: String = value.split_whitespace().collect();
        let code = match kind.trim().to_lowercase().as_str() {
            "more" | "more_than" | ">" => MORE_CODE,
            "less" | "less_than" | "<" => LESS_CODE,
            "range" | "in_range" | "exclusive_range" => RANGE_CODE,
            other => return Err(WatchError::InvalidCondition(other.to_string())),
        };
        Self::from_parts(&code.to_string(), &value)
    }

    pub fn code(&self) -> u8 {
        match self {
            Condition::MoreThan(_) => MORE_CODE,
            Condition::LessThan(_) => LESS_CODE,
            Condition::ExclusiveRange { .. } => RANGE_CODE,
        }
    }

    /// Value field as written to disk: "<number>" or "<min>:<max>"
    pub fn value_string(&self) -> String {
        match self {
            Condition::MoreThan(t) | Condition::LessThan(t) => t.to_string(),
            Condition::ExclusiveRange { min, max } => format!("{}:{}", min, max),
        }
    }

    /// Human phrasing used in alarm messages
    pub fn phrase(&self) -> &'static str {
        match self {
            Condition::MoreThan(_) => "more than",
            Condition::LessThan(_) => "less than",
            Condition::ExclusiveRange { .. } => "in range",
        }
    }

    pub fn is_satisfied_by(&self, value: f64) -> bool {
        check(self, value)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.phrase(), self.value_string())
    }
}

/// Evaluate one condition against one reading.
///
/// Returns true when the value is acceptable, false for the alarm region.
/// A range with `min >= max` never triggers.
pub fn check(condition: &Condition, value: f64) -> bool {
    match *condition {
        Condition::MoreThan(threshold) => value > threshold,
        Condition::LessThan(threshold) => value < threshold,
        Condition::ExclusiveRange { min, max } => {
            if !(min < max) {
                tracing::warn!(
                    "Malformed range {}:{} in watch condition, treating reading {} as acceptable",
                    min,
                    max,
                    value
                );
                return true;
            }
            min < value && value < max
        }
    }
}

fn parse_threshold(field: &str) -> Result<f64, WatchError> {
    match field.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(WatchError::InvalidThreshold(field.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_more_than_is_strict() {
        let cond = Condition::MoreThan(80.0);
        assert!(check(&cond, 80.5));
        assert!(!check(&cond, 80.0));
        assert!(!check(&cond, 20.0));
    }

    #[test]
    fn test_less_than_is_strict() {
        let cond = Condition::LessThan(500.0);
        assert!(check(&cond, 499.0));
        assert!(!check(&cond, 500.0));
        assert!(!check(&cond, 1200.0));
    }

    #[test]
    fn test_exclusive_range_excludes_bounds() {
        let cond = Condition::exclusive_range(30.0, 70.0).unwrap();
        assert!(check(&cond, 50.0));
        assert!(!check(&cond, 30.0));
        assert!(!check(&cond, 70.0));
        assert!(!check(&cond, 10.0));
        assert!(!check(&cond, 90.0));
    }

    #[test]
    fn test_range_construction_requires_min_below_max() {
        assert!(Condition::exclusive_range(70.0, 30.0).is_err());
        assert!(Condition::exclusive_range(50.0, 50.0).is_err());
        assert!(Condition::exclusive_range(f64::NAN, 50.0).is_err());
    }

    #[test]
    fn test_malformed_range_fails_safe() {
        let cond = Condition::ExclusiveRange { min: 70.0, max: 30.0 };
        assert!(check(&cond, 0.0));
        assert!(check(&cond, 100.0));
    }

    #[test]
    fn test_from_parts() {
        assert_eq!(
            Condition::from_parts("0", "80").unwrap(),
            Condition::MoreThan(80.0)
        );
        assert_eq!(
            Condition::from_parts("1", "12.5").unwrap(),
            Condition::LessThan(12.5)
        );
        assert_eq!(
            Condition::from_parts("2", "30:70").unwrap(),
            Condition::ExclusiveRange { min: 30.0, max: 70.0 }
        );
        assert!(Condition::from_parts("2", "70:30").is_err());
        assert!(Condition::from_parts("2", "70").is_err());
        assert!(Condition::from_parts("3", "70").is_err());
        assert!(Condition::from_parts("0", "hot").is_err());
        assert!(Condition::from_parts("0", "inf").is_err());
    }

    #[test]
    fn test_from_kind() {
        assert_eq!(
            Condition::from_kind("range", "40 : 60").unwrap(),
            Condition::ExclusiveRange { min: 40.0, max: 60.0 }
        );
        assert_eq!(
            Condition::from_kind("More", "85").unwrap(),
            Condition::MoreThan(85.0)
        );
        assert!(Condition::from_kind("between", "1:2").is_err());
    }

    #[test]
    fn test_value_string_and_phrase() {
        let cond = Condition::exclusive_range(-5.5, 60.0).unwrap();
        assert_eq!(cond.value_string(), "-5.5:60");
        assert_eq!(cond.phrase(), "in range");
        assert_eq!(Condition::LessThan(800.0).to_string(), "less than 800");
    }
}
