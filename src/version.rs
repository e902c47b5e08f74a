//! Language versions and revision dates

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// YANG language version declared by `yang-version`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum YangVersion {
    /// RFC 6020, the implied version when `yang-version` is absent
    #[default]
    V1_0,
    /// RFC 7950
    V1_1,
}

impl YangVersion {
    /// Parse the argument of a `yang-version` statement
    pub fn parse(arg: &str) -> Option<Self> {
        match arg {
            "1" => Some(Self::V1_0),
            "1.1" => Some(Self::V1_1),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1_0 => "1",
            Self::V1_1 => "1.1",
        }
    }
}

impl fmt::Display for YangVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `revision` / `revision-date` argument.
///
/// Ordering is plain string ordering, which matches date ordering for the
/// mandated `YYYY-MM-DD` form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Revision(String);

impl Revision {
    /// Parse and validate a revision date
    pub fn parse(s: &str) -> Result<Self, String> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| format!("Invalid revision date '{}': {}", s, e))?;
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yang_version() {
        assert_eq!(YangVersion::parse("1"), Some(YangVersion::V1_0));
        assert_eq!(YangVersion::parse("1.1"), Some(YangVersion::V1_1));
        assert_eq!(YangVersion::parse("2"), None);
        assert!(YangVersion::V1_0 < YangVersion::V1_1);
    }

    #[test]
    fn test_revision_validation_and_order() {
        let older = Revision::parse("2015-02-25").unwrap();
        let newer = Revision::parse("2016-01-01").unwrap();
        assert!(older < newer);
        assert!(Revision::parse("2015-13-40").is_err());
        assert!(Revision::parse("yesterday").is_err());
    }
}
