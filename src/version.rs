use std::fmt::Display;
use std::str::FromStr;

use crate::error::Error;

/// A parsed `major.minor.patch` version as reported by `app/webapiVersion`
/// or `app/version`.
///
/// Missing components are treated as zero, so `"2.11"` compares equal to
/// `"2.11.0"`. A leading `v` (the `app/version` convention) is ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ApiVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl FromStr for ApiVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('v');
        if trimmed.is_empty() {
            return Err(Error::InvalidVersion(s.to_string()));
        }

        let mut parts = trimmed.splitn(3, '.');
        let component = |part: Option<&str>| -> Result<u32, Error> {
            match part {
                None => Ok(0),
                // Tolerate suffixes such as "5.0.0beta1".
                Some(p) => {
                    let digits: String = p.chars().take_while(char::is_ascii_digit).collect();
                    digits
                        .parse()
                        .map_err(|_| Error::InvalidVersion(s.to_string()))
                }
            }
        };

        Ok(Self {
            major: component(parts.next())?,
            minor: component(parts.next())?,
            patch: component(parts.next())?,
        })
    }
}

impl Display for ApiVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
