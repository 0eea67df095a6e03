use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// A loosely-parsed, totally-ordered version string.
///
/// The canonical text is kept as entered; ordering works on parsed
/// components: the string is split on `.`, and each chunk is further split
/// into numeric and alphabetic runs. Numeric runs compare numerically,
/// alpha runs lexicographically. `1.0.0 < 1.0.1 < 1.1.0 < 2.0.0`, and
/// `1.0.0-rc1 < 1.0.0-rc2`.
#[derive(Debug, Clone)]
pub struct Version {
    text: String,
    components: Vec<Component>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Component {
    // Numeric orders before alpha so the derived Ord gives a deterministic
    // total order for mixed positions.
    Number(u64),
    Alpha(String),
}

impl Version {
    pub fn parse(text: &str) -> Result<Self, Error> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidArgument(
                "version string cannot be empty".to_string(),
            ));
        }

        let mut components = Vec::new();
        for chunk in trimmed.split(['.', '-']) {
            let mut run = String::new();
            let mut run_is_digit: Option<bool> = None;

            for c in chunk.chars() {
                let is_digit = c.is_ascii_digit();
                if run_is_digit == Some(!is_digit) {
                    components.push(Component::from_run(&run, run_is_digit == Some(true)));
                    run.clear();
                }
                run_is_digit = Some(is_digit);
                run.push(c);
            }

            if !run.is_empty() {
                components.push(Component::from_run(&run, run_is_digit == Some(true)));
            }
        }

        Ok(Self {
            text: trimmed.to_string(),
            components,
        })
    }

    /// The canonical textual form, as originally entered.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl Component {
    fn from_run(run: &str, is_digit: bool) -> Self {
        if is_digit {
            // Runs longer than u64 fall back to lexicographic comparison.
            match run.parse::<u64>() {
                Ok(n) => Component::Number(n),
                Err(_) => Component::Alpha(run.to_string()),
            }
        } else {
            Component::Alpha(run.to_string())
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components.cmp(&other.components)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Version::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_ordering_chain() {
        assert!(v("1.0.0") < v("1.0.1"));
        assert!(v("1.0.1") < v("1.1.0"));
        assert!(v("1.1.0") < v("2.0.0"));
        assert!(v("1.0.0") < v("2.0.0")); // transitivity endpoint
    }

    #[test]
    fn test_numeric_not_lexicographic() {
        assert!(v("1.9") < v("1.10"));
        assert!(v("2") < v("10"));
    }

    #[test]
    fn test_alpha_runs() {
        assert!(v("1.0.0-rc1") < v("1.0.0-rc2"));
        assert!(v("1.0a") < v("1.0b"));
    }

    #[test]
    fn test_equality_ignores_separator_shape() {
        assert_eq!(v("1.0.0"), v("1.0.0"));
        assert_eq!(v("1.0-rc1"), v("1.0.rc1"));
    }

    #[test]
    fn test_round_trip() {
        for s in ["1.0.0", "2.3.4-rc1", "0.1", "10.0.0b2"] {
            let parsed = v(s);
            assert_eq!(parsed.to_string(), s);
            assert_eq!(v(&parsed.to_string()), parsed);
        }
    }

    #[test]
    fn test_empty_rejected() {
        assert!(Version::parse("").is_err());
        assert!(Version::parse("   ").is_err());
    }

    #[test]
    fn test_sortable() {
        let mut versions = vec![v("2.0.0"), v("1.0.1"), v("1.1.0"), v("1.0.0")];
        versions.sort();
        let texts: Vec<&str> = versions.iter().map(Version::as_str).collect();
        assert_eq!(texts, ["1.0.0", "1.0.1", "1.1.0", "2.0.0"]);
    }
}
