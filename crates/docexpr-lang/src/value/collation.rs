use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown collation `{0}`, expected `binary` or `ignorecase`")]
pub struct UnknownCollation(pub String);

/// String comparison rules used by every comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Collation {
    ignore_case: bool,
}

impl Default for Collation {
    fn default() -> Self {
        Self::ignore_case()
    }
}

impl Collation {
    pub const fn binary() -> Self {
        Self { ignore_case: false }
    }

    pub const fn ignore_case() -> Self {
        Self { ignore_case: true }
    }

    #[inline]
    pub fn is_ignore_case(&self) -> bool {
        self.ignore_case
    }

    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        if self.ignore_case {
            a.chars()
                .flat_map(char::to_lowercase)
                .cmp(b.chars().flat_map(char::to_lowercase))
        } else {
            a.cmp(b)
        }
    }

    #[inline]
    pub fn equals(&self, a: &str, b: &str) -> bool {
        self.compare(a, b).is_eq()
    }
}

impl FromStr for Collation {
    type Err = UnknownCollation;

    /// Accepts `binary`, `ignorecase`, or a culture-prefixed form such as `en-US/IgnoreCase`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let options = s.rsplit('/').next().unwrap_or(s).trim();

        match options.to_ascii_lowercase().as_str() {
            "binary" | "ordinal" | "none" => Ok(Self::binary()),
            "ignorecase" | "ignore_case" | "ignore-case" => Ok(Self::ignore_case()),
            _ => Err(UnknownCollation(s.to_string())),
        }
    }
}

impl Display for Collation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.ignore_case {
            write!(f, "ignorecase")
        } else {
            write!(f, "binary")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::binary("binary", Ok(Collation::binary()))]
    #[case::ignore_case("IgnoreCase", Ok(Collation::ignore_case()))]
    #[case::culture_prefixed("en-US/IgnoreCase", Ok(Collation::ignore_case()))]
    #[case::unknown("fuzzy", Err(UnknownCollation("fuzzy".to_string())))]
    fn test_from_str(#[case] input: &str, #[case] expected: Result<Collation, UnknownCollation>) {
        assert_eq!(input.parse::<Collation>(), expected);
    }

    #[rstest]
    #[case(Collation::binary(), "B", "a", Ordering::Less)]
    #[case(Collation::ignore_case(), "B", "a", Ordering::Greater)]
    #[case(Collation::ignore_case(), "ABC", "abc", Ordering::Equal)]
    fn test_compare(#[case] collation: Collation, #[case] a: &str, #[case] b: &str, #[case] expected: Ordering) {
        assert_eq!(collation.compare(a, b), expected);
    }
}
