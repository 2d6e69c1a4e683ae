//! Helpers to render lists of names inside error and warning messages.

use itertools::Itertools;

/// Joins names as `a", "b", "c`, meant to be wrapped in one pair of double quotes.
pub(crate) fn join_quoted<I, T>(names: I) -> String
where
    I: IntoIterator<Item = T>,
    T: std::fmt::Display,
{
    names.into_iter().join("\", \"")
}

/// Returns `singular` with an "s" appended when `count` is not one.
pub(crate) fn pluralize(singular: &str, count: usize) -> String {
    if count == 1 {
        singular.to_owned()
    } else {
        format!("{singular}s")
    }
}

/// Returns "is" or "s are", the suffix used after a noun whose plurality depends on `count`.
pub(crate) fn is_or_are(count: usize) -> &'static str {
    if count > 1 { "s are" } else { " is" }
}

pub(crate) fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals() {
        assert_eq!(ordinal(1), "1st");
        assert_eq!(ordinal(2), "2nd");
        assert_eq!(ordinal(3), "3rd");
        assert_eq!(ordinal(4), "4th");
        assert_eq!(ordinal(11), "11th");
        assert_eq!(ordinal(12), "12th");
        assert_eq!(ordinal(22), "22nd");
    }

    #[test]
    fn quoted_names() {
        assert_eq!(join_quoted(["a"]), "a");
        assert_eq!(join_quoted(["a", "b", "c"]), "a\", \"b\", \"c");
        assert_eq!(pluralize("subgraph", 2), "subgraphs");
        assert_eq!(is_or_are(1), " is");
    }
}
