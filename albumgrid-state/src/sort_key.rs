use std::cmp::Ordering;

/// The value a group is ordered by.
///
/// Text keys are compared by the caller, which may use a collator. Present values order
/// before missing ones, and numbers before text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SortKey {
    /// No value was available.
    #[default]
    Missing,
    /// A numeric value (years, sizes, counts, timestamps).
    Number(i64),
    /// A textual value.
    Text(String),
}
impl SortKey {
    /// Compares two keys, delegating text comparisons to `cmp_text`.
    pub fn compare_with(
        &self,
        other: &Self,
        cmp_text: impl Fn(&str, &str) -> Ordering,
    ) -> Ordering {
        match (self, other) {
            (SortKey::Missing, SortKey::Missing) => Ordering::Equal,
            (SortKey::Missing, _) => Ordering::Greater,
            (_, SortKey::Missing) => Ordering::Less,
            (SortKey::Number(a), SortKey::Number(b)) => a.cmp(b),
            (SortKey::Number(_), SortKey::Text(_)) => Ordering::Less,
            (SortKey::Text(_), SortKey::Number(_)) => Ordering::Greater,
            (SortKey::Text(a), SortKey::Text(b)) => cmp_text(a, b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        let cmp = |a: &SortKey, b: &SortKey| a.compare_with(b, |x, y| x.cmp(y));
        assert_eq!(cmp(&SortKey::Number(1969), &SortKey::Number(1971)), Ordering::Less);
        assert_eq!(cmp(&SortKey::Number(1), &SortKey::Text("a".into())), Ordering::Less);
        assert_eq!(cmp(&SortKey::Text("b".into()), &SortKey::Text("a".into())), Ordering::Greater);
        assert_eq!(cmp(&SortKey::Missing, &SortKey::Text("a".into())), Ordering::Greater);
        assert_eq!(cmp(&SortKey::Missing, &SortKey::Missing), Ordering::Equal);
    }
}
