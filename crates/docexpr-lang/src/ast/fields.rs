use std::fmt::{self, Display, Formatter};

use itertools::Itertools;
use smallvec::SmallVec;
use smol_str::SmolStr;

/// Root-level field names read by an expression.
///
/// Keeps first-seen order and compares names ASCII-case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields(SmallVec<[SmolStr; 4]>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|field| field.eq_ignore_ascii_case(name))
    }

    pub fn insert(&mut self, name: impl Into<SmolStr>) {
        let name = name.into();
        if !self.contains(&name) {
            self.0.push(name);
        }
    }

    pub fn union(mut self, other: &Fields) -> Self {
        other.iter().for_each(|name| self.insert(name.clone()));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &SmolStr> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<SmolStr>> FromIterator<S> for Fields {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut fields = Fields::new();
        iter.into_iter().for_each(|name| fields.insert(name));
        fields
    }
}

impl Display for Fields {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_ignores_case_duplicates() {
        let fields: Fields = ["Name", "age", "name", "AGE"].into_iter().collect();
        assert_eq!(fields.len(), 2);
        assert!(fields.contains("NAME"));
        assert_eq!(fields.to_string(), "Name, age");
    }

    #[test]
    fn test_union_keeps_order() {
        let a: Fields = ["b", "a"].into_iter().collect();
        let b: Fields = ["c", "A"].into_iter().collect();
        let names: Vec<_> = a.union(&b).iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }
}
