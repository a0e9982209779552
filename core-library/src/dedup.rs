//! Name-based deduplication shared by the remote merge and the analysis paths.

use crate::models::Tag;
use bridge_traits::{AnalyzedTag, RemoteTagSyncInfo};
use std::collections::HashMap;

/// Anything identified by a tag name.
pub trait Named {
    fn name(&self) -> &str;
}

impl Named for Tag {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for AnalyzedTag {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for RemoteTagSyncInfo {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for String {
    fn name(&self) -> &str {
        self
    }
}

impl<T: Named + ?Sized> Named for &T {
    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Collapse items sharing a name.
///
/// The last item seen for a name wins, placed where that name first appeared.
/// Names compare exactly (case-sensitive).
///
/// ```
/// use core_library::dedup::dedup_by_name;
///
/// let names = vec!["chill".to_string(), "dark".to_string(), "chill".to_string()];
/// assert_eq!(dedup_by_name(names), vec!["chill", "dark"]);
/// ```
pub fn dedup_by_name<T, I>(items: I) -> Vec<T>
where
    T: Named,
    I: IntoIterator<Item = T>,
{
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<T> = Vec::new();

    for item in items {
        match positions.get(item.name()) {
            Some(&index) => kept[index] = item,
            None => {
                positions.insert(item.name().to_owned(), kept.len());
                kept.push(item);
            }
        }
    }

    kept
}

pub fn contains_name<T: Named>(items: &[T], name: &str) -> bool {
    items.iter().any(|item| item.name() == name)
}
