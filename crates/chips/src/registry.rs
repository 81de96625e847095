use std::collections::HashSet;

/// Tag names whose load has been committed. A name is claimed once and stays claimed
/// until `reset`, so every tag is fetched at most once per registry.
#[derive(Clone, Debug, Default)]
pub struct TagRegistry {
    claimed: HashSet<String>,
    order: Vec<String>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff `tag` is a custom tag name that nobody has claimed yet.
    pub fn is_loadable(&self, tag: &str) -> bool {
        html::is_custom_tag(tag) && !self.claimed.contains(tag)
    }

    /// Returns false if `tag` was already claimed.
    pub fn claim(&mut self, tag: &str) -> bool {
        if self.claimed.contains(tag) {
            return false;
        }
        self.claimed.insert(tag.to_string());
        self.order.push(tag.to_string());
        true
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.claimed.contains(tag)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Claimed names in claim order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn reset(&mut self) {
        self.claimed.clear();
        self.order.clear();
    }
}

impl<S: Into<String>> FromIterator<S> for TagRegistry {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut registry = TagRegistry::new();
        for tag in iter {
            let tag: String = tag.into();
            registry.claim(&tag);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_tags_are_never_loadable() {
        let registry = TagRegistry::new();
        for tag in ["div", "span", "p", "custom"] {
            assert!(!registry.is_loadable(tag), "{tag}");
        }
        assert!(registry.is_loadable("a-widget"));
    }

    #[test]
    fn claimed_tags_stop_being_loadable() {
        let mut registry = TagRegistry::new();
        assert!(registry.claim("a-widget"));
        assert!(!registry.claim("a-widget"));
        assert!(!registry.is_loadable("a-widget"));
        assert!(registry.is_loadable("b-widget"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn iterates_in_claim_order_and_resets() {
        let mut registry: TagRegistry = ["z-last", "a-first"].into_iter().collect();
        registry.claim("m-mid");
        assert_eq!(registry.iter().collect::<Vec<_>>(), ["z-last", "a-first", "m-mid"]);

        registry.reset();
        assert!(registry.is_empty());
        assert!(registry.is_loadable("z-last"));
    }
}
