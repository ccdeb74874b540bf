//! Search filter and pagination window

use super::order::OrderStatus;
use serde::{Deserialize, Serialize};

/// Order search filter; unset fields do not constrain the result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSearch {
    pub status: Option<OrderStatus>,
    /// Matched as a substring of the member name
    pub member_name: Option<String>,
}

impl OrderSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_member_name(mut self, name: impl Into<String>) -> Self {
        self.member_name = Some(name.into());
        self
    }

    /// The member name fragment, if it has any non-whitespace text
    pub fn member_name_fragment(&self) -> Option<&str> {
        self.member_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }

    /// `LIKE` pattern for the member name fragment
    pub fn member_name_pattern(&self) -> Option<String> {
        self.member_name_fragment()
            .map(|name| format!("%{}%", escape_like(name)))
    }

    /// Evaluate the filter against a single order's member name and status
    pub fn matches(&self, member_name: &str, status: OrderStatus) -> bool {
        if let Some(wanted) = self.status {
            if wanted != status {
                return false;
            }
        }
        match self.member_name_fragment() {
            Some(fragment) => member_name.contains(fragment),
            None => true,
        }
    }
}

fn escape_like(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len());
    for ch in fragment.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Offset/limit window over the parent (order) sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 100,
        }
    }
}

impl Page {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// Apply the window to an already materialized sequence
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset)
            .take(self.limit)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_member_name_is_ignored() {
        let search = OrderSearch::new().with_member_name("   ");
        assert_eq!(search.member_name_pattern(), None);
        assert!(search.matches("userA", OrderStatus::Ordered));
    }

    #[test]
    fn test_member_name_pattern_escapes_wildcards() {
        let search = OrderSearch::new().with_member_name("50%_off");
        assert_eq!(
            search.member_name_pattern().as_deref(),
            Some("%50\\%\\_off%")
        );
    }

    #[test]
    fn test_matches_combines_status_and_name() {
        let search = OrderSearch::new()
            .with_member_name("user")
            .with_status(OrderStatus::Canceled);

        assert!(!search.matches("userA", OrderStatus::Ordered));
        assert!(search.matches("userB", OrderStatus::Canceled));
        assert!(!search.matches("admin", OrderStatus::Canceled));
    }

    #[test]
    fn test_page_apply() {
        let page = Page::new(1, 2);
        assert_eq!(page.apply(vec![1, 2, 3, 4]), vec![2, 3]);
        assert_eq!(Page::new(10, 5).apply(vec![1, 2]), Vec::<i32>::new());
        assert_eq!(Page::default(), Page::new(0, 100));
    }
}
