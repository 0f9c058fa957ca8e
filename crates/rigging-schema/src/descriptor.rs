//! Parsing of enricher descriptor lines.
//!
//! A descriptor is a plain text resource listing one enricher per line:
//!
//! ```text
//! com.example.MyLabelEnricher
//! !rigging.project-labels
//! com.example.AnotherEnricher,50
//! ```
//!
//! A leading `!` removes a previously registered identifier. The optional
//! numeric suffix is the sort order; entries without one draw the next value
//! from an [`OrderCounter`].

use crate::types::UnitId;
use std::cmp::Ordering;

/// First order value handed out to entries without an explicit order.
pub const DEFAULT_ORDER_BASE: i32 = 100;

/// Source of implicit order values for one registry build.
///
/// A counter is created per build and never shared, so separate builds
/// (including concurrent ones) each start at [`DEFAULT_ORDER_BASE`].
#[derive(Debug, Clone)]
pub struct OrderCounter {
    next: i32,
}

impl OrderCounter {
    pub fn new() -> Self {
        Self {
            next: DEFAULT_ORDER_BASE,
        }
    }

    /// Return the current value and advance the counter.
    pub fn next_order(&mut self) -> i32 {
        let value = self.next;
        self.next += 1;
        value
    }

    /// The value the next call to [`next_order`](Self::next_order) will return.
    pub fn peek(&self) -> i32 {
        self.next
    }
}

impl Default for OrderCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// One parsed descriptor line.
///
/// Equality considers the identifier only; `order` is used for sorting.
#[derive(Debug, Clone)]
pub struct DescriptorEntry {
    pub identifier: UnitId,
    pub is_removal: bool,
    pub order: i32,
}

impl DescriptorEntry {
    /// Parse a single descriptor line. Returns `None` for blank lines.
    ///
    /// An unparseable order suffix is treated like a missing one. The
    /// identifier is not validated here; an empty identifier surfaces later
    /// as an unknown unit.
    pub fn parse(line: &str, counter: &mut OrderCounter) -> Option<Self> {
        if line.trim().is_empty() {
            return None;
        }

        let mut parts = line.split(',');
        let head = parts.next().unwrap_or_default().trim();
        let (is_removal, identifier) = match head.strip_prefix('!') {
            Some(rest) => (true, rest.trim()),
            None => (false, head),
        };

        let order = match parts.next().map(|raw| raw.trim().parse::<i32>()) {
            Some(Ok(explicit)) => explicit,
            Some(Err(_)) | None => counter.next_order(),
        };

        Some(Self {
            identifier: UnitId::new(identifier),
            is_removal,
            order,
        })
    }
}

impl PartialEq for DescriptorEntry {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
    }
}

impl Eq for DescriptorEntry {}

impl DescriptorEntry {
    /// Sort comparison by order only.
    pub fn cmp_order(&self, other: &Self) -> Ordering {
        self.order.cmp(&other.order)
    }
}

/// Parse every line of a descriptor, skipping blank lines.
///
/// Line numbers are 1-based and refer to the physical line in `content`.
pub fn parse_descriptor(content: &str, counter: &mut OrderCounter) -> Vec<(usize, DescriptorEntry)> {
    content
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| DescriptorEntry::parse(line, counter).map(|e| (idx + 1, e)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_identifier_with_default_order() {
        let mut counter = OrderCounter::new();
        let entry = DescriptorEntry::parse("com.x.Foo", &mut counter).unwrap();
        assert_eq!(entry.identifier, "com.x.Foo");
        assert!(!entry.is_removal);
        assert_eq!(entry.order, 100);
        assert_eq!(counter.peek(), 101);
    }

    #[test]
    fn parses_explicit_order_without_touching_counter() {
        let mut counter = OrderCounter::new();
        let entry = DescriptorEntry::parse("com.x.Bar,50", &mut counter).unwrap();
        assert_eq!(entry.identifier, "com.x.Bar");
        assert_eq!(entry.order, 50);
        assert_eq!(counter.peek(), 100);
    }

    #[test]
    fn parses_removal() {
        let mut counter = OrderCounter::new();
        let entry = DescriptorEntry::parse("!com.x.Foo", &mut counter).unwrap();
        assert!(entry.is_removal);
        assert_eq!(entry.identifier, "com.x.Foo");
    }

    #[test]
    fn removal_without_order_still_draws_from_counter() {
        let mut counter = OrderCounter::new();
        let entry = DescriptorEntry::parse("!com.x.Foo", &mut counter).unwrap();
        assert_eq!(entry.order, 100);
        assert_eq!(counter.peek(), 101);
    }

    #[test]
    fn invalid_order_falls_back_to_counter() {
        let mut counter = OrderCounter::new();
        let entry = DescriptorEntry::parse("com.x.Foo,soon", &mut counter).unwrap();
        assert_eq!(entry.order, 100);
        let entry = DescriptorEntry::parse("com.x.Bar,", &mut counter).unwrap();
        assert_eq!(entry.order, 101);
    }

    #[test]
    fn negative_order_is_accepted() {
        let mut counter = OrderCounter::new();
        let entry = DescriptorEntry::parse("com.x.Early,-5", &mut counter).unwrap();
        assert_eq!(entry.order, -5);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let mut counter = OrderCounter::new();
        assert!(DescriptorEntry::parse("", &mut counter).is_none());
        assert!(DescriptorEntry::parse("   \t", &mut counter).is_none());
        assert_eq!(counter.peek(), 100);
    }

    #[test]
    fn empty_identifier_is_not_rejected_by_parser() {
        let mut counter = OrderCounter::new();
        let entry = DescriptorEntry::parse(",10", &mut counter).unwrap();
        assert_eq!(entry.identifier, "");
        assert_eq!(entry.order, 10);
    }

    #[test]
    fn equality_ignores_order() {
        let mut counter = OrderCounter::new();
        let a = DescriptorEntry::parse("com.x.Foo,1", &mut counter).unwrap();
        let b = DescriptorEntry::parse("com.x.Foo,99", &mut counter).unwrap();
        let c = DescriptorEntry::parse("!com.x.Foo", &mut counter).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.cmp_order(&b), Ordering::Less);
    }

    #[test]
    fn parse_descriptor_reports_line_numbers() {
        let mut counter = OrderCounter::new();
        let entries = parse_descriptor("com.x.Foo\n\n!com.x.Bar\ncom.x.Baz,7\n", &mut counter);
        let lines: Vec<usize> = entries.iter().map(|(line, _)| *line).collect();
        assert_eq!(lines, vec![1, 3, 4]);
        assert_eq!(entries[0].1.order, 100);
        assert_eq!(entries[1].1.order, 101);
        assert_eq!(entries[2].1.order, 7);
    }

    #[test]
    fn separate_counters_do_not_interfere() {
        let mut first = OrderCounter::new();
        let mut second = OrderCounter::new();
        first.next_order();
        first.next_order();
        assert_eq!(second.next_order(), 100);
        assert_eq!(first.next_order(), 102);
    }
}
