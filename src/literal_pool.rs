//! Literal Pool: the ordered list of data-section string declarations.

use crate::templates;

/// One entry registered into the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralDescriptor {
    pub label: String,
    pub raw_text: String,
}

#[derive(Debug, Default)]
pub struct LiteralPool {
    entries: Vec<LiteralDescriptor>,
    next_id: u64,
}

impl LiteralPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new string literal and return its unique label.
    /// Labels are `string_<k>` for monotonically increasing `k`.
    pub fn add(&mut self, raw_text: impl Into<String>) -> String {
        let label = format!("string_{}", self.next_id);
        self.next_id += 1;
        self.entries.push(LiteralDescriptor {
            label: label.clone(),
            raw_text: raw_text.into(),
        });
        label
    }

    /// Render every registered literal as data-section declarations, in
    /// registration order.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&templates::data_string(&entry.label, &entry.raw_text));
        }
        out
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_monotonically_unique() {
        let mut pool = LiteralPool::new();
        let a = pool.add("hello");
        let b = pool.add("world");
        assert_ne!(a, b);
        assert_eq!(a, "string_0");
        assert_eq!(b, "string_1");
    }

    #[test]
    fn render_emits_in_registration_order() {
        let mut pool = LiteralPool::new();
        pool.add("a");
        pool.add("b");
        let rendered = pool.render();
        assert!(rendered.find("string_0").unwrap() < rendered.find("string_1").unwrap());
    }
}
