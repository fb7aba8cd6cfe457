use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pattern {
    pub id: Uuid,
    pub name: String,
    pub brand: String,
    pub number: Option<String>,
    pub sizes: Vec<String>,
    pub pieces: Option<i32>,
    pub notes: String,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pattern {
    pub fn new(
        name: impl Into<String>,
        brand: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            brand: brand.into(),
            number: None,
            sizes: Vec::new(),
            pieces: None,
            notes: String::new(),
            tags: Vec::new(),
            image_url: None,
            created_by: created_by.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.number = Some(number.into());
        self
    }

    pub fn with_sizes(mut self, sizes: Vec<String>) -> Self {
        self.sizes = sizes;
        self
    }

    pub fn with_pieces(mut self, pieces: i32) -> Self {
        self.pieces = Some(pieces);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Catalog label, e.g. "Burda 6401" or just the name when no number exists.
    pub fn label(&self) -> String {
        match &self.number {
            Some(number) => format!("{} {}", self.brand, number),
            None => self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_builder() {
        let pattern = Pattern::new("Wrap skirt", "Burda", "erin")
            .with_number("6401")
            .with_sizes(vec!["34".to_string(), "36".to_string()])
            .with_pieces(7);

        assert_eq!(pattern.number.as_deref(), Some("6401"));
        assert_eq!(pattern.sizes.len(), 2);
        assert_eq!(pattern.pieces, Some(7));
    }

    #[test]
    fn test_label_with_number() {
        let pattern = Pattern::new("Wrap skirt", "Burda", "erin").with_number("6401");
        assert_eq!(pattern.label(), "Burda 6401");
    }

    #[test]
    fn test_label_without_number() {
        let pattern = Pattern::new("Self-drafted culottes", "none", "erin");
        assert_eq!(pattern.label(), "Self-drafted culottes");
    }
}
