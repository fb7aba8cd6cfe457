use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fabric {
    pub id: Uuid,
    pub name: String,
    pub fiber: String,
    pub color: String,
    /// Bolt width in centimeters.
    pub width_cm: Option<i32>,
    /// Remaining length in meters.
    pub length_m: f64,
    pub weight_gsm: Option<i32>,
    pub location: Option<String>,
    pub tags: Vec<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Fabric {
    pub fn new(
        name: impl Into<String>,
        fiber: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            fiber: fiber.into(),
            color: String::new(),
            width_cm: None,
            length_m: 0.0,
            weight_gsm: None,
            location: None,
            tags: Vec::new(),
            created_by: created_by.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_width_cm(mut self, width_cm: i32) -> Self {
        self.width_cm = Some(width_cm);
        self
    }

    pub fn with_length_m(mut self, length_m: f64) -> Self {
        self.length_m = length_m;
        self
    }

    pub fn with_weight_gsm(mut self, weight_gsm: i32) -> Self {
        self.weight_gsm = Some(weight_gsm);
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Usable area in square meters, when the bolt width is known.
    pub fn area_m2(&self) -> Option<f64> {
        self.width_cm
            .map(|width| (width as f64 / 100.0) * self.length_m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fabric_builder() {
        let fabric = Fabric::new("Washed linen", "100% linen", "erin")
            .with_color("rust")
            .with_width_cm(140)
            .with_length_m(2.5);

        assert_eq!(fabric.color, "rust");
        assert_eq!(fabric.width_cm, Some(140));
        assert_eq!(fabric.length_m, 2.5);
    }

    #[test]
    fn test_area_with_width() {
        let fabric = Fabric::new("Quilting cotton", "cotton", "erin")
            .with_width_cm(110)
            .with_length_m(3.0);
        let area = fabric.area_m2().unwrap();
        assert!((area - 3.3).abs() < 1e-9);
    }

    #[test]
    fn test_area_without_width() {
        let fabric = Fabric::new("Scrap jersey", "cotton jersey", "erin").with_length_m(1.0);
        assert!(fabric.area_m2().is_none());
    }
}
