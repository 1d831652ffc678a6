// src/models/category.rs

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

static HEX_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#[0-9a-fA-F]{6}$").expect("static color pattern is valid")
});

/// Represents the 'categories' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: i64,

    /// Unique display name (e.g. "JavaScript").
    pub name: String,

    /// Badge color as `#rrggbb`.
    pub color: String,
}

/// DTO for creating a category.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(custom(function = validate_color))]
    pub color: String,
}

/// DTO for updating a category. Fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(custom(function = validate_color))]
    pub color: Option<String>,
}

fn validate_color(color: &str) -> Result<(), validator::ValidationError> {
    if HEX_COLOR.is_match(color) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("color_must_be_hex"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_hex_colors_only() {
        let ok = CreateCategoryRequest {
            name: "Rust".into(),
            color: "#dea584".into(),
        };
        assert!(ok.validate().is_ok());

        let bad = CreateCategoryRequest {
            name: "Rust".into(),
            color: "orange".into(),
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn partial_update_skips_missing_fields() {
        let patch = UpdateCategoryRequest {
            name: None,
            color: Some("#FFFFFF".into()),
        };
        assert!(patch.validate().is_ok());
    }
}
