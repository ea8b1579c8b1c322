use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use validator::ValidationError;

/// The fixed set of board categories a gesture can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Comidas,
    Gestos,
    Sentimentos,
    Sensacoes,
    Essenciais,
    Lugares,
    Objetos,
    Transportes,
    Escola,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Comidas,
        Category::Gestos,
        Category::Sentimentos,
        Category::Sensacoes,
        Category::Essenciais,
        Category::Lugares,
        Category::Objetos,
        Category::Transportes,
        Category::Escola,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Comidas => "comidas",
            Category::Gestos => "gestos",
            Category::Sentimentos => "sentimentos",
            Category::Sensacoes => "sensacoes",
            Category::Essenciais => "essenciais",
            Category::Lugares => "lugares",
            Category::Objetos => "objetos",
            Category::Transportes => "transportes",
            Category::Escola => "escola",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Comidas => "Comidas",
            Category::Gestos => "Gestos",
            Category::Sentimentos => "Sentimentos",
            Category::Sensacoes => "Sensações",
            Category::Essenciais => "Essenciais",
            Category::Lugares => "Lugares",
            Category::Objetos => "Objetos",
            Category::Transportes => "Transportes",
            Category::Escola => "Escola",
        }
    }

    /// Comma-separated list of valid ids, used in error messages.
    pub fn valid_ids() -> String {
        Category::ALL
            .iter()
            .map(Category::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Categoria \"{}\" inválida. Categorias válidas: {}",
            self.0,
            Category::valid_ids()
        )
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Validator hook for category ids carried as plain strings in requests.
pub fn validate_category(value: &str) -> Result<(), ValidationError> {
    value.parse::<Category>().map(|_| ()).map_err(|e| {
        let mut error = ValidationError::new("category");
        error.message = Some(e.to_string().into());
        error
    })
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub id: Category,
    pub name: &'static str,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        CategoryResponse {
            id: category,
            name: category.display_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_round_trips_through_its_id() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>(), Ok(category));
        }
    }

    #[test]
    fn unknown_category_lists_valid_ids() {
        let err = "bebidas".parse::<Category>().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("bebidas"));
        assert!(message.contains("transportes"));
    }

    #[test]
    fn category_ids_are_case_sensitive() {
        assert!("Comidas".parse::<Category>().is_err());
        assert!(validate_category("comidas").is_ok());
        assert!(validate_category("").is_err());
    }

    #[test]
    fn serializes_as_lowercase_id() {
        let json = serde_json::to_string(&Category::Sensacoes).unwrap();
        assert_eq!(json, "\"sensacoes\"");
    }
}
