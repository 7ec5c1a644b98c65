//! Credit and weight computation.
//!
//! The waste path truncates (`floor`) while the plantation path issues the
//! raw tree count; the two are kept separate on purpose.

use serde::{Deserialize, Serialize};

/// Waste categories recognised by the impact factor table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Organic,
    Recyclable,
    Electronic,
    Construction,
    Inert,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Organic => "Organic",
            Self::Recyclable => "Recyclable",
            Self::Electronic => "Electronic",
            Self::Construction => "Construction",
            Self::Inert => "Inert",
        }
    }

    /// Exact, case-sensitive match on the stored spelling.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "Organic" => Self::Organic,
            "Recyclable" => Self::Recyclable,
            "Electronic" => Self::Electronic,
            "Construction" => Self::Construction,
            "Inert" => Self::Inert,
            _ => return None,
        })
    }
}

/// Keyword rules in precedence order; the first keyword found wins.
const CLASSIFY_RULES: [(&str, Category); 5] = [
    ("rice", Category::Organic),
    ("wrapper", Category::Recyclable),
    ("can", Category::Recyclable),
    ("paper", Category::Recyclable),
    ("mobile", Category::Electronic),
];

/// Keyword classification of a waste name (case-insensitive substring match).
pub fn classify_waste(name: &str) -> Category {
    let name = name.to_lowercase();
    CLASSIFY_RULES
        .iter()
        .find(|(keyword, _)| name.contains(keyword))
        .map(|(_, category)| *category)
        .unwrap_or(Category::Inert)
}

/// Environmental impact multipliers per category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryFactors {
    pub organic: f64,
    pub recyclable: f64,
    pub electronic: f64,
    pub construction: f64,
    pub inert: f64,
    /// Applied to unknown or missing categories.
    pub default: f64,
}

impl Default for CategoryFactors {
    fn default() -> Self {
        Self {
            organic: 1.2,
            recyclable: 0.8,
            electronic: 0.6,
            construction: 0.3,
            inert: 0.1,
            default: 0.1,
        }
    }
}

impl CategoryFactors {
    pub fn with_default(default: f64) -> Self {
        Self {
            default,
            ..Self::default()
        }
    }

    /// Factor for a stored category string. Never fails.
    pub fn factor(&self, category: Option<&str>) -> f64 {
        match category.and_then(Category::from_name) {
            Some(Category::Organic) => self.organic,
            Some(Category::Recyclable) => self.recyclable,
            Some(Category::Electronic) => self.electronic,
            Some(Category::Construction) => self.construction,
            Some(Category::Inert) => self.inert,
            None => self.default,
        }
    }
}

/// Anti-fraud cap: the settled weight never exceeds what was declared.
pub fn cap_weight(declared_kg: f64, reported_kg: f64) -> f64 {
    declared_kg.min(reported_kg)
}

/// `final_weight × factor`, committed to the plantation pool.
pub fn plantation_units(factors: &CategoryFactors, category: Option<&str>, final_kg: f64) -> f64 {
    final_kg * factors.factor(category)
}

/// `floor(final_weight × factor × 10)` credits for a pooled waste batch.
pub fn waste_credits(factors: &CategoryFactors, category: Option<&str>, final_kg: f64) -> u64 {
    let raw = (final_kg * factors.factor(category) * 10.0).floor();
    if raw.is_finite() && raw > 0.0 {
        raw as u64
    } else {
        0
    }
}

/// One credit per tree.
pub fn tree_credits(tree_count: u32) -> u64 {
    u64::from(tree_count)
}
