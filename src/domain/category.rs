//! The closed set of spending categories and the keyword rules that map
//! statement descriptions onto it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Spending category assigned to a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Category {
    /// Restaurants and food delivery.
    Food,
    /// Cabs, trains, flights.
    Travel,
    /// Online and offline retail.
    Shopping,
    /// Housing rent.
    Rent,
    /// Utilities, phone, internet.
    Bills,
    /// Movies and streaming.
    Entertainment,
    /// Pharmacy, hospital, doctor.
    Medical,
    /// Anything not matched above.
    Other,
}

impl Category {
    /// Every allowed category, in prompt order.
    pub const ALL: [Self; 8] = [
        Self::Food,
        Self::Travel,
        Self::Shopping,
        Self::Rent,
        Self::Bills,
        Self::Entertainment,
        Self::Medical,
        Self::Other,
    ];

    /// Returns the display name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Food => "Food",
            Self::Travel => "Travel",
            Self::Shopping => "Shopping",
            Self::Rent => "Rent",
            Self::Bills => "Bills",
            Self::Entertainment => "Entertainment",
            Self::Medical => "Medical",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a label is outside the closed category set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Keyword table checked top to bottom; first hit wins.
const RULES: &[(Category, &[&str])] = &[
    (
        Category::Food,
        &["swiggy", "zomato", "restaurant", "dine", "dominos", "ubereats"],
    ),
    (
        Category::Travel,
        &["uber", "ola", "taxi", "cab", "rail", "bus", "flight"],
    ),
    (
        Category::Shopping,
        &["amazon", "myntra", "flipkart", "shopping", "shop", "store"],
    ),
    (Category::Rent, &["rent", "rental"]),
    (
        Category::Bills,
        &["bill", "electric", "water", "phone", "internet", "postpaid", "dth"],
    ),
    (
        Category::Medical,
        &["pharmacy", "hospital", "clinic", "medic", "doctor"],
    ),
    (
        Category::Entertainment,
        &["movie", "cinema", "ticket", "netflix", "prime", "hotstar"],
    ),
];

/// Deterministically categorizes a statement description.
///
/// Total: every input maps to some category, [`Category::Other`] when no
/// keyword matches.
#[must_use]
pub fn categorize_description(description: &str) -> Category {
    let lowered = description.to_lowercase();
    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map_or(Category::Other, |(category, _)| *category)
}
