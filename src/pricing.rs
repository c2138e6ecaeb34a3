// 🎫 Pricing - price table and age classification
// The single authority on prices: every caller (registration, repricing,
// seeding) goes through `price` and `classify_age`.

use crate::error::Error;
use crate::money::Money;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// CATEGORY
// ============================================================================

/// Pricing band a participant falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Adult,
    Teen,
    Exempt,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Adult => "adult",
            Category::Teen => "teen",
            Category::Exempt => "exempt",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "adult" => Ok(Category::Adult),
            "teen" => Ok(Category::Teen),
            "exempt" => Ok(Category::Exempt),
            other => Err(Error::InvalidInput(format!("unknown category '{other}'"))),
        }
    }
}

impl ToSql for Category {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Category {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

// ============================================================================
// PRICE TABLE
// ============================================================================

/// Total price for a stay of `days` days in the given category.
///
/// Day-counts outside 1-4 price to zero rather than failing; request
/// validation happens at the operation boundary.
pub fn price(category: Category, days: i64) -> Money {
    let units = match category {
        Category::Exempt => 0,
        Category::Teen => match days {
            1 => 75,
            2 => 150,
            3 => 185,
            4 => 200,
            _ => 0,
        },
        Category::Adult => match days {
            1 => 150,
            2 => 300,
            3 => 370,
            4 => 400,
            _ => 0,
        },
    };
    Money::from_units(units)
}

/// Age bands: 0-9 exempt, 10-17 teen, 18+ adult.
pub fn classify_age(age: i64) -> Category {
    if age <= 9 {
        Category::Exempt
    } else if age <= 17 {
        Category::Teen
    } else {
        Category::Adult
    }
}

// ============================================================================
// TESTS
// ============================================================================
