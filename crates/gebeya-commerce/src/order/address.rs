//! Address types.

use crate::ids::{AddressId, UserId};
use serde::{Deserialize, Serialize};

/// A saved delivery address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Address {
    /// Address ID.
    pub id: AddressId,
    /// User that saved the address.
    pub owner: UserId,
    /// Short label (e.g., "Home").
    pub label: String,
    /// Street / kebele / house number.
    pub line1: String,
    /// City.
    pub city: String,
    /// Contact phone number.
    pub phone: String,
}

impl Address {
    /// Create a new address with a generated id.
    pub fn new(
        owner: UserId,
        label: impl Into<String>,
        line1: impl Into<String>,
        city: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            id: AddressId::generate(),
            owner,
            label: label.into(),
            line1: line1.into(),
            city: city.into(),
            phone: phone.into(),
        }
    }

    /// Format as single line.
    pub fn one_line(&self) -> String {
        format!("{}, {} ({})", self.line1, self.city, self.phone)
    }

    /// Check if address has everything a courier needs.
    pub fn is_complete(&self) -> bool {
        !self.line1.is_empty() && !self.city.is_empty() && !self.phone.is_empty()
    }
}
