//! Seller profiles.

use crate::ids::{SellerId, UserId};
use serde::{Deserialize, Serialize};

/// Seller approval status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SellerStatus {
    /// Awaiting admin review.
    #[default]
    Pending,
    /// Approved to sell and receive payouts.
    Approved,
    /// Suspended by an admin.
    Suspended,
}

impl SellerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SellerStatus::Pending => "pending",
            SellerStatus::Approved => "approved",
            SellerStatus::Suspended => "suspended",
        }
    }
}

/// A seller profile attached to a user account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Seller {
    /// Profile identifier.
    pub id: SellerId,
    /// Owning user account (unique).
    pub user: UserId,
    /// Public shop name.
    pub shop_name: String,
    /// Approval status.
    pub status: SellerStatus,
}

impl Seller {
    /// Create a new pending seller profile.
    pub fn new(user: UserId, shop_name: impl Into<String>) -> Self {
        Self {
            id: SellerId::generate(),
            user,
            shop_name: shop_name.into(),
            status: SellerStatus::Pending,
        }
    }

    /// Whether orders for this seller may move money through escrow.
    pub fn is_payout_eligible(&self) -> bool {
        self.status == SellerStatus::Approved
    }
}
