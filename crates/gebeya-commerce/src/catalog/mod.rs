//! Catalog module.
//!
//! Listings and the seller profiles that own them.

mod listing;
mod seller;

pub use listing::{Condition, Listing};
pub use seller::{Seller, SellerStatus};
