//! Order module.
//!
//! Orders, their line snapshots, delivery addresses and the status
//! state machines that govern them.

mod address;
mod order;
mod status;

pub use address::Address;
pub use order::{EscrowShare, Order, OrderLine, PaymentProof};
pub use status::{DeliveryMethod, LineStatus, OrderStatus, PaymentMethod, PaymentStatus};
