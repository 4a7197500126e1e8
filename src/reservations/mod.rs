//! Reservation subsystem.
//!
//! # States
//! ```text
//! Reservation: PENDING ──order created──▶ ORDERED ──▶ PAID | CANCELLED
//! Order:       tracked while status == RESERVED and no accepted abort
//! ```

pub mod reconciler;
pub mod types;

pub use reconciler::{OrderApi, ReservationSettings, Reservations, StockLevel};
pub use types::{Order, PaymentUrlReady, Reservation};
