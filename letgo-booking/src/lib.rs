pub mod error;
pub mod ledger;
pub mod manager;
pub mod trips;

pub use error::{BookingError, InventoryError, TripError};
pub use ledger::{Released, Reserved, SeatLedger};
pub use manager::BookingManager;
pub use trips::TripDesk;
