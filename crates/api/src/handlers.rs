pub mod available_slot;
pub mod booking;
