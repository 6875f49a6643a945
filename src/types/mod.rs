pub mod event;
pub mod holding;
pub mod order;
pub mod user;
