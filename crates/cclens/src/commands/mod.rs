pub mod bugs;
pub mod jump;
pub mod list;
pub mod reload;
pub mod summary;
