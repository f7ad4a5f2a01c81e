pub mod prices;
pub mod types;
