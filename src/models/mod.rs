pub mod analytics;
pub mod config;
pub mod fundamentals;
pub mod price;
pub mod series;
pub mod symbol;
