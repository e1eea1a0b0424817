pub mod analytics;
pub mod cache;
pub mod correlation;
pub mod normalize;
pub mod returns;
pub mod risk;
