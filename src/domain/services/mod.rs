pub mod assistant;
pub mod classifier;
pub mod visitor_service;
