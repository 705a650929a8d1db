pub mod admin;
pub mod ai;
pub mod health;
pub mod pass;
pub mod visitor;
