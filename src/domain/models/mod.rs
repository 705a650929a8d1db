pub mod pass;
pub mod visitor;
