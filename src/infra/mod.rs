pub mod ai;
pub mod email;
pub mod factory;
pub mod pass;
pub mod repositories;
pub mod storage;
