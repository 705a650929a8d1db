pub mod sqlite_visitor_repo;
pub mod sqlite_pass_queue;

pub mod postgres_visitor_repo;
pub mod postgres_pass_queue;

pub mod memory_visitor_repo;
pub mod memory_pass_queue;
