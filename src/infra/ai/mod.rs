pub mod chat_completion_service;
