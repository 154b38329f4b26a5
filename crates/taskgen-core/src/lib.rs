pub mod backlog;
pub mod export;
