pub mod command;
pub mod constant;
pub mod engine;
pub mod error;
pub mod event;
pub mod session;
pub mod stages;
