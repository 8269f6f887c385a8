pub mod eventbus;
pub mod panel;
pub mod service;
