pub mod broker;
pub mod config;
pub mod core;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod news;
pub mod store;

#[cfg(test)]
pub mod test_helpers;
