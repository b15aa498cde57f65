pub mod category;
pub mod collector;
pub mod config;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod output;
pub mod services;
pub mod types;
pub mod watch;
