//! HTTP plumbing and the WAQI reading source.

mod basic;
mod client;
pub mod auth;
pub mod waqi;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use waqi::WaqiSource;
