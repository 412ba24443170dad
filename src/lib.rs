pub mod api;
pub mod app;
pub mod cache;
pub mod domain;
pub mod error;
pub mod normalize;
pub mod output;
pub mod search;
