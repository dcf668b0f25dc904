pub mod category;
pub mod cli;
pub mod container;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod index;
pub mod links;
pub mod models;
pub mod text;
pub mod urls;
