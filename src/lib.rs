pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod output;
pub mod sink;
pub mod taxonomy;
pub mod url_check;
pub mod vocabulary;
