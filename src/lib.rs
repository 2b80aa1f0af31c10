pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod preprocess;
pub mod scanner;
pub mod store;
