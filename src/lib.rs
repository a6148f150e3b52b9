pub mod api;
pub mod config;
pub mod constants;
pub mod domain;
pub mod duplicates;
pub mod error;
pub mod flatten;
pub mod input;
pub mod output;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod table;
