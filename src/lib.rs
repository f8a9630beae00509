pub mod config;
pub mod error;
pub mod http;
pub mod identity;
pub mod links;
pub mod logo;
pub mod output;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod schema;
