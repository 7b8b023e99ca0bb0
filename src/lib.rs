pub mod auth;
pub mod callback;
pub mod config;
pub mod error;
pub mod http;
pub mod model;
pub mod pkt_line;
pub mod repository;
pub mod serve;
pub mod transaction;
