pub mod agent;
pub mod config;
pub mod context;
pub mod db;
pub mod errors;
pub mod ids;
pub mod models;
pub mod routes;
pub mod service;
pub mod state;
