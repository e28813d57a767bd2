pub mod cli;
pub mod config;
pub mod error;
pub mod json;
pub mod pvgis;
pub mod records;
pub mod routes;
pub mod state;
pub mod timezone;
