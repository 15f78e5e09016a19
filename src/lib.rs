pub mod arr;
pub mod cli_style;
pub mod config;
pub mod repair;
