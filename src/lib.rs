pub mod ccbot;
pub mod ccdb;
pub mod config;
pub mod glot;
pub mod models;
