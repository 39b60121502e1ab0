#![doc = "The `todolite` library crate."]
#![doc = ""]
#![doc = "This crate contains the domain models, authentication mechanisms, routing"]
#![doc = "configuration, error handling, and the daily reminder scanner for the"]
#![doc = "todolite API. It is used by the main binary (`main.rs`) to construct and"]
#![doc = "run the application."]

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod reminder;
pub mod routes;
