#![doc = "The `task_api` library crate."]
#![doc = ""]
#![doc = "This crate contains the authentication and session lifecycle of the task API:"]
#![doc = "password login, access-token issuance and validation, refresh-token rotation,"]
#![doc = "and revocation on logout, together with the HTTP routes, storage adapters,"]
#![doc = "configuration, and error mapping the binary (`main.rs`) assembles."]

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod recovery;
pub mod routes;
pub mod store;
