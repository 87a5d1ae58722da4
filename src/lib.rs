//! HTTP backend that hands uploaded media to a dubbing provider, lets clients
//! poll the job, and stores the dubbed result in object storage.

pub mod app;
pub mod common;
pub mod config;
pub mod docs;
pub mod infrastructure;
pub mod modules;
pub mod routes;
pub mod state;
