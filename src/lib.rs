// Library exports for socialserver
// Integration tests drive the router built here.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod social;
pub mod state;

#[cfg(test)]
mod test_support;
