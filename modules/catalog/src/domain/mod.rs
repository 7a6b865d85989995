pub mod entities;
pub mod error;
pub mod models;
pub mod registry;
pub mod repo;
pub mod requests;
pub mod service;

#[cfg(test)]
mod service_test;
