//! memwatch agent: hosts a memory monitor behind an HTTP control surface

pub mod api;
pub mod config;
