//! Quote and invoice lifecycle: line pricing, status rules, numbering,
//! versioning and conversion, served over HTTP.

pub mod config;
pub mod domain;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
