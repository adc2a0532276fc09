//! Integration tests for repository export

mod http_services;
mod support;
