//! Integration tests for Sumi-Mirror

mod agent_tests;
mod crawl_tests;
