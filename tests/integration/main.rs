//! Integration tests for the harvester
//!
//! The harvest tests drive a full harvester against a fixture front-end;
//! the HTTP tests use wiremock to exercise the network-backed browser and
//! media fetcher.

mod fixtures;
mod harvest_tests;
