//! Integration tests for the sweep harness
//!
//! These tests drive the retry controller and the coordinator with a
//! scripted stand-in for the crawl tool that writes (or withholds) output
//! folders, artifacts and log sentinels.

mod controller_tests;
mod support;
