//! Integration tests for capfs.
//!
//! This crate provides:
//! - A harness running a real server on a loopback port
//! - Integration tests for sessions, permissions and admission under
//!   concurrent clients

pub mod harness;

pub use harness::TestServer;
