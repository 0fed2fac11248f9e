//! End-to-end tests at the HTTP request/response level.
//!
//! Each test file covers a specific scenario, driving the full router with
//! in-memory services.

#![cfg(test)]

mod helpers;

mod test_login;
mod test_ping;
mod test_protected_routes;
mod test_refresh;
mod test_register;
mod test_upload;
