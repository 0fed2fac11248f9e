// Life of a request:
// 1. HTTP request comes in through the axum router
// 2. Public routes:
//     - /register hashes the password and stores the account
//     - /login verifies the password and mints an access/refresh token pair
//     - /refresh checks the refresh token against the account's current salt
//       and mints a new access token
// 3. Protected routes:
//     - Bearer middleware validates the access token
//     - Account snapshot from the token is attached to the request
//     - Handler runs (image upload, image listing)
//
// System components:
//  - Token authority (signing, validation)
//  - Account store + service
//  - Image service

pub mod account;
pub mod api;
pub mod auth;
pub mod config;
pub mod files;
pub mod time;

mod e2e_tests;
