//! Common utilities and types shared across FirstMeet components.

#![warn(clippy::pedantic)]

/// Module for room directory and token wire types
pub mod types;

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for room access tokens (claims, grants, signing)
pub mod jwt;
