//! Gatehouse - role-based admin bar and admin area access control
//!
//! This library provides the policy core and its HTTP surface.
//! It exposes all modules for testing purposes.

pub mod errors;
pub mod policy;
pub mod settings;
pub mod web;
