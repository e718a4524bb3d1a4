// ABOUTME: Library root for the sparkpad-auth sign-in service
// ABOUTME: Third-party sign-in (WeChat, Google), account linking, and JWT issuance
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

//! # Sparkpad Auth
//!
//! Third-party sign-in service for Sparkpad: OAuth2 flows against WeChat
//! and Google, one-time CSRF state tokens, identity resolution with
//! per-provider trust rules, account linking with a last-credential
//! guard, and JWT access/refresh issuance.

#![deny(unsafe_code)]

pub mod analytics;
pub mod auth;
pub mod config;
pub mod constants;
pub mod database;
pub mod errors;
pub mod identity;
pub mod logging;
pub mod models;
pub mod oauth;
pub mod routes;
pub mod security;
pub mod server;
pub mod state;
pub mod utils;
