// ABOUTME: Shared utility modules
// ABOUTME: Currently only the HTTP client factory lives here
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

pub mod http_client;
