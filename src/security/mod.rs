// ABOUTME: Security helpers shared by the route layer
// ABOUTME: Refresh-token cookie construction and request cookie parsing
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

pub mod cookies;
