// ABOUTME: Tests that logging initialization works for every configured format
// ABOUTME: Single test per process; the global subscriber can only be installed once
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

use std::env;

use sparkpad_auth::logging::init_logging;

#[test]
fn test_pretty_format_initializes() {
    env::set_var("LOG_FORMAT", "pretty");
    assert!(init_logging().is_ok());

    // A second subscriber cannot be installed in the same process
    assert!(init_logging().is_err());
}
