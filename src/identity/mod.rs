// ABOUTME: Identity resolution and account linking built on the database layer
// ABOUTME: Resolver maps provider profiles to accounts; linker manages the identity set
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

pub mod linker;
pub mod resolver;

pub use linker::AccountLinker;
pub use resolver::IdentityResolver;
