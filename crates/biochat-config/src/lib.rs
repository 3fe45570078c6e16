// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod error;
mod schema;
mod loader;

pub use error::ConfigError;
pub use schema::*;
pub use loader::{apply_env_overrides, load, load_with_env};
