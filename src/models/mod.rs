// SPDX-License-Identifier: MIT

//! Data models.

pub mod user;

pub use user::{ActivationToken, User, ACTIVATION_TOKEN_TTL_MINUTES};
