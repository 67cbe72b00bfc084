// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for driving the project feed service over HTTP.
//!
//! Provides payload generators for the webhook shapes seen in the wild and
//! helpers to build, sign and send requests through the router.

#![allow(dead_code)]

pub mod client;
pub mod payloads;
pub mod stores;
