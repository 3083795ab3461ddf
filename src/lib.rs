// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod certs;
pub mod config;
pub mod constants;
pub mod error;
pub mod installer;
pub mod kubernetes;
pub mod manifests;
pub mod naming;

#[cfg(test)]
pub mod test_utils;
