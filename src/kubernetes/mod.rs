// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for schema version discovery and secret reconciliation.

pub mod discovery;
pub mod secrets;

pub use discovery::{negotiate, SchemaVersion};
pub use secrets::reconcile_secret;
