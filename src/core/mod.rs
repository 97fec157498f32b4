// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Core components of the semantic analyser and layout engine.
//!
//! - [`types`] - Scalar types, TypeID namespaces, radix
//! - [`model`] - Resolved module entities
//! - [`registry`] - User-type namespaces
//! - [`tag`] - Tag resolution
//! - [`bitfield`] - Bitfield packing and promotion
//! - [`layout`] - Offset assignment and aggregate sizing
//! - [`conditional`] - Conditional compilation state machine
//! - [`symbols`] - Condition symbols and module locals
//! - [`error`] - Error types and diagnostics
//! - [`listing`] - Listing file generation

pub mod bitfield;
pub mod conditional;
pub mod error;
pub mod layout;
pub mod listing;
pub mod model;
pub mod registry;
pub mod symbols;
pub mod tag;
pub mod types;
