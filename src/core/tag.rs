// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Tag resolution.
//!
//! The effective tag of an entity chains through user types until a
//! non-empty tag or a base scalar is found. Recursion terminates because
//! a user type's underlying TypeID is always older than the type itself.

use super::registry::TypeRegistry;
use super::types::{Namespace, ScalarType, TypeRef};

/// Resolve the effective tag for an entity of type `type_ref`.
///
/// An explicit tag wins with trailing underscores trimmed. Otherwise the
/// scalar default (or the referenced user type's tag) is returned,
/// lowercased when the host id is all-lowercase.
pub fn resolve_tag(
    registry: &TypeRegistry,
    explicit: Option<&str>,
    type_ref: TypeRef,
    lower: bool,
) -> String {
    if let Some(tag) = explicit {
        return tag.trim_end_matches('_').to_string();
    }
    let tag = derive_tag(registry, type_ref);
    if lower {
        tag.to_lowercase()
    } else {
        tag
    }
}

fn derive_tag(registry: &TypeRegistry, type_ref: TypeRef) -> String {
    match type_ref {
        TypeRef::Scalar(scalar) => scalar.default_tag().to_string(),
        TypeRef::User(id) => {
            let unknown = || ScalarType::Any.default_tag().to_string();
            match id.namespace() {
                Some(Namespace::Declare) => match registry.declare(id) {
                    Some(declare) if !declare.tag.is_empty() => declare.tag.clone(),
                    Some(declare) => derive_tag(registry, declare.base),
                    None => unknown(),
                },
                Some(Namespace::Item) => match registry.item(id) {
                    Some(item) if !item.tag.is_empty() => item.tag.clone(),
                    Some(item) => derive_tag(registry, item.type_ref),
                    None => unknown(),
                },
                Some(Namespace::Aggregate) => match registry.aggregate(id) {
                    Some(aggr) if !aggr.tag.is_empty() => aggr.tag.clone(),
                    Some(aggr) => derive_tag(registry, aggr.type_ref),
                    None => unknown(),
                },
                Some(Namespace::Enum) => match registry.enumeration(id) {
                    Some(en) if !en.tag.is_empty() => en.tag.clone(),
                    Some(_) => ScalarType::Enum.default_tag().to_string(),
                    None => unknown(),
                },
                None => unknown(),
            }
        }
    }
}
