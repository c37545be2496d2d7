// isomp4-core
// Copyright (c) 2026 The isomp4-core Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ambient parse configuration, separate from the stateless per-call parsing itself.

use crate::atom::MAX_ATOM_BODY_SIZE;

/// Knobs that don't change the meaning of a well-formed stream, only how the parser reacts to a
/// malformed one.
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// Declared atom body sizes above this are rejected as `BadAtom` before any allocation is
    /// attempted, regardless of what the enclosing container's remaining length would allow.
    pub max_atom_body_size: u64,
    /// When true, a `BadAtom` while decoding a sample-table or sample-entry child degrades to
    /// dropping that child (logged at `warn`) instead of failing the enclosing `trak`/`traf`.
    pub permissive: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { max_atom_body_size: MAX_ATOM_BODY_SIZE, permissive: false }
    }
}
