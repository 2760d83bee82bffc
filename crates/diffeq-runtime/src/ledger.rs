//! Bookkeeping of live module-side objects.
//!
//! Every object a module creates on behalf of the host is recorded with a
//! generation number. Handles carry the generation they were issued with, so a
//! handle whose object was released (even if the module later reuses the same
//! address) is recognised as stale.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use diffeq_core::{DiffeqError, Result};

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one instantiated module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    pub(crate) fn next() -> Self {
        Self(NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of module-side object. Declaration order is release order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HandleKind {
    Solver,
    Options,
    Vector,
}

impl HandleKind {
    pub fn name(self) -> &'static str {
        match self {
            HandleKind::Solver => "Solver",
            HandleKind::Options => "Options",
            HandleKind::Vector => "Vector",
        }
    }
}

/// The host's side of a module object: pointer, origin and generation.
///
/// Deliberately neither `Copy` nor `Clone`.
#[derive(Debug)]
pub(crate) struct RawHandle {
    pub(crate) ptr: i32,
    pub(crate) kind: HandleKind,
    pub(crate) instance: InstanceId,
    pub(crate) generation: u64,
}

#[derive(Debug, Default)]
pub(crate) struct HandleLedger {
    next_generation: u64,
    live: HashMap<(HandleKind, i32), u64>,
}

impl HandleLedger {
    pub(crate) fn adopt(&mut self, kind: HandleKind, ptr: i32) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        if self.live.insert((kind, ptr), generation).is_some() {
            tracing::warn!(
                event = "handle_address_reused",
                kind = kind.name(),
                ptr,
                "module returned the address of a live object"
            );
        }
        generation
    }

    pub(crate) fn check(&self, kind: HandleKind, ptr: i32, generation: u64) -> Result<()> {
        match self.live.get(&(kind, ptr)) {
            Some(&live) if live == generation => Ok(()),
            _ => Err(DiffeqError::UseAfterDestroy {
                kind: kind.name(),
                ptr,
            }),
        }
    }

    pub(crate) fn release(&mut self, kind: HandleKind, ptr: i32, generation: u64) -> Result<()> {
        self.check(kind, ptr, generation)?;
        self.live.remove(&(kind, ptr));
        Ok(())
    }

    pub(crate) fn forget(&mut self, kind: HandleKind, ptr: i32) {
        self.live.remove(&(kind, ptr));
    }

    /// Generation the next adopted object will receive.
    pub(crate) fn watermark(&self) -> u64 {
        self.next_generation
    }

    /// Live objects adopted at or after `watermark`, in release order:
    /// solvers before options before vectors, newest first within a kind.
    pub(crate) fn adopted_since(&self, watermark: u64) -> Vec<(HandleKind, i32)> {
        let mut entries: Vec<_> = self
            .live
            .iter()
            .filter(|&(_, &generation)| generation >= watermark)
            .map(|(&(kind, ptr), &generation)| (kind, std::cmp::Reverse(generation), ptr))
            .collect();
        entries.sort();
        entries
            .into_iter()
            .map(|(kind, _, ptr)| (kind, ptr))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.live.len()
    }

    pub(crate) fn count(&self, kind: HandleKind) -> usize {
        self.live.keys().filter(|(k, _)| *k == kind).count()
    }
}
