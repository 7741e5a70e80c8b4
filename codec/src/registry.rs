//! Sessions addressed by integer handles.
//!
//! The registry is a generational arena: a [`HandleId`] packs a slot index
//! with the slot's generation, so an id kept after its session was closed
//! can never reach a newer session that reuses the slot.

use std::fmt;

use tracing::debug;

use crate::error::{CodecError, Result};
use crate::session::{Lifecycle, Session};

/// Opaque session handle. Zero is never issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    pub const NULL: HandleId = HandleId(0);

    fn new(index: usize, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64 + 1))
    }

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    fn index(&self) -> Option<usize> {
        let low = (self.0 & 0xFFFF_FFFF) as usize;
        low.checked_sub(1)
    }

    fn generation(&self) -> u32 {
        (self.0 >> 32) as u32
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

struct Slot {
    generation: u32,
    session: Option<Session>,
}

/// Owns every session created through it.
#[derive(Default)]
pub struct SessionRegistry {
    slots: Vec<Slot>,
    free: Vec<usize>,
    live: usize,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Takes ownership of `session` and returns its handle.
    pub fn insert(&mut self, session: Session) -> HandleId {
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index].session = Some(session);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 1,
                    session: Some(session),
                });
                self.slots.len() - 1
            }
        };
        self.live += 1;

        let id = HandleId::new(index, self.slots[index].generation);
        debug!(%id, live = self.live, "opus: session registered");
        id
    }

    fn slot(&self, id: HandleId) -> Option<&Slot> {
        let slot = self.slots.get(id.index()?)?;
        (slot.generation == id.generation()).then_some(slot)
    }

    fn slot_mut(&mut self, id: HandleId) -> Option<&mut Slot> {
        let slot = self.slots.get_mut(id.index()?)?;
        (slot.generation == id.generation()).then_some(slot)
    }

    /// Returns the session behind `id`.
    ///
    /// Unknown, stale and closed ids all fail with
    /// [`CodecError::InvalidState`].
    pub fn get(&self, id: HandleId) -> Result<&Session> {
        self.slot(id)
            .and_then(|s| s.session.as_ref())
            .ok_or(CodecError::InvalidState(Lifecycle::Destroyed))
    }

    pub fn get_mut(&mut self, id: HandleId) -> Result<&mut Session> {
        self.slot_mut(id)
            .and_then(|s| s.session.as_mut())
            .ok_or(CodecError::InvalidState(Lifecycle::Destroyed))
    }

    /// Closes and drops the session behind `id`, retiring the id.
    pub fn close(&mut self, id: HandleId) -> Result<()> {
        let index = id.index();
        let slot = self
            .slot_mut(id)
            .ok_or(CodecError::InvalidState(Lifecycle::Destroyed))?;
        let mut session = slot
            .session
            .take()
            .ok_or(CodecError::InvalidState(Lifecycle::Destroyed))?;
        slot.generation = slot.generation.wrapping_add(1).max(1);

        if let Some(index) = index {
            self.free.push(index);
        }
        self.live -= 1;
        debug!(%id, live = self.live, "opus: session unregistered");
        session.close()
    }
}
