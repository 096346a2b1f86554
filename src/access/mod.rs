//! Actors and the permission gates evaluated before every mutation.

use crate::core::Denial;

/// Authenticated user performing a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: i64,
    pub administrator: bool,
    pub worker: bool,
}

impl Actor {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            administrator: false,
            worker: false,
        }
    }

    pub fn administrator(mut self) -> Self {
        self.administrator = true;
        self
    }

    pub fn worker(mut self) -> Self {
        self.worker = true;
        self
    }
}

/// Permission flags bound to an entity type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjectPolicy {
    pub admin_only: bool,
    pub creator_only: bool,
}

impl ObjectPolicy {
    pub const fn open() -> Self {
        Self {
            admin_only: false,
            creator_only: false,
        }
    }

    pub const fn admin_only() -> Self {
        Self {
            admin_only: true,
            creator_only: false,
        }
    }

    pub const fn creator_only() -> Self {
        Self {
            admin_only: false,
            creator_only: true,
        }
    }

    pub fn is_open(&self) -> bool {
        !self.admin_only && !self.creator_only
    }
}

/// Evaluates `policy` for `actor` against a record owned by `owner`.
///
/// A creator-only record accepts an actor only if it created the record and
/// holds both the worker and administrator roles.
pub fn authorize(policy: &ObjectPolicy, actor: Option<&Actor>, owner: Option<i64>) -> Result<(), Denial> {
    if policy.is_open() {
        return Ok(());
    }
    let actor = actor.ok_or(Denial::NoActor)?;

    if policy.admin_only && !actor.administrator {
        return Err(Denial::NotAdministrator);
    }

    if policy.creator_only {
        if owner != Some(actor.id) {
            return Err(Denial::NotCreator);
        }
        if !actor.worker {
            return Err(Denial::NotWorker);
        }
        if !actor.administrator {
            return Err(Denial::NotAdministrator);
        }
    }

    Ok(())
}
