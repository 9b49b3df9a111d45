//! Hierarchical instance identifiers.
//!
//! A submodule's identity is its parent's identity plus a role token. Role tokens never split into
//! other role tokens, so two different role paths under the same root always render differently.

use std::fmt;

use itertools::Itertools;

use crate::error::GenError;
use crate::utils::is_identifier;

/// Role of a submodule inside its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    /// Unit wrapped by a signal manager, or the core of a composite unit.
    Inner,
    /// Delay line.
    Buff,
    /// Join of input valid signals.
    Join,
    /// One-slot buffer breaking the ready path.
    OneSlotBreakR,
    /// One-slot buffer breaking the data and valid paths.
    OneSlotBreakDv,
    /// Four-stage integer multiplier core.
    Mul4Stage,
}

impl Role {
    /// Suffix appended to the parent name.
    pub const fn token(self) -> &'static str {
        match self {
            Role::Inner => "inner",
            Role::Buff => "buff",
            Role::Join => "join",
            Role::OneSlotBreakR => "one_slot_break_r",
            Role::OneSlotBreakDv => "one_slot_break_dv",
            Role::Mul4Stage => "mul_4_stage",
        }
    }
}

/// Structured identity of a generated module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceId {
    root: String,
    roles: Vec<Role>,
}

impl InstanceId {
    /// Top-level identity. `root` must be a valid identifier.
    pub fn new<S: Into<String>>(root: S) -> Result<Self, GenError> {
        let root = root.into();
        if !is_identifier(&root) {
            return Err(GenError::invalid("name", format!("`{}` is not a valid module name", root)));
        }
        Ok(Self { root, roles: Vec::new() })
    }

    /// Identity of the submodule playing `role` inside `self`.
    pub fn child(&self, role: Role) -> Self {
        let mut roles = self.roles.clone();
        roles.push(role);
        Self { root: self.root.clone(), roles }
    }

    /// Identity of the parent module, if any.
    pub fn parent(&self) -> Option<Self> {
        let (_, roles) = self.roles.split_last()?;
        Some(Self { root: self.root.clone(), roles: roles.to_vec() })
    }

    /// Role path below the root.
    pub fn roles(&self) -> &[Role] { &self.roles }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.root)?;
        if !self.roles.is_empty() {
            write!(f, "_{}", self.roles.iter().map(|role| role.token()).join("_"))?;
        }
        Ok(())
    }
}
