//! Sensor reading → display update translation.
//!
//! All per-sensor policy lives here. Each [`Role`] owns a translation function,
//! and [`Translator`] keeps the reverse lookup from configured entity id to role.

mod role;
mod update;

use std::collections::HashMap;

pub use role::battery_class;
pub use role::grid_disconnect_class;
pub use role::kilowatt_parts;
pub use role::percentage;
pub use role::Limits;
pub use role::Role;
pub use role::GRID_DISCONNECT_HZ;
pub use update::Action;
pub use update::VisualUpdate;
pub use update::PERCENTAGE_VAR;

/// Maps readings from configured entities to display updates.
#[derive(Debug, Clone)]
pub struct Translator {
    roles: HashMap<String, Role>,
    limits: Limits,
}

impl Translator {
    pub fn new<I, S>(entities: I, limits: Limits) -> Self
    where
        I: IntoIterator<Item = (Role, S)>,
        S: Into<String>,
    {
        let roles = entities
            .into_iter()
            .map(|(role, entity_id)| (entity_id.into(), role))
            .collect();
        Self { roles, limits }
    }

    /// The role configured for an entity, if any.
    pub fn role_of(&self, entity_id: &str) -> Option<Role> {
        self.roles.get(entity_id).copied()
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Translate one reading.
    ///
    /// Unmapped entities and unparseable values yield no updates.
    pub fn translate(&self, entity_id: &str, raw: &str) -> Vec<VisualUpdate> {
        self.role_of(entity_id)
            .and_then(|role| role.translate(raw, &self.limits))
            .unwrap_or_default()
    }
}
