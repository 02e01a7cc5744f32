use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use time::{Duration, PrimitiveDateTime};

use crate::clock::{format_timestamp, Clock};

/// A named container of nodes. `id` stays `None` until the first insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    id: Option<i64>,
    name: String,
    description: Option<String>,
    created_at: PrimitiveDateTime,
    updated_at: PrimitiveDateTime,
    is_active: bool,
}

impl Tree {
    pub fn new(name: impl Into<String>, description: Option<String>, clock: &dyn Clock) -> Self {
        let now = clock.now();
        Self {
            id: None,
            name: name.into(),
            description,
            created_at: now,
            updated_at: now,
            is_active: true,
        }
    }

    /// Rebuilds a tree from persisted state without touching timestamps.
    pub fn from_parts(
        id: Option<i64>,
        name: String,
        description: Option<String>,
        created_at: PrimitiveDateTime,
        updated_at: PrimitiveDateTime,
        is_active: bool,
    ) -> Self {
        Self {
            id,
            name,
            description,
            created_at,
            updated_at,
            is_active,
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn created_at(&self) -> PrimitiveDateTime {
        self.created_at
    }

    pub fn updated_at(&self) -> PrimitiveDateTime {
        self.updated_at
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub(crate) fn assign_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    pub fn rename(&mut self, name: impl Into<String>, clock: &dyn Clock) {
        self.name = name.into();
        self.touch(clock);
    }

    pub fn set_description(&mut self, description: Option<String>, clock: &dyn Clock) {
        self.description = description;
        self.touch(clock);
    }

    pub fn soft_delete(&mut self, clock: &dyn Clock) {
        self.is_active = false;
        self.touch(clock);
    }

    pub fn restore(&mut self, clock: &dyn Clock) {
        self.is_active = true;
        self.touch(clock);
    }

    /// Moves `updated_at` strictly forward, even when the clock has not
    /// ticked past the previous value.
    pub fn touch(&mut self, clock: &dyn Clock) {
        let now = clock.now();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::SECOND
        };
    }
}

impl Serialize for Tree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Tree", 6)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("description", &self.description)?;
        state.serialize_field("created_at", &format_timestamp(self.created_at))?;
        state.serialize_field("updated_at", &format_timestamp(self.updated_at))?;
        state.serialize_field("is_active", &self.is_active)?;
        state.end()
    }
}
