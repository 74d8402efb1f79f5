use serde::{Deserialize, Serialize};
use ts_rs::TS;

pub mod backlog;
pub mod cluster;
pub mod event;
pub mod notification;
pub mod project;
pub mod sprint;
pub mod task;
pub mod upload;
pub mod user;

/// Entities the server may send either as a bare id or populated in place.
pub trait Identified {
    fn id(&self) -> &str;
}

/// Reference to another entity: a bare id string or the populated document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(untagged)]
pub enum Ref<T> {
    Id(String),
    Populated(T),
}

impl<T: Identified> Ref<T> {
    pub fn id(&self) -> &str {
        match self {
            Ref::Id(id) => id,
            Ref::Populated(inner) => inner.id(),
        }
    }

    pub fn populated(&self) -> Option<&T> {
        match self {
            Ref::Id(_) => None,
            Ref::Populated(inner) => Some(inner),
        }
    }
}

impl<T> From<String> for Ref<T> {
    fn from(id: String) -> Self {
        Ref::Id(id)
    }
}

impl<T> From<&str> for Ref<T> {
    fn from(id: &str) -> Self {
        Ref::Id(id.to_string())
    }
}
