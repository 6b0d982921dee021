//! Shared primitives for the Stride step runtime crates.
//!
//! Identifier newtypes and the page routing handle passed to every
//! collaborator call. Kept dependency-light so all other crates can use it.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PageId(pub String);

impl PageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for PageId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct FrameId(pub String);

impl FrameId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for FrameId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct StepId(pub String);

impl StepId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for StepId {
    fn default() -> Self {
        Self::new()
    }
}

/// Addressing handle for one page target. Every browser and snapshot call
/// carries one so collaborators never guess which surface is meant.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PageRoute {
    pub session: SessionId,
    pub page: PageId,
    pub frame: FrameId,
}

impl PageRoute {
    pub fn new(session: SessionId, page: PageId, frame: FrameId) -> Self {
        Self {
            session,
            page,
            frame,
        }
    }

    /// Route addressing the page's main frame.
    pub fn for_page(session: SessionId, page: PageId) -> Self {
        Self::new(session, page, FrameId::new())
    }
}

impl fmt::Display for PageRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "session={} page={} frame={}",
            self.session.0, self.page.0, self.frame.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
        assert_ne!(StepId::new(), StepId::new());
    }

    #[test]
    fn route_display_names_all_parts() {
        let route = PageRoute::new(
            SessionId("s1".into()),
            PageId("p1".into()),
            FrameId("f1".into()),
        );
        assert_eq!(route.to_string(), "session=s1 page=p1 frame=f1");
    }
}
