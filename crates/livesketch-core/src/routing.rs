//! Canvas routes and opening drawings by path.

use crate::drawing::{Drawing, DrawingId};
use crate::error::CanvasError;
use crate::identity::IdentityProvider;
use crate::storage::DocumentStore;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("Not a canvas path: {0}")]
    NotCanvas(String),
    #[error("Invalid drawing id: {0}")]
    InvalidId(String),
}

/// A navigable canvas path: `/canvas` or `/canvas/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasRoute {
    /// No id: a new drawing will be created.
    New,
    Drawing(DrawingId),
}

impl CanvasRoute {
    const PREFIX: &'static str = "/canvas";

    pub fn parse(path: &str) -> Result<Self, RouteError> {
        let rest = path
            .trim_end_matches('/')
            .strip_prefix(Self::PREFIX)
            .ok_or_else(|| RouteError::NotCanvas(path.to_string()))?;
        if rest.is_empty() {
            return Ok(CanvasRoute::New);
        }
        let id = rest
            .strip_prefix('/')
            .ok_or_else(|| RouteError::NotCanvas(path.to_string()))?;
        Uuid::parse_str(id)
            .map(CanvasRoute::Drawing)
            .map_err(|_| RouteError::InvalidId(id.to_string()))
    }

    pub fn path(&self) -> String {
        self.to_string()
    }
}

impl FromStr for CanvasRoute {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CanvasRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanvasRoute::New => f.write_str(Self::PREFIX),
            CanvasRoute::Drawing(id) => write!(f, "{}/{}", Self::PREFIX, id),
        }
    }
}

/// A drawing resolved from a route.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenedDrawing {
    pub drawing: Drawing,
    /// Set when the drawing was just created; the current path should be
    /// replaced with this one in place.
    pub replace_path: Option<String>,
}

/// Load the drawing a route points at, or create one for `/canvas`.
pub async fn open_drawing<S, I>(
    route: CanvasRoute,
    docs: &S,
    identity: &I,
) -> Result<OpenedDrawing, CanvasError>
where
    S: DocumentStore + ?Sized,
    I: IdentityProvider + ?Sized,
{
    match route {
        CanvasRoute::Drawing(id) => {
            let drawing = docs.get_drawing(id).await.map_err(|e| {
                log::error!("Failed to load drawing {}: {}", id, e);
                CanvasError::LoadFailure(e.to_string())
            })?;
            Ok(OpenedDrawing {
                drawing,
                replace_path: None,
            })
        }
        CanvasRoute::New => {
            let owner = identity
                .current_author()
                .ok_or(CanvasError::NotAuthenticated)?;
            let drawing = docs
                .create_drawing(Drawing::DEFAULT_TITLE, &owner)
                .await
                .map_err(|e| CanvasError::PersistenceFailure(e.to_string()))?;
            let replace_path = CanvasRoute::Drawing(drawing.id).path();
            log::info!("Created drawing {}, moving to {}", drawing.id, replace_path);
            Ok(OpenedDrawing {
                drawing,
                replace_path: Some(replace_path),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::AuthorId;
    use crate::identity::StaticIdentity;
    use crate::storage::{MemoryStorage, block_on};
    use crate::drawing::Visibility;

    #[test]
    fn test_parse_routes() {
        assert_eq!(CanvasRoute::parse("/canvas").unwrap(), CanvasRoute::New);
        assert_eq!(CanvasRoute::parse("/canvas/").unwrap(), CanvasRoute::New);

        let id = Uuid::new_v4();
        let route = CanvasRoute::parse(&format!("/canvas/{}", id)).unwrap();
        assert_eq!(route, CanvasRoute::Drawing(id));
        assert_eq!(route.path(), format!("/canvas/{}", id));

        assert!(matches!(CanvasRoute::parse("/gallery"), Err(RouteError::NotCanvas(_))));
        assert!(matches!(CanvasRoute::parse("/canvasx"), Err(RouteError::NotCanvas(_))));
        assert!(matches!(CanvasRoute::parse("/canvas/nope"), Err(RouteError::InvalidId(_))));
    }

    #[test]
    fn test_new_route_creates_drawing() {
        let docs = MemoryStorage::new();
        let identity = StaticIdentity::new(AuthorId::new("alice"));

        let opened = block_on(open_drawing(CanvasRoute::New, &docs, &identity)).unwrap();
        assert_eq!(opened.drawing.title, "Untitled Drawing");
        assert_eq!(opened.drawing.visibility, Visibility::Public);
        assert!(opened.drawing.canvas_data.is_empty());
        assert_eq!(
            opened.replace_path,
            Some(format!("/canvas/{}", opened.drawing.id))
        );
        assert!(block_on(docs.get_drawing(opened.drawing.id)).is_ok());
    }

    #[test]
    fn test_new_route_requires_identity() {
        let docs = MemoryStorage::new();
        let result = block_on(open_drawing(CanvasRoute::New, &docs, &StaticIdentity::anonymous()));
        assert_eq!(result, Err(CanvasError::NotAuthenticated));
    }

    #[test]
    fn test_existing_route_loads() {
        let docs = MemoryStorage::new();
        let drawing = block_on(docs.create_drawing("Mine", &AuthorId::new("alice"))).unwrap();

        let opened = block_on(open_drawing(
            CanvasRoute::Drawing(drawing.id),
            &docs,
            &StaticIdentity::anonymous(),
        ))
        .unwrap();
        assert_eq!(opened.drawing, drawing);
        assert!(opened.replace_path.is_none());
    }

    #[test]
    fn test_missing_drawing_is_load_failure() {
        let docs = MemoryStorage::new();
        let result = block_on(open_drawing(
            CanvasRoute::Drawing(Uuid::new_v4()),
            &docs,
            &StaticIdentity::anonymous(),
        ));
        assert!(matches!(result, Err(CanvasError::LoadFailure(_))));
    }
}
