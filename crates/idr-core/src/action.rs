//! Actions: the only way to request a state change.

use kurbo::Vec2;

use crate::dataset::Dataset;
use crate::point::PointId;

/// A state-change request delivered to the store's reducer.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Append a todo entry. Empty text is ignored.
    AddTodo { text: String },
    /// Replace the whole dataset with a server snapshot.
    RefreshDataset { dataset: Dataset },
    /// Shift one point's display position by `delta`.
    MovePoint { id: PointId, delta: Vec2 },
}

impl Action {
    pub fn add_todo(text: impl Into<String>) -> Self {
        Self::AddTodo { text: text.into() }
    }

    pub fn refresh_dataset(dataset: Dataset) -> Self {
        Self::RefreshDataset { dataset }
    }

    pub fn move_point(id: impl Into<PointId>, delta: Vec2) -> Self {
        Self::MovePoint {
            id: id.into(),
            delta,
        }
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AddTodo { .. } => "ADD_TODO",
            Self::RefreshDataset { .. } => "REFRESH_DATASET",
            Self::MovePoint { .. } => "MOVE_POINT",
        }
    }
}
