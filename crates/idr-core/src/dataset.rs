//! Ordered collection of data points.

use std::collections::{HashMap, HashSet};

use kurbo::Vec2;

use crate::point::{generate_point_id, DataPoint, PointId};
use crate::protocol::PointRecord;

/// Points keyed by id, kept in arrival order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    /// All points, keyed by id.
    points: HashMap<PointId, DataPoint>,
    /// Arrival order of ids.
    order: Vec<PointId>,
}

impl Dataset {
    /// Create an empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest a snapshot, one point per record, preserving record order.
    ///
    /// A record repeating an id already seen in the same snapshot is given a
    /// fresh id so that ids stay unique.
    pub fn from_records(records: impl IntoIterator<Item = PointRecord>) -> Self {
        Self::from_points(records.into_iter().map(DataPoint::from_record))
    }

    /// Build from already-constructed points, preserving order.
    pub fn from_points(points: impl IntoIterator<Item = DataPoint>) -> Self {
        let mut dataset = Self::new();
        let mut seen = HashSet::new();
        for mut point in points {
            if !seen.insert(point.id.clone()) {
                let fresh = generate_point_id();
                log::warn!("Duplicate point id '{}' in snapshot, re-keyed as '{}'", point.id, fresh);
                point.id = fresh.clone();
                seen.insert(fresh);
            }
            dataset.order.push(point.id.clone());
            dataset.points.insert(point.id.clone(), point);
        }
        dataset
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Get a point by id.
    pub fn get(&self, id: &str) -> Option<&DataPoint> {
        self.points.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.points.contains_key(id)
    }

    /// Ids in arrival order.
    pub fn ids(&self) -> &[PointId] {
        &self.order
    }

    /// Points in arrival order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &DataPoint> {
        self.order.iter().filter_map(|id| self.points.get(id))
    }

    /// A new dataset with one point's display position shifted by `delta`.
    /// Returns `None` if the id is unknown. Order is unchanged.
    pub fn moved(&self, id: &str, delta: Vec2) -> Option<Self> {
        let point = self.points.get(id)?.translated(delta);
        let mut next = self.clone();
        next.points.insert(point.id.clone(), point);
        Some(next)
    }
}
