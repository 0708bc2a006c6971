//! Point datasets served to clients.

use std::f64::consts::PI;
use std::path::Path;

use idr_core::point::generate_point_id;
use idr_core::PointRecord;

/// Points per cluster in the built-in layout.
pub const CLUSTER_SIZE: usize = 50;

/// Cluster centres and spreads, one per class label.
const CLUSTERS: [(f64, f64, f64); 3] = [(-2.7, 0.3, 0.5), (0.3, -0.5, 0.8), (1.9, 0.2, 0.9)];

/// Three labelled clusters of points arranged on sunflower spirals.
/// Always the same layout, so clients can be compared run to run.
pub fn builtin() -> Vec<PointRecord> {
    let golden_angle = PI * (3.0 - 5.0_f64.sqrt());
    let mut records = Vec::with_capacity(CLUSTERS.len() * CLUSTER_SIZE);

    for (label, &(cx, cy, spread)) in CLUSTERS.iter().enumerate() {
        for i in 0..CLUSTER_SIZE {
            let r = spread * ((i as f64 + 0.5) / CLUSTER_SIZE as f64).sqrt();
            let theta = i as f64 * golden_angle;
            let id = format!("p{}", label * CLUSTER_SIZE + i);
            records.push(
                PointRecord::new(id, cx + r * theta.cos(), cy + r * theta.sin())
                    .with_label(label.to_string()),
            );
        }
    }
    records
}

/// Load a JSON array of point records. Records without an id get one.
pub fn load(path: impl AsRef<Path>) -> std::io::Result<Vec<PointRecord>> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let mut records: Vec<PointRecord> = serde_json::from_str(&text)?;
    for record in records.iter_mut().filter(|r| r.id.is_none()) {
        record.id = Some(generate_point_id());
    }
    Ok(records)
}
