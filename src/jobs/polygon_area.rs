// src/jobs/polygon_area.rs

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::Job;
use crate::model::Task;

/// WGS84 equatorial radius in metres.
const EARTH_RADIUS_M: f64 = 6_378_137.0;

type Ring = Vec<Vec<f64>>;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Shape {
    Feature { geometry: Box<Shape> },
    Polygon { coordinates: Vec<Ring> },
    MultiPolygon { coordinates: Vec<Vec<Ring>> },
}

/// Computes the area of the task's GeoJSON input in square metres.
#[derive(Debug, Default, Clone, Copy)]
pub struct PolygonAreaJob;

#[async_trait]
impl Job for PolygonAreaJob {
    async fn run(&self, task: &Task) -> Result<Value> {
        info!(task_id = %task.task_id, "running polygon area calculation");

        let area = geojson_area(&task.input)?;
        info!(task_id = %task.task_id, area, "calculated area in square meters");

        Ok(json!({
            "area": area,
            "unit": "square meters",
        }))
    }
}

/// Area of a Polygon, MultiPolygon, or Feature wrapping one.
pub fn geojson_area(input: &str) -> Result<f64> {
    let value: Value = serde_json::from_str(input).context("input is not valid JSON")?;
    let shape: Shape = serde_json::from_value(value)
        .context("Invalid GeoJSON: Must be a Polygon or MultiPolygon")?;
    shape_area(&shape)
}

fn shape_area(shape: &Shape) -> Result<f64> {
    match shape {
        Shape::Feature { geometry } => shape_area(geometry),
        Shape::Polygon { coordinates } => polygon_area(coordinates),
        Shape::MultiPolygon { coordinates } => coordinates
            .iter()
            .map(|polygon| polygon_area(polygon))
            .sum(),
    }
}

/// Outer ring minus holes.
fn polygon_area(rings: &[Ring]) -> Result<f64> {
    let Some((outer, holes)) = rings.split_first() else {
        return Ok(0.0);
    };

    let mut total = ring_area(outer)?.abs();
    for hole in holes {
        total -= ring_area(hole)?.abs();
    }
    Ok(total)
}

/// Signed spherical area of a closed ring of `[lon, lat]` positions.
fn ring_area(ring: &Ring) -> Result<f64> {
    for position in ring {
        if position.len() < 2 {
            bail!("Invalid GeoJSON: position {position:?} needs longitude and latitude");
        }
    }

    let len = ring.len().saturating_sub(1);
    if len <= 2 {
        return Ok(0.0);
    }

    let mut total = 0.0;
    for i in 0..len {
        let lower = &ring[i];
        let middle = &ring[if i + 1 == len { 0 } else { i + 1 }];
        let upper = &ring[if i + 2 >= len { (i + 2) % len } else { i + 2 }];

        total += (upper[0].to_radians() - lower[0].to_radians()) * middle[1].to_radians().sin();
    }

    Ok(total * EARTH_RADIUS_M * EARTH_RADIUS_M / 2.0)
}
