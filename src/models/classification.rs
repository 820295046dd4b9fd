//! Classification data model.
//!
//! A `ClassificationResult` is produced once per successful capture tick and is
//! immutable afterwards.

use std::fmt;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum SurfaceType {
    Smooth,
    Rough,
}

impl SurfaceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SurfaceType::Smooth => "smooth",
            SurfaceType::Rough => "rough",
        }
    }
}

impl fmt::Display for SurfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque reference to a captured frame. Never interpreted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    id: String,
    timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    surface_type: SurfaceType,
    confidence: f64,
    image_ref: ImageRef,
}

impl ClassificationResult {
    /// Builds a result with a fresh v4 id. Fails if `confidence` is NaN or
    /// outside `[0, 1]`.
    pub fn new(
        timestamp: DateTime<Utc>,
        surface_type: SurfaceType,
        confidence: f64,
        image_ref: ImageRef,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&confidence) {
            bail!("confidence {confidence} outside [0, 1]");
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            timestamp,
            surface_type,
            confidence,
            image_ref,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn surface_type(&self) -> SurfaceType {
        self.surface_type
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn image_ref(&self) -> &ImageRef {
        &self.image_ref
    }
}
