use std::fmt::Display;
use std::str::FromStr;

use anyhow::{bail, Error};
use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

use crate::models::{ClassificationResult, SurfaceType};
use crate::utils::format::display_timestamp;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TypeFilter {
    #[default]
    All,
    Smooth,
    Rough,
}

impl TypeFilter {
    pub fn matches(&self, surface_type: SurfaceType) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Smooth => surface_type == SurfaceType::Smooth,
            TypeFilter::Rough => surface_type == SurfaceType::Rough,
        }
    }
}

impl FromStr for TypeFilter {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "all" => Ok(TypeFilter::All),
            "smooth" => Ok(TypeFilter::Smooth),
            "rough" => Ok(TypeFilter::Rough),
            _ => bail!("unknown type filter '{value}'"),
        }
    }
}

/// Filters `history`, rendering timestamps in local time for search.
pub fn query(
    history: &[ClassificationResult],
    type_filter: TypeFilter,
    search_text: &str,
) -> Vec<ClassificationResult> {
    query_in(history, type_filter, search_text, &Local)
}

/// Keeps results passing `type_filter` whose type name or rendered timestamp
/// contains `search_text`, ignoring case. Empty search text keeps everything.
/// Order is preserved.
pub fn query_in<Tz>(
    history: &[ClassificationResult],
    type_filter: TypeFilter,
    search_text: &str,
    tz: &Tz,
) -> Vec<ClassificationResult>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let needle = search_text.to_lowercase();

    history
        .iter()
        .filter(|r| type_filter.matches(r.surface_type()))
        .filter(|r| {
            needle.is_empty()
                || r.surface_type().as_str().contains(&needle)
                || display_timestamp(r.timestamp(), tz)
                    .to_lowercase()
                    .contains(&needle)
        })
        .cloned()
        .collect()
}
