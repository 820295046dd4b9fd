use serde::{Deserialize, Serialize};

/// Read view currently selected by the presentation layer. Routing state only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum View {
    #[default]
    Live,
    Analytics,
    History,
    Settings,
}
