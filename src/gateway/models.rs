use serde::{Deserialize, Serialize};

// --- Request bodies ---

#[derive(Debug, Serialize)]
pub struct TitleBody<'a> {
    pub title: &'a str,
}

#[derive(Debug, Serialize)]
pub struct PinnedBody {
    pub pinned: bool,
}

// --- Response bodies ---

/// Uniform response wrapper: `code == 200` carries `data`, anything else carries `msg`.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope {
    pub code: i64,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Error bodies come in several shapes depending on which layer produced them.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    /// The `detail` field rendered as text. Validation errors send a list of objects.
    pub fn detail_text(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            serde_json::Value::Array(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .map(|item| {
                        item.get("msg")
                            .and_then(|m| m.as_str())
                            .map(str::to_string)
                            .unwrap_or_else(|| item.to_string())
                    })
                    .collect();
                Some(parts.join("; "))
            }
            other => Some(other.to_string()),
        }
    }

    /// Most specific message the body offers.
    pub fn best_message(&self) -> Option<String> {
        self.detail_text()
            .or_else(|| self.msg.clone())
            .or_else(|| self.message.clone())
            .filter(|m| !m.is_empty())
    }
}
