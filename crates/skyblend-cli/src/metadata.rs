use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use skyblend_core::{SourceId, UtcDateTime};
use uuid::Uuid;

/// Request identifier (UUID v4) stamped on every command output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Metadata block printed ahead of every command's data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    pub request_id: RequestId,
    pub generated_at: UtcDateTime,
    pub sources: Vec<SourceId>,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Metadata {
    pub fn new(sources: Vec<SourceId>, latency_ms: u64) -> Self {
        Self {
            request_id: RequestId::new_v4(),
            generated_at: UtcDateTime::now(),
            sources,
            latency_ms,
            warnings: Vec::new(),
        }
    }

    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

/// `{"meta": ..., "data": ...}` as written to stdout.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub meta: Metadata,
    pub data: T,
}
