use bugboy_core::context::RequestInfo;
use bugboy_core::envelope::timestamp_now;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Error,
    Panic,
}

/// Request annotation attached to an event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestSummary {
    pub method: String,
    pub path: String,
    pub request_id: String,
}

impl From<&RequestInfo> for RequestSummary {
    fn from(info: &RequestInfo) -> Self {
        Self {
            method: info.method.to_string(),
            path: info.path.clone(),
            request_id: info.request_id.to_string(),
        }
    }
}

/// One document posted to the monitoring endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SinkEvent {
    pub kind: EventKind,
    pub message: String,
    pub timestamp: String,
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestSummary>,
}

impl SinkEvent {
    pub fn new(kind: EventKind, message: String, service: &str, environment: Option<&str>) -> Self {
        Self {
            kind,
            message,
            timestamp: timestamp_now(),
            service: service.to_string(),
            environment: environment.map(str::to_string),
            request: None,
        }
    }

    pub fn with_request(mut self, request: &RequestInfo) -> Self {
        self.request = Some(request.into());
        self
    }
}
