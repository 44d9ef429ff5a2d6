use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

/// Check outcome for one dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentHealth {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ComponentHealth {
    pub fn ok() -> Self {
        Self {
            status: Status::Ok,
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: Status,
    pub version: String,
    pub database: ComponentHealth,
    pub cache: ComponentHealth,
}

impl HealthReport {
    pub fn new(
        version: impl Into<String>,
        database: ComponentHealth,
        cache: ComponentHealth,
    ) -> Self {
        let status = if database.status == Status::Ok && cache.status == Status::Ok {
            Status::Ok
        } else {
            Status::Error
        };

        Self {
            status,
            version: version.into(),
            database,
            cache,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == Status::Ok
    }
}
