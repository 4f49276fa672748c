use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::arm::ArmError;
use crate::clients::Clients;
use crate::plan::Plan;
use crate::resourceids::ResourceIdError;
use crate::schema::Schema;
use crate::state::ResourceData;

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error(
        "A resource with the ID {id:?} already exists - to be managed via Terraform this resource needs to be imported into the State. Please see the resource documentation for {resource_type:?} for more information."
    )]
    AlreadyExists { resource_type: String, id: String },

    #[error("{0} was not found")]
    NotFound(String),

    #[error("validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),

    #[error("timed out after {after:?} during {operation} of {resource_type}")]
    Timeout {
        operation: &'static str,
        resource_type: String,
        after: Duration,
    },

    #[error("unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error(transparent)]
    ResourceId(#[from] ResourceIdError),

    #[error(transparent)]
    Arm(#[from] ArmError),

    #[error("{context}: {source}")]
    Api {
        context: String,
        #[source]
        source: ArmError,
    },

    #[error("{0}")]
    Other(String),
}

impl ResourceError {
    pub fn already_exists(resource_type: &str, id: impl Into<String>) -> Self {
        ResourceError::AlreadyExists {
            resource_type: resource_type.to_string(),
            id: id.into(),
        }
    }

    /// Wraps an API error with the operation it happened in.
    pub fn api(action: &str, source: ArmError) -> Self {
        ResourceError::Api {
            context: action.to_string(),
            source,
        }
    }

    pub fn context(action: &str, error: impl std::fmt::Display) -> Self {
        ResourceError::Other(format!("{}: {}", action, error))
    }

    /// True when the remote object is gone, either reported by a resource or
    /// as a 404 from ARM.
    pub fn is_not_found(&self) -> bool {
        match self {
            ResourceError::NotFound(_) => true,
            ResourceError::Arm(e) | ResourceError::Api { source: e, .. } => e.is_not_found(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceTimeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl ResourceTimeouts {
    pub const fn minutes(create: u64, read: u64, update: u64, delete: u64) -> Self {
        Self {
            create: Duration::from_secs(create * 60),
            read: Duration::from_secs(read * 60),
            update: Duration::from_secs(update * 60),
            delete: Duration::from_secs(delete * 60),
        }
    }
}

impl Default for ResourceTimeouts {
    fn default() -> Self {
        Self::minutes(30, 5, 30, 30)
    }
}

/// One managed resource type, e.g. `azurerm_resource_group`.
///
/// `create` and `update` don't read back; the provider calls `read` after
/// them. `read` clears the ID with `data.set_id("")` when the resource is gone.
#[async_trait]
pub trait Resource: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    fn timeouts(&self) -> ResourceTimeouts {
        ResourceTimeouts::default()
    }

    fn validate_import_id(&self, id: &str) -> Result<(), ResourceIdError>;

    /// Adjusts a plan beyond what the schema expresses, e.g. forcing
    /// replacement for some transitions only.
    fn customize_diff(&self, _plan: &mut Plan) -> Result<(), ResourceError> {
        Ok(())
    }

    async fn create(&self, clients: &Clients, data: &mut ResourceData) -> Result<(), ResourceError>;

    async fn read(&self, clients: &Clients, data: &mut ResourceData) -> Result<(), ResourceError>;

    async fn update(&self, clients: &Clients, data: &mut ResourceData) -> Result<(), ResourceError>;

    async fn delete(&self, clients: &Clients, data: &mut ResourceData) -> Result<(), ResourceError>;

    /// Whether the resource with `id` exists remotely.
    async fn exists(&self, clients: &Clients, id: &str) -> Result<bool, ResourceError>;
}
