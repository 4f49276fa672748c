//! The provider lifecycle: validate, plan, apply, refresh, import and destroy
//! one resource instance at a time.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::arm::ArmClient;
use crate::auth::credential_from_config;
use crate::clients::Clients;
use crate::config::ProviderConfig;
use crate::error::AzurermError;
use crate::plan::{Action, Plan, plan};
use crate::resource::{Resource, ResourceError};
use crate::services;
use crate::state::{InstanceState, ResourceData};

#[derive(Debug, Clone)]
pub struct Provider {
    clients: Clients,
}

impl Provider {
    pub fn new(config: &ProviderConfig, arm: ArmClient) -> Self {
        Self {
            clients: Clients::new(config, arm),
        }
    }

    /// Validates `config`, picks a credential and builds the ARM client.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, AzurermError> {
        config.validate()?;
        let credential = credential_from_config(config)?;
        let arm = ArmClient::new(config.resource_manager_endpoint(), credential)?;
        info!(
            subscription_id = %config.subscription_id,
            endpoint = %arm.endpoint(),
            "Configured provider"
        );
        Ok(Self::new(config, arm))
    }

    pub fn clients(&self) -> &Clients {
        &self.clients
    }

    pub fn resource(&self, resource_type: &str) -> Result<Arc<dyn Resource>, ResourceError> {
        services::get_resource(resource_type)
    }

    /// Normalizes `config` against the resource's schema and validates it.
    pub fn validate(
        &self,
        resource_type: &str,
        config: &Map<String, Value>,
    ) -> Result<Map<String, Value>, ResourceError> {
        let resource = self.resource(resource_type)?;
        let schema = resource.schema();

        let mut normalized = config.clone();
        schema.normalize(&mut normalized);

        let errors = schema.validate_config(&normalized);
        if !errors.is_empty() {
            return Err(ResourceError::Validation(errors));
        }
        Ok(normalized)
    }

    pub fn plan(
        &self,
        resource_type: &str,
        prior: Option<&InstanceState>,
        config: &Map<String, Value>,
    ) -> Result<Plan, ResourceError> {
        let resource = self.resource(resource_type)?;
        let normalized = self.validate(resource_type, config)?;

        let mut planned = plan(&resource.schema(), prior, &normalized);
        resource.customize_diff(&mut planned)?;
        debug!(resource_type, action = %planned.action, changes = planned.changes.len(), "Planned");
        Ok(planned)
    }

    /// Carries out `plan`, returning the new state or `None` when the
    /// resource disappeared while being read back.
    pub async fn apply(
        &self,
        resource_type: &str,
        prior: Option<&InstanceState>,
        plan: &Plan,
    ) -> Result<Option<InstanceState>, ResourceError> {
        let resource = self.resource(resource_type)?;

        match plan.action {
            Action::NoOp => Ok(prior.cloned()),
            Action::Create => self.create(resource.as_ref(), plan).await.map(Some),
            Action::Update => {
                let timeouts = resource.timeouts();
                let mut data = ResourceData::new(plan.proposed.clone(), prior);
                info!(resource_type, id = %data.id(), "Updating");
                with_timeout(
                    "update",
                    resource_type,
                    timeouts.update,
                    resource.update(&self.clients, &mut data),
                )
                .await?;
                self.read_back(resource.as_ref(), data).await
            }
            Action::Replace => {
                if let Some(prior) = prior {
                    self.destroy(resource_type, prior).await?;
                }
                self.create(resource.as_ref(), plan).await.map(Some)
            }
        }
    }

    async fn create(&self, resource: &dyn Resource, plan: &Plan) -> Result<InstanceState, ResourceError> {
        let resource_type = resource.type_name();
        let mut data = ResourceData::new(plan.proposed.clone(), None);

        info!(resource_type, "Creating");
        with_timeout(
            "create",
            resource_type,
            resource.timeouts().create,
            resource.create(&self.clients, &mut data),
        )
        .await?;

        let id = data.id().to_string();
        self.read_back(resource, data).await?.ok_or_else(|| {
            ResourceError::Other(format!(
                "{} {:?} was not found after it was created",
                resource_type, id
            ))
        })
    }

    async fn read_back(
        &self,
        resource: &dyn Resource,
        mut data: ResourceData,
    ) -> Result<Option<InstanceState>, ResourceError> {
        with_timeout(
            "read",
            resource.type_name(),
            resource.timeouts().read,
            resource.read(&self.clients, &mut data),
        )
        .await?;
        Ok(data.into_state())
    }

    /// Reads the remote object; `None` when it no longer exists.
    pub async fn refresh(
        &self,
        resource_type: &str,
        state: &InstanceState,
    ) -> Result<Option<InstanceState>, ResourceError> {
        let resource = self.resource(resource_type)?;
        let refreshed = self
            .read_back(resource.as_ref(), ResourceData::from_state(state))
            .await?;
        if refreshed.is_none() {
            warn!(resource_type, id = %state.id(), "Resource no longer exists");
        }
        Ok(refreshed)
    }

    pub async fn import(&self, resource_type: &str, id: &str) -> Result<InstanceState, ResourceError> {
        let resource = self.resource(resource_type)?;
        resource.validate_import_id(id)?;

        info!(resource_type, id, "Importing");
        self.read_back(resource.as_ref(), ResourceData::for_import(id))
            .await?
            .ok_or_else(|| {
                ResourceError::Other(format!(
                    "Cannot import non-existent remote object: {} {:?}",
                    resource_type, id
                ))
            })
    }

    pub async fn destroy(&self, resource_type: &str, state: &InstanceState) -> Result<(), ResourceError> {
        let resource = self.resource(resource_type)?;
        let mut data = ResourceData::from_state(state);

        info!(resource_type, id = %state.id(), "Destroying");
        let result = with_timeout(
            "delete",
            resource_type,
            resource.timeouts().delete,
            resource.delete(&self.clients, &mut data),
        )
        .await;
        match result {
            Err(e) if e.is_not_found() => {
                info!(resource_type, id = %state.id(), "Already gone, nothing to destroy");
                Ok(())
            }
            other => other,
        }
    }

    pub async fn exists(&self, resource_type: &str, id: &str) -> Result<bool, ResourceError> {
        let resource = self.resource(resource_type)?;
        resource.exists(&self.clients, id).await
    }
}

async fn with_timeout<T>(
    operation: &'static str,
    resource_type: &str,
    after: Duration,
    future: impl Future<Output = Result<T, ResourceError>>,
) -> Result<T, ResourceError> {
    tokio::time::timeout(after, future)
        .await
        .map_err(|_| ResourceError::Timeout {
            operation,
            resource_type: resource_type.to_string(),
            after,
        })?
}
