//! Client for the registry's device administration endpoints.
//!
//! Every call hits the registry; nothing is cached between operations.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use devman_shared::device::{Device, DeviceList, SetTagsBody};
use devman_shared::tags::{TagAction, TagSet};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{DeviceAdminError, Operation, Result, TransportError};

/// Outcome of a verified tag update.
#[derive(Debug, Clone, PartialEq)]
pub struct TagUpdate {
    pub device_id: String,
    pub action: TagAction,
    /// Full tag set written to the registry
    pub submitted: TagSet,
    /// Tags the verification read shows as actually added or removed
    pub changed: TagSet,
    /// Tags on the device after the update
    pub current: TagSet,
}

pub struct DeviceAdmin {
    client: Client,
    api_url: String,
    api_key: String,
    clock: Arc<dyn Clock>,
}

impl DeviceAdmin {
    pub fn new(config: &Config, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn list_devices(&self) -> Result<Vec<Device>> {
        let url = format!("{}/tailnet/-/devices", self.api_url);
        let res = self
            .send(Operation::ListDevices, None, self.client.get(&url))
            .await?;
        let list: DeviceList = decode(Operation::ListDevices, None, res).await?;
        debug!("Registry returned {} device(s)", list.devices.len());
        Ok(list.devices)
    }

    pub async fn get_device(&self, device_id: &str) -> Result<Device> {
        let url = format!("{}/device/{}", self.api_url, device_id);
        let res = self
            .send(Operation::GetDevice, Some(device_id), self.client.get(&url))
            .await?;
        decode(Operation::GetDevice, Some(device_id), res).await
    }

    pub async fn remove_device(&self, device_id: &str) -> Result<()> {
        let url = format!("{}/device/{}", self.api_url, device_id);
        self.send(
            Operation::RemoveDevice,
            Some(device_id),
            self.client.delete(&url),
        )
        .await?;
        info!("Removed device {}", device_id);
        Ok(())
    }

    /// Remove every device whose last contact is more than `days` days ago, in listing order.
    ///
    /// Stops at the first failed removal. Devices removed before the failure stay removed
    /// and the remaining ones are not attempted.
    pub async fn remove_older_than(&self, days: u32) -> Result<Vec<Device>> {
        self.remove_older_than_with(days, |_| {}).await
    }

    /// Like [`remove_older_than`](Self::remove_older_than), calling `on_removed` right after
    /// each successful removal so progress is visible even if a later one fails.
    pub async fn remove_older_than_with(
        &self,
        days: u32,
        mut on_removed: impl FnMut(&Device),
    ) -> Result<Vec<Device>> {
        let devices = self.list_devices().await?;
        let now = self.now();

        let mut removed = Vec::new();
        for device in devices.into_iter().filter(|d| d.is_stale(now, days)) {
            info!(
                "Removing device: {} (ID: {}, Last seen: {})",
                device.hostname, device.id, device.last_seen
            );
            self.remove_device(&device.id).await?;
            on_removed(&device);
            removed.push(device);
        }
        Ok(removed)
    }

    pub async fn list_tags(&self, device_id: &str) -> Result<Vec<String>> {
        Ok(self.get_device(device_id).await?.tags)
    }

    /// Replace the device's tag list with `tags`.
    pub async fn set_tags(&self, device_id: &str, tags: &TagSet) -> Result<()> {
        let url = format!("{}/device/{}/tags", self.api_url, device_id);
        let body = SetTagsBody { tags: tags.to_vec() };
        self.send(
            Operation::SetTags,
            Some(device_id),
            self.client.post(&url).json(&body),
        )
        .await?;
        Ok(())
    }

    /// Read the device, write the adjusted tag set, then read it back to see what changed.
    ///
    /// The registry offers no transaction: if the process dies after the write the change
    /// is applied but never verified. A failed verification read is reported as
    /// [`DeviceAdminError::Unverified`], since the write has already taken effect.
    pub async fn update_tags(
        &self,
        device_id: &str,
        requested: &TagSet,
        action: TagAction,
    ) -> Result<TagUpdate> {
        let device = self.get_device(device_id).await?;
        let before: TagSet = device.tags.iter().collect();

        let submitted = action
            .plan(&before, requested)
            .map_err(|rejection| DeviceAdminError::rejected(device_id, rejection))?;

        info!(
            "Setting tags on device {} ({}): {}",
            device_id, action, submitted
        );
        self.set_tags(device_id, &submitted).await?;

        let current: TagSet = self
            .get_device(device_id)
            .await
            .map_err(|e| DeviceAdminError::Unverified {
                device_id: device_id.to_string(),
                submitted: submitted.clone(),
                source: Box::new(e),
            })?
            .tags
            .iter()
            .collect();
        let changed = action.delta(&before, &current);
        if changed.is_empty() {
            debug!("Registry accepted the {} without changing device {}", action, device_id);
        }

        Ok(TagUpdate {
            device_id: device_id.to_string(),
            action,
            submitted,
            changed,
            current,
        })
    }

    /// Devices whose hostname contains `term`, ignoring case.
    pub async fn find_devices(&self, term: &str) -> Result<Vec<Device>> {
        let devices = self.list_devices().await?;
        Ok(devices
            .into_iter()
            .filter(|d| d.hostname_matches(term))
            .collect())
    }

    async fn send(
        &self,
        operation: Operation,
        device_id: Option<&str>,
        request: RequestBuilder,
    ) -> Result<Response> {
        debug!(%operation, ?device_id, "Calling registry");
        let res = request
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| TransportError::request(operation, device_id, e))?;

        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let body = res.text().await.unwrap_or_default();
        Err(TransportError::status(operation, device_id, status, body).into())
    }
}

async fn decode<T: DeserializeOwned>(
    operation: Operation,
    device_id: Option<&str>,
    res: Response,
) -> Result<T> {
    res.json::<T>()
        .await
        .map_err(|e| TransportError::request(operation, device_id, e).into())
}
