//! Menu endpoints of the portal API.

use async_trait::async_trait;

use portal_auth::Role;
use portal_core::MenuId;
use portal_navigation::{MenuEntry, MenuSource, SourceError, decode_entries};

use crate::client::SharedClient;
use crate::error::ClientError;

/// Read access to the menu resource; doubles as the resolver's remote source.
#[derive(Debug, Clone)]
pub struct MenuApi {
    client: SharedClient,
    endpoint: String,
}

impl MenuApi {
    /// Uses the client's configured menu endpoint.
    pub fn new(client: SharedClient) -> Self {
        let endpoint = client.config().menu_endpoint.clone();
        Self::with_endpoint(client, endpoint)
    }

    pub fn with_endpoint(client: SharedClient, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Self { client, endpoint }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// `GET {endpoint}/role/{ROLE}`: the server-filtered tree for `role`.
    pub async fn get_menus_by_role(&self, role: Role) -> Result<Vec<MenuEntry>, ClientError> {
        self.get_entries(&format!("{}/role/{}", self.endpoint, role.as_str()))
            .await
    }

    /// `GET {endpoint}`: every menu, unfiltered.
    pub async fn get_all_menus(&self) -> Result<Vec<MenuEntry>, ClientError> {
        self.get_entries(&self.endpoint).await
    }

    /// `GET {endpoint}/{id}`, with `id` sent as a single escaped segment.
    pub async fn get_menu_by_id(&self, id: &MenuId) -> Result<MenuEntry, ClientError> {
        let url = self
            .client
            .config()
            .url_with_segment(&self.endpoint, id.as_str())?;
        let bytes = self.client.get_bytes_at(url).await?;
        serde_json::from_slice(&bytes).map_err(|e| ClientError::Parse(e.to_string()))
    }

    /// `GET {endpoint}/tree`. Empty on any failure except 401, which still
    /// propagates so callers see the forced logout.
    pub async fn get_menu_tree(&self) -> Result<Vec<MenuEntry>, ClientError> {
        match self.get_entries(&format!("{}/tree", self.endpoint)).await {
            Ok(entries) => Ok(entries),
            Err(ClientError::Unauthorized) => Err(ClientError::Unauthorized),
            Err(err) => {
                tracing::warn!("menu tree unavailable: {err}");
                Ok(Vec::new())
            }
        }
    }

    async fn get_entries(&self, path: &str) -> Result<Vec<MenuEntry>, ClientError> {
        let bytes = self.client.get_bytes(path).await?;
        decode_entries(&bytes).map_err(|e| ClientError::Parse(e.to_string()))
    }
}

#[async_trait]
impl MenuSource for MenuApi {
    async fn fetch_menus(&self, role: Role) -> Result<Vec<MenuEntry>, SourceError> {
        Ok(self.get_menus_by_role(role).await?)
    }
}
