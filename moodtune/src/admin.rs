//! Generic CRUD over backend resources
//!
//! Each REST resource is described once by a zero-sized type implementing
//! [`Resource`]; [`ResourceClient`] provides list/get/create/patch/delete for
//! any descriptor. Delete is only available for [`Deletable`] resources.

use crate::error::{ServiceError, ServiceResult};
use crate::services::api_client::ApiClient;
use crate::services::http::{read_json, read_json_or_default, segment};
use moodtune_common::models::{
    AuditLog, AuditLogCreate, AuditLogUpdate, DeleteAck, Inference, InferenceCreate,
    InferenceUpdate, MoodMapRule, MoodMapRuleCreate, MoodMapRuleUpdate, OAuthToken,
    OAuthTokenUpdate, OAuthTokenUpsert, Paginated, Playlist, PlaylistCreate, PlaylistUpdate,
    Session, SessionCreate, SessionUpdate, UpdateAck, User, UserCreate, UserUpdate,
};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;

pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// REST resource descriptor
pub trait Resource {
    /// Collection path, e.g. `/users`
    const PATH: &'static str;
    /// Human label for messages
    const LABEL: &'static str;
    /// Query filters accepted by the list endpoint
    const FILTERS: &'static [&'static str] = &[];

    type Item: DeserializeOwned + Serialize + Send;
    type Create: DeserializeOwned + Serialize + Send + Sync;
    type Update: DeserializeOwned + Serialize + Send + Sync;
}

/// Resources whose records can be deleted
pub trait Deletable: Resource {}

macro_rules! resource {
    ($name:ident, $path:literal, $label:literal, [$($filter:literal),*], $item:ty, $create:ty, $update:ty) => {
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl Resource for $name {
            const PATH: &'static str = $path;
            const LABEL: &'static str = $label;
            const FILTERS: &'static [&'static str] = &[$($filter),*];

            type Item = $item;
            type Create = $create;
            type Update = $update;
        }
    };
}

resource!(Users, "/users", "user", [], User, UserCreate, UserUpdate);
resource!(Sessions, "/sessions", "session", [], Session, SessionCreate, SessionUpdate);
resource!(
    Inferences,
    "/inferences",
    "inference",
    ["session_id"],
    Inference,
    InferenceCreate,
    InferenceUpdate
);
resource!(
    Playlists,
    "/playlists",
    "playlist",
    ["user_id"],
    Playlist,
    PlaylistCreate,
    PlaylistUpdate
);
resource!(
    MoodMapRules,
    "/mood-map-rules",
    "mood map rule",
    ["emotion", "intention"],
    MoodMapRule,
    MoodMapRuleCreate,
    MoodMapRuleUpdate
);
resource!(
    AuditLogs,
    "/audit-logs",
    "audit log",
    [],
    AuditLog,
    AuditLogCreate,
    AuditLogUpdate
);
resource!(
    OAuthTokens,
    "/oauth-tokens",
    "OAuth token",
    ["user_id", "provider"],
    OAuthToken,
    OAuthTokenUpsert,
    OAuthTokenUpdate
);

impl Deletable for Users {}
impl Deletable for Sessions {}
impl Deletable for Inferences {}
impl Deletable for Playlists {}
impl Deletable for MoodMapRules {}
impl Deletable for OAuthTokens {}

/// Pagination and filters for list calls
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub filters: Vec<(String, String)>,
}

impl ListQuery {
    pub fn page(limit: u32, offset: u32) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
            filters: Vec::new(),
        }
    }

    /// Add a filter; empty values are dropped like unset form fields
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.trim().is_empty() {
            self.filters.push((key.into(), value));
        }
        self
    }

    /// Query pairs with defaults applied (limit 20, offset 0)
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            (
                "limit".to_string(),
                self.limit.unwrap_or(DEFAULT_PAGE_LIMIT).to_string(),
            ),
            ("offset".to_string(), self.offset.unwrap_or(0).to_string()),
        ];
        pairs.extend(self.filters.iter().cloned());
        pairs
    }

    /// Reject filters the resource does not understand
    pub fn check_filters<R: Resource>(&self) -> ServiceResult<()> {
        for (key, _) in &self.filters {
            if !R::FILTERS.contains(&key.as_str()) {
                return Err(ServiceError::InvalidInput(format!(
                    "unsupported filter '{}' for {} list",
                    key,
                    R::LABEL
                )));
            }
        }
        Ok(())
    }
}

/// CRUD accessor for one resource
pub struct ResourceClient<'a, R> {
    api: &'a ApiClient,
    _resource: PhantomData<R>,
}

impl ApiClient {
    pub fn resource<R: Resource>(&self) -> ResourceClient<'_, R> {
        ResourceClient {
            api: self,
            _resource: PhantomData,
        }
    }
}

impl<'a, R: Resource> ResourceClient<'a, R> {
    fn item_path(id: &str) -> String {
        format!("{}/{}", R::PATH, segment(id))
    }

    pub async fn list(&self, query: &ListQuery) -> ServiceResult<Paginated<R::Item>> {
        query.check_filters::<R>()?;
        let response = self
            .api
            .request(Method::GET, R::PATH)
            .query(&query.to_pairs())
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn get(&self, id: &str) -> ServiceResult<R::Item> {
        let response = self
            .api
            .request(Method::GET, &Self::item_path(id))
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn create(&self, body: &R::Create) -> ServiceResult<R::Item> {
        let response = self
            .api
            .request(Method::POST, R::PATH)
            .json(body)
            .send()
            .await?;
        read_json(response).await
    }

    pub async fn patch(&self, id: &str, body: &R::Update) -> ServiceResult<UpdateAck> {
        let response = self
            .api
            .request(Method::PATCH, &Self::item_path(id))
            .json(body)
            .send()
            .await?;
        read_json_or_default(response).await
    }
}

impl<'a, R: Deletable> ResourceClient<'a, R> {
    pub async fn delete(&self, id: &str) -> ServiceResult<DeleteAck> {
        let response = self
            .api
            .request(Method::DELETE, &Self::item_path(id))
            .send()
            .await?;
        read_json_or_default(response).await
    }
}

/// Resource selector for the admin command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ResourceKind {
    Users,
    Sessions,
    Inferences,
    Playlists,
    MoodMapRules,
    AuditLogs,
    OauthTokens,
}

/// One admin operation with untyped JSON input
#[derive(Debug, Clone)]
pub enum AdminAction {
    List(ListQuery),
    Get(String),
    Create(Value),
    Patch(String, Value),
    Delete(String),
}

fn decode_body<T: DeserializeOwned>(label: &str, body: Value) -> ServiceResult<T> {
    serde_json::from_value(body)
        .map_err(|e| ServiceError::Parse(format!("invalid {} body: {}", label, e)))
}

fn to_value<T: Serialize>(value: &T) -> ServiceResult<Value> {
    serde_json::to_value(value).map_err(|e| ServiceError::Parse(e.to_string()))
}

async fn run_action<R: Resource>(
    client: ResourceClient<'_, R>,
    action: AdminAction,
) -> ServiceResult<Value> {
    match action {
        AdminAction::List(query) => to_value(&client.list(&query).await?),
        AdminAction::Get(id) => to_value(&client.get(&id).await?),
        AdminAction::Create(body) => {
            let body: R::Create = decode_body(R::LABEL, body)?;
            to_value(&client.create(&body).await?)
        }
        AdminAction::Patch(id, body) => {
            let body: R::Update = decode_body(R::LABEL, body)?;
            to_value(&client.patch(&id, &body).await?)
        }
        AdminAction::Delete(_) => Err(ServiceError::InvalidInput(format!(
            "{} records cannot be deleted",
            R::LABEL
        ))),
    }
}

async fn run_deletable<R: Deletable>(
    client: ResourceClient<'_, R>,
    action: AdminAction,
) -> ServiceResult<Value> {
    match action {
        AdminAction::Delete(id) => to_value(&client.delete(&id).await?),
        other => run_action(client, other).await,
    }
}

/// Run an admin action, typing the JSON body against the resource schema
pub async fn dispatch(
    api: &ApiClient,
    kind: ResourceKind,
    action: AdminAction,
) -> ServiceResult<Value> {
    match kind {
        ResourceKind::Users => run_deletable(api.resource::<Users>(), action).await,
        ResourceKind::Sessions => run_deletable(api.resource::<Sessions>(), action).await,
        ResourceKind::Inferences => run_deletable(api.resource::<Inferences>(), action).await,
        ResourceKind::Playlists => run_deletable(api.resource::<Playlists>(), action).await,
        ResourceKind::MoodMapRules => run_deletable(api.resource::<MoodMapRules>(), action).await,
        // Audit logs are append-only
        ResourceKind::AuditLogs => run_action(api.resource::<AuditLogs>(), action).await,
        ResourceKind::OauthTokens => run_deletable(api.resource::<OAuthTokens>(), action).await,
    }
}
