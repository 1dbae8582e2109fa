//! Campus-sharded MongoDB topology: one config replica set plus one shard
//! replica set per campus.

use mongodb::{
    bson::{self, doc},
    error::ErrorKind,
    options::ClientOptions,
    Client,
};
use serde::Serialize;

use crate::errors::AppResult;

/// `AlreadyInitialized` server error code.
const ALREADY_INITIALIZED: i32 = 23;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplicaSetMember {
    #[serde(rename = "_id")]
    pub id: i32,
    pub host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(rename = "arbiterOnly", skip_serializing_if = "std::ops::Not::not")]
    pub arbiter_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplicaSet {
    #[serde(rename = "_id")]
    pub name: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub configsvr: bool,
    pub members: Vec<ReplicaSetMember>,
}

impl ReplicaSet {
    fn config_servers() -> Self {
        Self {
            name: "configReplSet".to_string(),
            configsvr: true,
            members: (1..=3)
                .map(|n| ReplicaSetMember {
                    id: n - 1,
                    host: format!("config-server-{}:27017", n),
                    priority: None,
                    arbiter_only: false,
                })
                .collect(),
        }
    }

    /// Primary (priority 2), secondary (priority 1) and an arbiter.
    fn shard(name: &str, shard: u8) -> Self {
        Self {
            name: name.to_string(),
            configsvr: false,
            members: vec![
                ReplicaSetMember {
                    id: 0,
                    host: format!("shard{}-primary:27017", shard),
                    priority: Some(2),
                    arbiter_only: false,
                },
                ReplicaSetMember {
                    id: 1,
                    host: format!("shard{}-secondary:27017", shard),
                    priority: Some(1),
                    arbiter_only: false,
                },
                ReplicaSetMember {
                    id: 2,
                    host: format!("shard{}-arbiter:27017", shard),
                    priority: None,
                    arbiter_only: true,
                },
            ],
        }
    }

    /// The member `replSetInitiate` is sent to.
    pub fn seed_host(&self) -> Option<&str> {
        self.members.first().map(|m| m.host.as_str())
    }
}

pub fn topology() -> Vec<ReplicaSet> {
    vec![
        ReplicaSet::config_servers(),
        ReplicaSet::shard("rs-hanoi", 1),
        ReplicaSet::shard("rs-danang", 2),
        ReplicaSet::shard("rs-hcm", 3),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitiateOutcome {
    Initiated,
    AlreadyInitialized,
}

/// Sends `replSetInitiate` to the set's first member over a direct connection.
pub async fn initiate(set: &ReplicaSet) -> AppResult<InitiateOutcome> {
    let host = set.seed_host().unwrap_or("localhost:27017");
    let options =
        ClientOptions::parse(format!("mongodb://{}/?directConnection=true", host)).await?;
    let client = Client::with_options(options)?;

    let config = bson::to_document(set)?;
    let result = client
        .database("admin")
        .run_command(doc! { "replSetInitiate": config })
        .await;

    match result {
        Ok(_) => {
            log::info!("Initiated replica set {} via {}", set.name, host);
            Ok(InitiateOutcome::Initiated)
        }
        Err(err) if is_already_initialized(&err) => {
            log::info!("Replica set {} is already initialized", set.name);
            Ok(InitiateOutcome::AlreadyInitialized)
        }
        Err(err) => Err(err.into()),
    }
}

fn is_already_initialized(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Command(cmd) => {
            cmd.code == ALREADY_INITIALIZED || cmd.message.contains("already initialized")
        }
        _ => false,
    }
}
