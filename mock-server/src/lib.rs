//! In-memory emulation of the controller REST endpoints the SDK uses.
//!
//! Ids are `urn:storageos:...` strings. Resources are kept in insertion
//! order so search results are deterministic. Tasks advance one step per
//! poll according to `MockConfig`.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// Error code the controller uses for a duplicate export.
pub const ERR_CODE_EXPORT_VOLUME_DUP: i64 = 1054;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Named {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Export {
    pub id: String,
    pub name: String,
    pub inactive: bool,
    pub project: Named,
    pub varray: Named,
    pub volumes: Vec<Named>,
    pub initiators: Vec<Named>,
    pub hosts: Vec<Named>,
    pub clusters: Vec<Named>,
    #[serde(rename = "type")]
    pub export_type: String,
    pub generated_name: String,
    pub path_params: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub inactive: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub state: String,
    pub message: String,
    pub resource: Named,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceError {
    pub code: i64,
    pub retryable: bool,
    pub description: String,
    pub details: String,
}

#[derive(Deserialize)]
pub struct CreateExport {
    pub name: String,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub varray: String,
    #[serde(default, rename = "type")]
    pub export_type: Option<String>,
    #[serde(default)]
    pub initiators: Vec<String>,
    #[serde(default)]
    pub volumes: Vec<Named>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    #[serde(rename = "match")]
    pub matched: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchResults {
    pub resource: Vec<SearchHit>,
}

/// Controls how tasks progress.
#[derive(Clone, Debug, Default)]
pub struct MockConfig {
    /// Polls a task answers `pending` before settling. `u32::MAX` never settles.
    pub pending_polls: u32,
    /// Settle tasks in the `error` state instead of `ready`.
    pub fail_tasks: bool,
}

#[derive(Clone, Debug)]
struct TaskRecord {
    task: Task,
    polls_left: u32,
}

#[derive(Debug, Default)]
pub struct Store {
    pub config: MockConfig,
    pub exports: Vec<Export>,
    pub groups: Vec<Group>,
    tasks: HashMap<String, TaskRecord>,
}

impl Store {
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Add an active consistency group and return its id.
    pub fn insert_group(&mut self, name: &str) -> String {
        let id = urn("BlockConsistencyGroup");
        self.groups.push(Group {
            id: id.clone(),
            name: name.to_string(),
            inactive: false,
        });
        id
    }

    /// Add an export directly, bypassing the create task.
    pub fn insert_export(&mut self, name: &str) -> String {
        let id = urn("ExportGroup");
        self.exports.push(new_export(&id, name, "Exclusive"));
        id
    }

    fn start_task(&mut self, name: &str, resource: Named) -> Task {
        let task = Task {
            id: urn("Task"),
            name: name.to_string(),
            state: "pending".to_string(),
            message: String::new(),
            resource,
        };
        self.tasks.insert(
            task.id.clone(),
            TaskRecord {
                task: task.clone(),
                polls_left: self.config.pending_polls,
            },
        );
        task
    }

    fn active_export(&self, id: &str) -> Option<&Export> {
        self.exports.iter().find(|e| e.id == id && !e.inactive)
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn urn(kind: &str) -> String {
    format!("urn:storageos:{kind}:{}:vdc1", Uuid::new_v4())
}

fn new_export(id: &str, name: &str, export_type: &str) -> Export {
    Export {
        id: id.to_string(),
        name: name.to_string(),
        inactive: false,
        project: Named::default(),
        varray: Named::default(),
        volumes: Vec::new(),
        initiators: Vec::new(),
        hosts: Vec::new(),
        clusters: Vec::new(),
        export_type: export_type.to_string(),
        generated_name: name.to_string(),
        path_params: Vec::new(),
    }
}

pub fn app() -> Router {
    app_with_state(Db::default())
}

pub fn app_with_state(db: Db) -> Router {
    Router::new()
        .route("/block/exports.json", post(create_export))
        .route("/block/exports/search.json", get(search_exports))
        .route("/block/exports/{id}", get(get_export))
        .route("/block/exports/{id}/deactivate.json", post(deactivate_export))
        .route("/block/consistency-groups/search.json", get(search_groups))
        .route("/block/consistency-groups/{id}", get(get_group))
        .route("/vdc/tasks/{id}", get(get_task))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, Db::default()).await
}

pub async fn run_with_state(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(db)).await
}

/// `{id}.json` path segment to bare id.
fn strip_json(segment: &str) -> Result<&str, StatusCode> {
    segment.strip_suffix(".json").ok_or(StatusCode::NOT_FOUND)
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ServiceError>)>;

fn not_found(id: &str) -> (StatusCode, Json<ServiceError>) {
    (
        StatusCode::NOT_FOUND,
        Json(ServiceError {
            code: 2000,
            retryable: false,
            description: "Unable to find entity specified in URL".to_string(),
            details: format!("Resource {id} not found"),
        }),
    )
}

async fn create_export(State(db): State<Db>, Json(input): Json<CreateExport>) -> ApiResult<Task> {
    let mut store = db.write().await;
    if store.exports.iter().any(|e| e.name == input.name && !e.inactive) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ServiceError {
                code: ERR_CODE_EXPORT_VOLUME_DUP,
                retryable: false,
                description: "Export group already exists".to_string(),
                details: format!("An export group named {} already exists", input.name),
            }),
        ));
    }

    let id = urn("ExportGroup");
    let export_type = input.export_type.as_deref().unwrap_or("Exclusive");
    let mut export = new_export(&id, &input.name, export_type);
    export.project = Named {
        id: input.project,
        name: String::new(),
    };
    export.varray = Named {
        id: input.varray,
        name: String::new(),
    };
    export.volumes = input.volumes;
    export.initiators = input
        .initiators
        .into_iter()
        .map(|i| Named {
            id: i.clone(),
            name: i,
        })
        .collect();
    store.exports.push(export);

    let task = store.start_task(
        "CREATE EXPORT GROUP",
        Named {
            id,
            name: input.name,
        },
    );
    Ok(Json(task))
}

async fn get_export(State(db): State<Db>, Path(segment): Path<String>) -> ApiResult<Export> {
    let id = strip_json(&segment).map_err(|_| not_found(&segment))?;
    let store = db.read().await;
    store.active_export(id).cloned().map(Json).ok_or_else(|| not_found(id))
}

async fn search_exports(
    State(db): State<Db>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<SearchResults> {
    let store = db.read().await;
    let name = params.get("name");
    let resource = store
        .exports
        .iter()
        .filter(|e| !e.inactive && name.map_or(true, |n| &e.name == n))
        .map(|e| SearchHit {
            id: e.id.clone(),
            matched: e.name.clone(),
        })
        .collect();
    Json(SearchResults { resource })
}

async fn deactivate_export(State(db): State<Db>, Path(id): Path<String>) -> ApiResult<Task> {
    let mut store = db.write().await;
    let export = store
        .exports
        .iter_mut()
        .find(|e| e.id == id && !e.inactive)
        .ok_or_else(|| not_found(&id))?;
    export.inactive = true;
    let resource = Named {
        id: export.id.clone(),
        name: export.name.clone(),
    };
    Ok(Json(store.start_task("DELETE EXPORT GROUP", resource)))
}

async fn get_group(State(db): State<Db>, Path(segment): Path<String>) -> ApiResult<Group> {
    let id = strip_json(&segment).map_err(|_| not_found(&segment))?;
    let store = db.read().await;
    store
        .groups
        .iter()
        .find(|g| g.id == id && !g.inactive)
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found(id))
}

async fn search_groups(
    State(db): State<Db>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<SearchResults> {
    let store = db.read().await;
    let name = params.get("name");
    let resource = store
        .groups
        .iter()
        .filter(|g| !g.inactive && name.map_or(true, |n| &g.name == n))
        .map(|g| SearchHit {
            id: g.id.clone(),
            matched: g.name.clone(),
        })
        .collect();
    Json(SearchResults { resource })
}

async fn get_task(State(db): State<Db>, Path(segment): Path<String>) -> ApiResult<Task> {
    let id = strip_json(&segment).map_err(|_| not_found(&segment))?;
    let mut store = db.write().await;
    let fail = store.config.fail_tasks;
    let record = store.tasks.get_mut(id).ok_or_else(|| not_found(id))?;

    if record.task.state == "pending" {
        if record.polls_left == 0 {
            if fail {
                record.task.state = "error".to_string();
                record.task.message = "Operation failed on the storage system".to_string();
            } else {
                record.task.state = "ready".to_string();
                record.task.message = "Operation completed successfully".to_string();
            }
        } else if record.polls_left != u32::MAX {
            record.polls_left -= 1;
        }
    }
    Ok(Json(record.task.clone()))
}
