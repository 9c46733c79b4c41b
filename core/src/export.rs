//! Export group accessor.
//!
//! Configure with the `with_*` setters, then call a terminal operation.
//! `create`, `search` and `create`'s duplicate fallback rebind the accessor
//! to the resolved export; `delete` takes its target explicitly and leaves
//! the binding alone.

use tracing::info;

use crate::client::Client;
use crate::error::{ApiError, Result};
use crate::task::{Task, TaskState};
use crate::types::{CreateExportRequest, Export, ExportType, ResourceId};

pub const CREATE_EXPORT_URI: &str = "block/exports.json";
pub const SEARCH_EXPORT_URI: &str = "block/exports/search.json?";

pub fn query_export_path(id: &str) -> String {
    format!("block/exports/{id}.json")
}

pub fn delete_export_path(id: &str) -> String {
    format!("block/exports/{id}/deactivate.json")
}

/// Builder-style accessor for export groups. Not meant to be shared across
/// threads; obtain one per call chain from `Client::export`.
#[derive(Debug, Clone)]
pub struct ExportAccessor {
    client: Client,
    id: String,
    initiators: Vec<String>,
    project: String,
    export_type: ExportType,
    array: String,
    volumes: Vec<ResourceId>,
}

impl ExportAccessor {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            id: String::new(),
            initiators: Vec::new(),
            project: String::new(),
            export_type: ExportType::Exclusive,
            array: String::new(),
            volumes: Vec::new(),
        }
    }

    /// Id the accessor is currently bound to; empty when unbound.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn with_id(&mut self, id: impl Into<String>) -> &mut Self {
        self.id = id.into();
        self
    }

    /// Append initiators to the export request.
    pub fn with_initiators<I, S>(&mut self, initiators: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.initiators.extend(initiators.into_iter().map(Into::into));
        self
    }

    /// Append volumes to the export request.
    pub fn with_volumes<I, S>(&mut self, volumes: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.volumes
            .extend(volumes.into_iter().map(|v| ResourceId { id: v.into() }));
        self
    }

    pub fn with_project(&mut self, project: impl Into<String>) -> &mut Self {
        self.project = project.into();
        self
    }

    /// Virtual array the export is created in.
    pub fn with_array(&mut self, array: impl Into<String>) -> &mut Self {
        self.array = array.into();
        self
    }

    pub fn with_type(&mut self, export_type: ExportType) -> &mut Self {
        self.export_type = export_type;
        self
    }

    pub fn create_request(&self, name: &str) -> CreateExportRequest {
        CreateExportRequest {
            initiators: self.initiators.clone(),
            name: name.to_string(),
            project: self.project.clone(),
            export_type: self.export_type,
            varray: self.array.clone(),
            volumes: self.volumes.clone(),
        }
    }

    /// Create an export named `name` and return it once its task is ready.
    ///
    /// If the controller reports that the export already exists, the
    /// existing export is looked up by name and returned instead.
    pub fn create(&mut self, name: &str) -> Result<Export> {
        let req = self.create_request(name);

        let task: Task = match self.client.post(CREATE_EXPORT_URI, Some(&req)) {
            Ok(task) => task,
            Err(err) if err.is_export_volume_dup() => {
                info!(export_name = name, "export already exists, resolving by name");
                return self.search(&format!("name={name}"));
            }
            Err(err) => return Err(err),
        };
        info!(export_name = name, task_id = %task.id, "export create submitted");

        let done = self
            .client
            .task()
            .await_done(&task.id, TaskState::Ready, self.client.config().task_timeout)?;

        let resource = done.resource.or(task.resource).ok_or_else(|| {
            ApiError::DeserializationError(format!("task {} carries no resource", task.id))
        })?;
        self.id = resource.id;

        self.query()
    }

    /// Fetch the export the accessor is bound to.
    pub fn query(&self) -> Result<Export> {
        self.client.get(&query_export_path(&self.id))
    }

    /// Bind to the first export matching `query` and fetch it. Hits are taken
    /// in the order the controller returns them.
    pub fn search(&mut self, query: &str) -> Result<Export> {
        let path = format!("{SEARCH_EXPORT_URI}{query}");
        let first = self
            .client
            .search(&path)?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::NoMatch {
                query: query.to_string(),
            })?;

        self.id = first.id;
        self.query()
    }

    /// Deactivate the export `id` and wait for the controller to finish.
    pub fn delete(&self, id: &str) -> Result<()> {
        let task: Task = self.client.post_empty(&delete_export_path(id))?;
        info!(export_id = id, task_id = %task.id, "export delete submitted");

        self.client
            .task()
            .await_done(&task.id, TaskState::Ready, self.client.config().task_timeout)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::config::ClientConfig;
    use crate::http::{HttpMethod, HttpResponse};
    use crate::testing::{json_response, ManualClock, ScriptedTransport};

    const NEW_ID: &str = "urn:storageos:ExportGroup:new:vdc1";
    const OLD_ID: &str = "urn:storageos:ExportGroup:old:vdc1";

    fn client(transport: &Arc<ScriptedTransport>, clock: &Arc<ManualClock>) -> Client {
        Client::new(
            ClientConfig::new("http://c").with_poll_interval(Duration::from_secs(5)),
            transport.clone(),
        )
        .with_clock(clock.clone())
    }

    fn task(state: &str, id: &str) -> HttpResponse {
        json_response(
            200,
            json!({"id": "task-1", "state": state, "resource": {"id": id, "name": "exp1"}}),
        )
    }

    fn export(id: &str) -> HttpResponse {
        json_response(
            200,
            json!({"id": id, "name": "exp1", "generated_name": "exp1", "type": "Exclusive",
                   "volumes": [{"id": "vol-1"}]}),
        )
    }

    fn dup_error() -> HttpResponse {
        json_response(
            400,
            json!({"code": 1054, "retryable": false, "description": "Export group exp1 already exists"}),
        )
    }

    #[test]
    fn create_posts_request_awaits_task_and_queries() {
        let transport = ScriptedTransport::with(vec![
            task("pending", NEW_ID),
            task("ready", NEW_ID),
            export(NEW_ID),
        ]);
        let clock = ManualClock::new();
        let mut accessor = client(&transport, &clock).export();

        let exp = accessor
            .with_project("proj1")
            .with_array("varray1")
            .with_volumes(["vol-1"])
            .create("exp1")
            .unwrap();

        assert_eq!(exp.id(), NEW_ID);
        assert_eq!(exp.generated_name, "exp1");
        assert_eq!(accessor.id(), NEW_ID);

        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].method, HttpMethod::Post);
        assert_eq!(requests[0].path, "http://c/block/exports.json");
        let body: serde_json::Value = serde_json::from_str(requests[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({"initiators": [], "name": "exp1", "project": "proj1", "type": "Exclusive",
                   "varray": "varray1", "volumes": [{"id": "vol-1"}]})
        );
        assert_eq!(requests[1].path, "http://c/vdc/tasks/task-1.json");
        assert_eq!(requests[2].path, format!("http://c/block/exports/{NEW_ID}.json"));
    }

    #[test]
    fn create_falls_back_to_search_on_duplicate() {
        let transport = ScriptedTransport::with(vec![
            dup_error(),
            json_response(200, json!({"resource": [{"id": OLD_ID, "match": "exp1"}]})),
            export(OLD_ID),
        ]);
        let clock = ManualClock::new();
        let mut accessor = client(&transport, &clock).export();

        let exp = accessor.create("exp1").unwrap();
        assert_eq!(exp.id(), OLD_ID);
        assert_eq!(accessor.id(), OLD_ID);
        assert_eq!(
            transport.paths()[1],
            "http://c/block/exports/search.json?name=exp1"
        );
    }

    #[test]
    fn create_propagates_other_submit_errors() {
        let transport = ScriptedTransport::with(vec![json_response(
            400,
            json!({"code": 1008, "description": "Parameter varray is invalid"}),
        )]);
        let clock = ManualClock::new();
        let err = client(&transport, &clock).export().create("exp1").unwrap_err();
        assert!(matches!(err, ApiError::Service(ref e) if e.code == 1008));
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn create_returns_task_timeout_without_fallback() {
        let mut responses = vec![task("pending", NEW_ID)];
        // 180 s at a 5 s interval: polls at 0, 5, .., 180.
        responses.extend((0..=36).map(|_| task("pending", NEW_ID)));
        let transport = ScriptedTransport::with(responses);
        let clock = ManualClock::new();
        let mut accessor = client(&transport, &clock).export();

        let err = accessor.create("exp1").unwrap_err();
        assert!(matches!(err, ApiError::TaskTimeout { waited, .. } if waited == Duration::from_secs(180)));
        assert_eq!(accessor.id(), "");
        assert_eq!(clock.total_slept(), Duration::from_secs(180));
    }

    #[test]
    fn create_returns_task_failure() {
        let transport = ScriptedTransport::with(vec![
            task("pending", NEW_ID),
            json_response(200, json!({"id": "task-1", "state": "error", "message": "no ports"})),
        ]);
        let clock = ManualClock::new();
        let err = client(&transport, &clock).export().create("exp1").unwrap_err();
        assert!(matches!(err, ApiError::TaskFailed { ref message, .. } if message == "no ports"));
    }

    #[test]
    fn search_binds_to_first_hit() {
        let transport = ScriptedTransport::with(vec![
            json_response(
                200,
                json!({"resource": [{"id": OLD_ID, "match": "exp1"}, {"id": NEW_ID, "match": "exp1"}]}),
            ),
            export(OLD_ID),
        ]);
        let clock = ManualClock::new();
        let mut accessor = client(&transport, &clock).export();

        let exp = accessor.search("name=exp1").unwrap();
        assert_eq!(exp.id(), OLD_ID);
        assert_eq!(accessor.id(), OLD_ID);
    }

    #[test]
    fn search_without_hits_is_no_match() {
        let transport = ScriptedTransport::with(vec![json_response(200, json!({"resource": []}))]);
        let clock = ManualClock::new();
        let mut accessor = client(&transport, &clock).export();
        accessor.with_id(OLD_ID);

        let err = accessor.search("name=missing").unwrap_err();
        assert!(matches!(err, ApiError::NoMatch { ref query } if query == "name=missing"));
        assert_eq!(accessor.id(), OLD_ID);
    }

    #[test]
    fn delete_targets_explicit_id_and_keeps_binding() {
        let transport = ScriptedTransport::with(vec![task("pending", OLD_ID), task("ready", OLD_ID)]);
        let clock = ManualClock::new();
        let mut accessor = client(&transport, &clock).export();
        accessor.with_id(NEW_ID);

        accessor.delete(OLD_ID).unwrap();
        let requests = transport.requests();
        assert_eq!(requests[0].method, HttpMethod::Post);
        assert_eq!(requests[0].path, format!("http://c/block/exports/{OLD_ID}/deactivate.json"));
        assert!(requests[0].body.is_none());
        assert_eq!(accessor.id(), NEW_ID);
    }

    #[test]
    fn delete_returns_task_timeout() {
        let mut responses = vec![task("pending", OLD_ID)];
        responses.extend((0..=36).map(|_| task("pending", OLD_ID)));
        let transport = ScriptedTransport::with(responses);
        let clock = ManualClock::new();
        let accessor = client(&transport, &clock).export();

        let err = accessor.delete(OLD_ID).unwrap_err();
        assert!(matches!(err, ApiError::TaskTimeout { waited, .. } if waited == Duration::from_secs(180)));
        assert!(err.is_task_error());
        assert_eq!(clock.total_slept(), Duration::from_secs(180));
        assert_eq!(transport.requests().len(), 38);
    }

    #[test]
    fn setters_append_and_overwrite() {
        let transport = ScriptedTransport::new();
        let clock = ManualClock::new();
        let mut accessor = client(&transport, &clock).export();
        accessor
            .with_initiators(["itr-1"])
            .with_initiators(vec!["itr-2".to_string()])
            .with_volumes(["vol-1", "vol-2"])
            .with_project("a")
            .with_project("b")
            .with_type(ExportType::Host);

        let req = accessor.create_request("exp1");
        assert_eq!(req.initiators, vec!["itr-1", "itr-2"]);
        assert_eq!(req.volumes.len(), 2);
        assert_eq!(req.project, "b");
        assert_eq!(req.export_type, ExportType::Host);
    }
}
