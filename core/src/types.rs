//! Wire DTOs for the controller REST API.
//!
//! # Design
//! Every field the controller may omit carries `#[serde(default)]`, so a
//! sparse representation still decodes. Types the client sends are kept
//! separate from the representations it receives.

use serde::{Deserialize, Serialize};

/// Opaque identifier of a remote resource, as `{"id": "..."}` on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceId {
    pub id: String,
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self { id: id.to_string() }
    }
}

impl From<String> for ResourceId {
    fn from(id: String) -> Self {
        Self { id }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub rel: String,
    #[serde(default)]
    pub href: String,
}

/// A reference to a related resource, without ownership of it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedResource {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
}

/// Identity and metadata fields shared by every controller resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseObject {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
    #[serde(default)]
    pub inactive: bool,
    #[serde(default)]
    pub global: bool,
    #[serde(default)]
    pub remote: bool,
    #[serde(default)]
    pub internal: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vdc: Option<NamedResource>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub creation_time: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Initiator {
    #[serde(flatten)]
    pub base: BaseObject,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub initiator_node: String,
    #[serde(default)]
    pub initiator_port: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<NamedResource>,
}

/// Access scope of an export group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportType {
    Initiator,
    Host,
    Cluster,
    #[default]
    Exclusive,
}

/// An export group: a set of volumes made visible to a set of initiators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Export {
    #[serde(flatten)]
    pub base: BaseObject,
    #[serde(default)]
    pub volumes: Vec<ResourceId>,
    #[serde(default)]
    pub initiators: Vec<Initiator>,
    #[serde(default)]
    pub hosts: Vec<NamedResource>,
    #[serde(default)]
    pub clusters: Vec<NamedResource>,
    #[serde(default, rename = "type")]
    pub export_type: String,
    #[serde(default)]
    pub generated_name: String,
    #[serde(default)]
    pub path_params: Vec<String>,
}

impl Export {
    pub fn id(&self) -> &str {
        &self.base.id
    }
}

/// A consistency group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    #[serde(flatten)]
    pub base: BaseObject,
}

impl Group {
    pub fn id(&self) -> &str {
        &self.base.id
    }
}

/// Request payload for `POST block/exports.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateExportRequest {
    pub initiators: Vec<String>,
    pub name: String,
    pub project: String,
    #[serde(rename = "type")]
    pub export_type: ExportType,
    pub varray: String,
    pub volumes: Vec<ResourceId>,
}

/// One hit of a `search.json` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResource {
    pub id: String,
    #[serde(default, rename = "match")]
    pub matched: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub resource: Vec<SearchResource>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_decodes_flattened_base_fields() {
        let json = r#"{
            "id": "urn:storageos:ExportGroup:1:vdc1",
            "name": "exp1",
            "inactive": false,
            "volumes": [{"id": "vol-1", "lun": 3}],
            "initiators": [{"id": "itr-1", "initiator_port": "50:00"}],
            "hosts": [{"id": "host-1", "name": "h1"}],
            "type": "Exclusive",
            "generated_name": "exp1"
        }"#;
        let export: Export = serde_json::from_str(json).unwrap();
        assert_eq!(export.id(), "urn:storageos:ExportGroup:1:vdc1");
        assert_eq!(export.base.name, "exp1");
        assert_eq!(export.volumes, vec![ResourceId::from("vol-1")]);
        assert_eq!(export.initiators[0].initiator_port, "50:00");
        assert_eq!(export.hosts[0].name, "h1");
        assert!(export.clusters.is_empty());
        assert_eq!(export.export_type, "Exclusive");
    }

    #[test]
    fn create_request_uses_wire_field_names() {
        let req = CreateExportRequest {
            initiators: vec![],
            name: "exp1".to_string(),
            project: "proj1".to_string(),
            export_type: ExportType::default(),
            varray: "varray1".to_string(),
            volumes: vec!["vol-1".into()],
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["type"], "Exclusive");
        assert_eq!(json["varray"], "varray1");
        assert_eq!(json["volumes"][0]["id"], "vol-1");
        assert!(json["initiators"].as_array().unwrap().is_empty());
    }

    #[test]
    fn search_results_tolerate_missing_resource_array() {
        let results: SearchResults = serde_json::from_str("{}").unwrap();
        assert!(results.resource.is_empty());

        let results: SearchResults =
            serde_json::from_str(r#"{"resource":[{"id":"a","match":"exp1"}]}"#).unwrap();
        assert_eq!(results.resource[0].matched, "exp1");
    }
}
