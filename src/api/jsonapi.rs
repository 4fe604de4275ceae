//! JSON:API 1.0 documents: request payload parsing and response building.

use std::collections::{BTreeMap, HashMap};

use serde_json::{json, Map, Value};

use crate::access::ResourceError;
use crate::config;
use crate::filter::{FilterData, FilterError};

pub const CONTENT_TYPE: &str = "application/vnd.api+json";

/// Prefix a route path with the configured base path
pub fn link(path: &str) -> String {
    format!("{}{}", config::config().api.base_path, path)
}

/// Decode a request body as JSON
pub fn parse_body(body: &[u8]) -> Result<Value, ResourceError> {
    if body.is_empty() {
        return Err(ResourceError::invalid_payload("", "Request body is empty"));
    }
    serde_json::from_slice(body).map_err(|e| ResourceError::invalid_payload("", format!("Malformed JSON: {}", e)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceIdentifier {
    pub kind: String,
    pub id: String,
}

impl ResourceIdentifier {
    pub fn new(kind: &str, id: i64) -> Self {
        Self { kind: kind.to_string(), id: id.to_string() }
    }

    fn from_value(value: &Value, pointer: &str) -> Result<Self, ResourceError> {
        let object = value
            .as_object()
            .ok_or_else(|| ResourceError::invalid_payload(pointer, "Resource identifier must be an object"))?;
        let kind = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ResourceError::invalid_payload(format!("{}/type", pointer), "Missing type"))?;
        let id = match object.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => return Err(ResourceError::invalid_payload(format!("{}/id", pointer), "Missing id")),
        };
        Ok(Self { kind: kind.to_string(), id })
    }

    /// Numeric id of an identifier that must be of `expected` type
    pub fn id_of(&self, expected: &str, pointer: &str) -> Result<i64, ResourceError> {
        if self.kind != expected {
            return Err(ResourceError::Conflict(format!(
                "Expected a {} identifier at {}, got {}",
                expected, pointer, self.kind
            )));
        }
        self.id
            .parse()
            .map_err(|_| ResourceError::invalid_payload(format!("{}/id", pointer), format!("Invalid id {:?}", self.id)))
    }

    pub fn to_value(&self) -> Value {
        json!({ "type": self.kind, "id": self.id })
    }
}

/// Resource linkage of a relationship
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Linkage {
    One(Option<ResourceIdentifier>),
    Many(Vec<ResourceIdentifier>),
}

impl Linkage {
    pub fn to_one(kind: &str, id: Option<i64>) -> Self {
        Linkage::One(id.map(|id| ResourceIdentifier::new(kind, id)))
    }

    pub fn to_many(kind: &str, ids: impl IntoIterator<Item = i64>) -> Self {
        Linkage::Many(ids.into_iter().map(|id| ResourceIdentifier::new(kind, id)).collect())
    }

    fn from_value(value: &Value, pointer: &str) -> Result<Self, ResourceError> {
        match value {
            Value::Null => Ok(Linkage::One(None)),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| ResourceIdentifier::from_value(item, &format!("{}/{}", pointer, i)))
                .collect::<Result<Vec<_>, _>>()
                .map(Linkage::Many),
            other => ResourceIdentifier::from_value(other, pointer).map(|id| Linkage::One(Some(id))),
        }
    }

    /// Parse the `{"data": ...}` body of a relationship request
    pub fn from_document(doc: &Value) -> Result<Self, ResourceError> {
        let data = doc
            .get("data")
            .ok_or_else(|| ResourceError::invalid_payload("/data", "Missing data member"))?;
        Self::from_value(data, "/data")
    }

    pub fn to_value(&self) -> Value {
        match self {
            Linkage::One(None) => Value::Null,
            Linkage::One(Some(id)) => id.to_value(),
            Linkage::Many(ids) => Value::Array(ids.iter().map(ResourceIdentifier::to_value).collect()),
        }
    }
}

/// The primary data of a create or update request
#[derive(Debug, Clone)]
pub struct ResourcePayload {
    pub kind: String,
    pub id: Option<String>,
    pub attributes: Map<String, Value>,
    pub relationships: BTreeMap<String, Linkage>,
}

impl ResourcePayload {
    pub fn from_document(doc: &Value, expected_type: &str) -> Result<Self, ResourceError> {
        let data = doc
            .get("data")
            .and_then(Value::as_object)
            .ok_or_else(|| ResourceError::invalid_payload("/data", "Missing primary data object"))?;

        let kind = data
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ResourceError::invalid_payload("/data/type", "Missing type"))?;
        if kind != expected_type {
            return Err(ResourceError::Conflict(format!(
                "Invalid type. Expected \"{}\", got \"{}\"",
                expected_type, kind
            )));
        }

        let id = match data.get("id") {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) => Some(id.clone()),
            Some(Value::Number(id)) => Some(id.to_string()),
            Some(_) => return Err(ResourceError::invalid_payload("/data/id", "id must be a string")),
        };

        let attributes = match data.get("attributes") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(attributes)) => attributes.clone(),
            Some(_) => return Err(ResourceError::invalid_payload("/data/attributes", "attributes must be an object")),
        };

        let mut relationships = BTreeMap::new();
        match data.get("relationships") {
            None | Some(Value::Null) => {}
            Some(Value::Object(entries)) => {
                for (name, entry) in entries {
                    let pointer = format!("/data/relationships/{}", name);
                    let linkage = entry
                        .get("data")
                        .ok_or_else(|| ResourceError::invalid_payload(pointer.clone(), "Missing data member"))?;
                    relationships.insert(name.clone(), Linkage::from_value(linkage, &format!("{}/data", pointer))?);
                }
            }
            Some(_) => {
                return Err(ResourceError::invalid_payload(
                    "/data/relationships",
                    "relationships must be an object",
                ))
            }
        }

        Ok(Self { kind: kind.to_string(), id, attributes, relationships })
    }

    /// Reject a body whose id disagrees with the addressed resource
    pub fn check_id(&self, expected: i64) -> Result<(), ResourceError> {
        match &self.id {
            Some(id) if *id != expected.to_string() => Err(ResourceError::Conflict(format!(
                "Value of id does not match the resource identifier in url: {} != {}",
                id, expected
            ))),
            _ => Ok(()),
        }
    }

    fn pointer(name: &str) -> String {
        format!("/data/attributes/{}", name)
    }

    /// A string attribute that must not be blank when sent
    pub fn text(&self, name: &str) -> Result<Option<String>, ResourceError> {
        match self.attributes.get(name) {
            None => Ok(None),
            Some(Value::String(text)) if !text.trim().is_empty() => Ok(Some(text.clone())),
            Some(Value::String(_)) => Err(ResourceError::invalid_payload(Self::pointer(name), "Must not be empty")),
            Some(_) => Err(ResourceError::invalid_payload(Self::pointer(name), "Not a valid string")),
        }
    }

    pub fn required_text(&self, name: &str) -> Result<String, ResourceError> {
        self.text(name)?
            .ok_or_else(|| ResourceError::invalid_payload(Self::pointer(name), "Missing data for required field"))
    }

    pub fn nullable_text(&self, name: &str) -> Result<Option<Option<String>>, ResourceError> {
        match self.attributes.get(name) {
            None => Ok(None),
            Some(Value::Null) => Ok(Some(None)),
            Some(Value::String(text)) => Ok(Some(Some(text.clone()))),
            Some(_) => Err(ResourceError::invalid_payload(Self::pointer(name), "Not a valid string")),
        }
    }

    pub fn nullable_float(&self, name: &str) -> Result<Option<Option<f64>>, ResourceError> {
        match self.attributes.get(name) {
            None => Ok(None),
            Some(Value::Null) => Ok(Some(None)),
            Some(value) => value
                .as_f64()
                .map(|n| Some(Some(n)))
                .ok_or_else(|| ResourceError::invalid_payload(Self::pointer(name), "Not a valid number")),
        }
    }

    pub fn nullable_int(&self, name: &str) -> Result<Option<Option<i32>>, ResourceError> {
        match self.attributes.get(name) {
            None => Ok(None),
            Some(Value::Null) => Ok(Some(None)),
            Some(value) => value
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .map(|n| Some(Some(n)))
                .ok_or_else(|| ResourceError::invalid_payload(Self::pointer(name), "Not a valid integer")),
        }
    }

    /// Id carried by a to-one relationship. Outer `None` when the
    /// relationship was not sent, inner `None` for explicit null.
    pub fn to_one(&self, name: &str, kind: &str) -> Result<Option<Option<i64>>, ResourceError> {
        let pointer = format!("/data/relationships/{}/data", name);
        match self.relationships.get(name) {
            None => Ok(None),
            Some(Linkage::One(None)) => Ok(Some(None)),
            Some(Linkage::One(Some(identifier))) => identifier.id_of(kind, &pointer).map(|id| Some(Some(id))),
            Some(Linkage::Many(_)) => Err(ResourceError::invalid_payload(pointer, "Expected a single identifier")),
        }
    }
}

/// Relationship member of a resource object
#[derive(Debug, Clone)]
pub struct RelationshipObject {
    pub name: &'static str,
    pub self_link: String,
    pub data: Option<Linkage>,
}

impl RelationshipObject {
    fn to_value(&self) -> Value {
        let mut value = json!({ "links": { "self": self.self_link } });
        if let Some(data) = &self.data {
            value["data"] = data.to_value();
        }
        value
    }
}

#[derive(Debug, Clone)]
pub struct ResourceObject {
    pub kind: &'static str,
    pub id: i64,
    pub attributes: Value,
    pub relationships: Vec<RelationshipObject>,
    pub self_link: String,
}

impl ResourceObject {
    pub fn to_value(&self) -> Value {
        let relationships: Map<String, Value> = self
            .relationships
            .iter()
            .map(|rel| (rel.name.to_string(), rel.to_value()))
            .collect();
        json!({
            "type": self.kind,
            "id": self.id.to_string(),
            "attributes": self.attributes,
            "relationships": relationships,
            "links": { "self": self.self_link },
        })
    }
}

pub fn resource_document(resource: &ResourceObject) -> Value {
    json!({
        "data": resource.to_value(),
        "links": { "self": resource.self_link },
    })
}

/// List document; `count` is the total before paging
pub fn collection_document(resources: &[ResourceObject], count: i64, self_link: &str) -> Value {
    json!({
        "data": resources.iter().map(ResourceObject::to_value).collect::<Vec<_>>(),
        "links": { "self": self_link },
        "meta": { "count": count },
    })
}

pub fn relationship_document(linkage: &Linkage, self_link: &str) -> Value {
    json!({ "data": linkage.to_value(), "links": { "self": self_link } })
}

/// Listing options from `filter`, `sort`, `page[size]` and `page[number]`
pub fn list_params(query: &HashMap<String, String>) -> Result<FilterData, FilterError> {
    let where_clause = match query.get("filter") {
        Some(raw) if !raw.trim().is_empty() => Some(serde_json::from_str::<Value>(raw)?),
        _ => None,
    };
    let order = query.get("sort").filter(|s| !s.trim().is_empty()).cloned();

    let size = match query.get("page[size]") {
        Some(raw) => raw
            .parse::<i32>()
            .map_err(|_| FilterError::InvalidLimit(format!("{:?} is not a number", raw)))?,
        None => config::config().api.default_page_size,
    };
    let number = match query.get("page[number]") {
        Some(raw) => raw
            .parse::<i32>()
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| FilterError::InvalidOffset(format!("{:?} is not a positive number", raw)))?,
        None => 1,
    };

    let (limit, offset) = page_window(size, number, config::config().api.max_page_size);
    Ok(FilterData { where_clause, order, limit: Some(limit), offset: Some(offset) })
}

/// Page size capped at `max_size`, and the offset of page `number` at that size
fn page_window(size: i32, number: i32, max_size: i32) -> (i32, i32) {
    let size = size.min(max_size);
    (size, (number - 1).saturating_mul(size.max(0)))
}
