//! OpenAPI 3 contract derived from the action registry.

use std::collections::BTreeMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use http::Method;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::definition::{ActionDefinition, Parameter};
use crate::docs::AppDocumentation;
use crate::error::DocumentationError;
use crate::path::openapi_path;
use crate::registry::RegistryEntry;

pub const OPENAPI_VERSION: &str = "3.0.3";

pub type PathItem = BTreeMap<String, Value>;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OpenApi {
    pub openapi: &'static str,
    pub info: OpenApiInfo,
    pub paths: BTreeMap<String, PathItem>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OpenApiInfo {
    pub title: String,
    pub version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl OpenApi {
    /// Operation for `verb` under the (brace-style) `path` key.
    pub fn operation(&self, path: &str, verb: &Method) -> Option<&Value> {
        self.paths
            .get(path)
            .and_then(|item| item.get(&verb.as_str().to_lowercase()))
    }

    pub fn to_json(&self) -> Result<String, DocumentationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_yaml(&self) -> Result<String, DocumentationError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Stable, URL-safe operation id.
pub fn operation_id(verb: &Method, mountpoint: &str, path: &str) -> String {
    URL_SAFE_NO_PAD.encode(format!("{}{}{}", verb.as_str(), mountpoint, path))
}

fn has_request_body(verb: &Method) -> bool {
    !matches!(
        *verb,
        Method::GET | Method::HEAD | Method::DELETE | Method::OPTIONS
    )
}

/// JSON Schema `{type, example}` tree for an example value.
pub fn schema_for_example(example: &Value) -> Value {
    match example {
        Value::Object(map) => {
            let properties: Map<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), schema_for_example(v)))
                .collect();
            json!({ "type": "object", "properties": properties })
        }
        Value::Array(items) => match items.first() {
            Some(first) => json!({ "type": "array", "items": schema_for_example(first) }),
            None => json!({ "type": "array", "items": {} }),
        },
        Value::String(_) => json!({ "type": "string", "example": example }),
        Value::Number(n) if n.is_i64() || n.is_u64() => json!({ "type": "integer", "example": example }),
        Value::Number(_) => json!({ "type": "number", "example": example }),
        Value::Bool(_) => json!({ "type": "boolean", "example": example }),
        Value::Null => json!({ "nullable": true }),
    }
}

fn parameter_schema(param: &Parameter) -> Value {
    json!({
        "type": param.matcher.json_schema_type(),
        "example": param.matcher.schema_example(),
    })
}

fn path_parameter(name: &str, description: &str, schema: Value) -> Value {
    let mut param = Map::new();
    param.insert("name".to_string(), Value::String(name.to_string()));
    param.insert("in".to_string(), Value::String("path".to_string()));
    param.insert("required".to_string(), Value::Bool(true));
    if !description.is_empty() {
        param.insert("description".to_string(), Value::String(description.to_string()));
    }
    param.insert("schema".to_string(), schema);
    Value::Object(param)
}

fn query_parameter(param: &Parameter) -> Value {
    let mut out = Map::new();
    out.insert("name".to_string(), Value::String(param.name.clone()));
    out.insert("in".to_string(), Value::String("query".to_string()));
    out.insert("required".to_string(), Value::Bool(param.required));
    if !param.description.is_empty() {
        out.insert("description".to_string(), Value::String(param.description.clone()));
    }
    out.insert("schema".to_string(), parameter_schema(param));
    Value::Object(out)
}

fn request_body(parameters: &[Parameter]) -> Value {
    let properties: Map<String, Value> = parameters
        .iter()
        .map(|param| {
            let mut schema = parameter_schema(param);
            if let Some(obj) = schema.as_object_mut().filter(|_| !param.description.is_empty()) {
                obj.insert("description".to_string(), Value::String(param.description.clone()));
            }
            (param.name.clone(), schema)
        })
        .collect();

    let mut schema = Map::new();
    schema.insert("type".to_string(), Value::String("object".to_string()));
    schema.insert("properties".to_string(), Value::Object(properties));

    let required: Vec<Value> = parameters
        .iter()
        .filter(|p| p.required)
        .map(|p| Value::String(p.name.clone()))
        .collect();
    if !required.is_empty() {
        schema.insert("required".to_string(), Value::Array(required));
    }

    json!({
        "required": parameters.iter().any(|p| p.required),
        "content": { "application/json": { "schema": schema } }
    })
}

fn responses(definition: &ActionDefinition) -> Value {
    let mut responses = Map::new();
    for response in &definition.responses {
        let mut response_obj = Map::new();
        response_obj.insert(
            "description".to_string(),
            Value::String(response.description.clone()),
        );
        if let Some(example) = &response.example {
            response_obj.insert(
                "content".to_string(),
                json!({ "application/json": { "schema": schema_for_example(example) } }),
            );
        }
        responses.insert(response.status.to_string(), Value::Object(response_obj));
    }

    if responses.is_empty() {
        responses.insert(
            "200".to_string(),
            json!({ "description": "No response defined" }),
        );
    }
    Value::Object(responses)
}

fn operation(definition: &ActionDefinition, mountpoint: &str) -> Value {
    let mut operation = Map::new();

    if definition.has_description() {
        operation.insert(
            "summary".to_string(),
            Value::String(definition.description.clone()),
        );
        operation.insert(
            "description".to_string(),
            Value::String(definition.description.clone()),
        );
    }
    operation.insert(
        "operationId".to_string(),
        Value::String(operation_id(&definition.verb, mountpoint, &definition.path)),
    );

    let mut parameters: Vec<Value> = Vec::new();
    for name in definition.placeholders() {
        match definition.route_parameters.iter().find(|p| p.name == name) {
            Some(route) => parameters.push(path_parameter(
                &route.name,
                &route.description,
                parameter_schema(route),
            )),
            None => parameters.push(path_parameter(
                &name,
                "",
                json!({ "type": "string", "example": "string" }),
            )),
        }
    }

    let body_verb = has_request_body(&definition.verb);
    if definition.has_parameters() {
        if body_verb {
            operation.insert("requestBody".to_string(), request_body(&definition.parameters));
        } else {
            parameters.extend(definition.parameters.iter().map(query_parameter));
        }
    }

    if !parameters.is_empty() {
        operation.insert("parameters".to_string(), Value::Array(parameters));
    }

    operation.insert("responses".to_string(), responses(definition));
    Value::Object(operation)
}

/// Mounted, brace-style path. A root action under a mountpoint is keyed by
/// the mountpoint itself, without a trailing slash.
fn path_key(mountpoint: &str, path: &str) -> String {
    let path = openapi_path(path);
    if path == "/" && !mountpoint.is_empty() {
        mountpoint.to_string()
    } else {
        format!("{mountpoint}{path}")
    }
}

/// Build the contract for everything in `docs`.
pub fn build(docs: &AppDocumentation<'_>, version: &str) -> OpenApi {
    let mut paths: BTreeMap<String, PathItem> = BTreeMap::new();

    for entry in docs.entries() {
        let RegistryEntry::Action(definition) = entry else {
            continue;
        };
        let key = path_key(docs.mountpoint(), &definition.path);
        let verb = definition.verb.as_str().to_lowercase();

        // Same path and verb: the later declaration wins, as it does at dispatch.
        paths
            .entry(key)
            .or_default()
            .insert(verb, operation(definition, docs.mountpoint()));
    }

    let description = std::iter::once(docs.title().to_string())
        .chain(docs.verbatim_chunks())
        .collect::<Vec<_>>()
        .join("\n\n");

    OpenApi {
        openapi: OPENAPI_VERSION,
        info: OpenApiInfo {
            title: docs.title().to_string(),
            version: version.to_string(),
            description,
        },
        paths,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cast::Cast;
    use crate::definition::{PossibleResponse, RouteParameter};
    use crate::matcher::Matcher;
    use std::sync::Arc;

    fn contract_for(entries: &[RegistryEntry], mountpoint: &str) -> OpenApi {
        build(&AppDocumentation::new("PancakeApi", mountpoint, entries), "0.0.1")
    }

    #[test]
    fn test_root_action_under_mountpoint_has_no_trailing_slash() {
        let entries = vec![
            RegistryEntry::Action(Arc::new(ActionDefinition::new(Method::GET, "/"))),
            RegistryEntry::Action(Arc::new(ActionDefinition::new(Method::GET, "/pancakes"))),
        ];
        let keys: Vec<_> = contract_for(&entries, "/api").paths.into_keys().collect();
        assert_eq!(keys, vec!["/api", "/api/pancakes"]);

        let keys: Vec<_> = contract_for(&entries, "").paths.into_keys().collect();
        assert_eq!(keys, vec!["/", "/pancakes"]);
    }

    fn get_pancake() -> ActionDefinition {
        let mut def = ActionDefinition::new(Method::GET, "/pancake/:id");
        def.description = "Fetch a pancake".into();
        def.route_parameters.push(RouteParameter::new(
            "id",
            "Pancake ID",
            Matcher::string(),
            Cast::Identity,
        ));
        def.responses.push(PossibleResponse::new(
            200,
            "Found",
            Some(json!({"name": "Pancake", "toppings": ["syrup"], "diameter": 20})),
        ));
        def.responses.push(PossibleResponse::new(404, "Not found", None));
        def
    }

    #[test]
    fn test_path_keys_and_response_codes() {
        let entries = vec![RegistryEntry::Action(Arc::new(get_pancake()))];
        let contract = contract_for(&entries, "");

        let op = contract.operation("/pancake/{id}", &Method::GET).unwrap();
        let responses = op["responses"].as_object().unwrap();
        assert_eq!(responses.keys().collect::<Vec<_>>(), vec!["200", "404"]);
        assert_eq!(op["summary"], "Fetch a pancake");
        assert_eq!(op["description"], "Fetch a pancake");
    }

    #[test]
    fn test_path_parameters_are_required() {
        let entries = vec![RegistryEntry::Action(Arc::new(get_pancake()))];
        let contract = contract_for(&entries, "");
        let op = contract.operation("/pancake/{id}", &Method::GET).unwrap();

        assert_eq!(
            op["parameters"][0],
            json!({
                "name": "id",
                "in": "path",
                "required": true,
                "description": "Pancake ID",
                "schema": {"type": "string", "example": "string"}
            })
        );
    }

    #[test]
    fn test_example_schema_tree() {
        let entries = vec![RegistryEntry::Action(Arc::new(get_pancake()))];
        let contract = contract_for(&entries, "");
        let op = contract.operation("/pancake/{id}", &Method::GET).unwrap();
        let schema = &op["responses"]["200"]["content"]["application/json"]["schema"];

        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["name"], json!({"type": "string", "example": "Pancake"}));
        assert_eq!(schema["properties"]["toppings"]["type"], "array");
        assert_eq!(schema["properties"]["toppings"]["items"]["type"], "string");
        assert_eq!(schema["properties"]["diameter"]["type"], "integer");
        assert!(op["responses"]["404"].get("content").is_none());
    }

    #[test]
    fn test_body_verbs_get_request_body() {
        let mut def = ActionDefinition::new(Method::POST, "/pancakes");
        def.parameters.push(Parameter::new(
            "diameter",
            "Diameter in cm",
            true,
            Matcher::integer(),
            Cast::to_int(),
        ));
        def.parameters.push(Parameter::new(
            "topping",
            "",
            false,
            Matcher::string(),
            Cast::Identity,
        ));
        let entries = vec![RegistryEntry::Action(Arc::new(def))];
        let contract = contract_for(&entries, "/api");

        let op = contract.operation("/api/pancakes", &Method::POST).unwrap();
        let schema = &op["requestBody"]["content"]["application/json"]["schema"];
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["diameter"]));
        assert_eq!(schema["properties"]["diameter"]["type"], "integer");
        assert!(op.get("parameters").is_none());
        assert_eq!(op["responses"]["200"]["description"], "No response defined");
    }

    #[test]
    fn test_bodyless_verbs_use_query_parameters() {
        let mut def = ActionDefinition::new(Method::GET, "/pancakes");
        def.parameters.push(Parameter::new(
            "limit",
            "",
            false,
            Matcher::integer(),
            Cast::to_int(),
        ));
        let entries = vec![RegistryEntry::Action(Arc::new(def))];
        let contract = contract_for(&entries, "");

        let op = contract.operation("/pancakes", &Method::GET).unwrap();
        assert_eq!(op["parameters"][0]["in"], "query");
        assert_eq!(op["parameters"][0]["required"], false);
        assert!(op.get("requestBody").is_none());
    }

    #[test]
    fn test_verbs_merge_under_one_path() {
        let entries = vec![
            RegistryEntry::Action(Arc::new(ActionDefinition::new(Method::GET, "/pancakes"))),
            RegistryEntry::Action(Arc::new(ActionDefinition::new(Method::POST, "/pancakes"))),
        ];
        let contract = contract_for(&entries, "");
        let item = &contract.paths["/pancakes"];
        assert_eq!(item.keys().collect::<Vec<_>>(), vec!["get", "post"]);
    }

    #[test]
    fn test_undeclared_placeholders_are_documented() {
        let entries = vec![RegistryEntry::Action(Arc::new(ActionDefinition::new(
            Method::DELETE,
            "/pancakes/:slug",
        )))];
        let contract = contract_for(&entries, "");
        let op = contract.operation("/pancakes/{slug}", &Method::DELETE).unwrap();
        assert_eq!(op["parameters"][0]["name"], "slug");
        assert_eq!(op["parameters"][0]["required"], true);
    }

    #[test]
    fn test_operation_ids_are_stable_and_url_safe() {
        let a = operation_id(&Method::GET, "/api", "/pancake/:id");
        let b = operation_id(&Method::GET, "/api", "/pancake/:id");
        assert_eq!(a, b);
        assert!(!a.contains('+') && !a.contains('/') && !a.contains('='));
        assert_ne!(a, operation_id(&Method::POST, "/api", "/pancake/:id"));
    }

    #[test]
    fn test_info_description_collects_verbatim_chunks() {
        let entries = vec![
            RegistryEntry::Markdown("Pancakes, served fresh.".into()),
            RegistryEntry::Timestamp,
        ];
        let contract = contract_for(&entries, "");
        assert_eq!(contract.openapi, "3.0.3");
        assert_eq!(contract.info.version, "0.0.1");
        assert!(contract
            .info
            .description
            .starts_with("PancakeApi\n\nPancakes, served fresh.\n\nDocumentation built on "));
    }

    #[test]
    fn test_yaml_and_json_output() {
        let entries = vec![RegistryEntry::Action(Arc::new(get_pancake()))];
        let contract = contract_for(&entries, "");
        let yaml = contract.to_yaml().unwrap();
        assert!(yaml.contains("pancake/{id}"));
        let parsed: Value = serde_json::from_str(&contract.to_json().unwrap()).unwrap();
        assert_eq!(parsed["info"]["title"], "PancakeApi");
    }
}
