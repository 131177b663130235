//! The pancake API: an in-memory griddle exposed through apiary declarations.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::anyhow;
use apiary::prelude::*;
use apiary::{DefinitionError, ParamBag};
use parking_lot::Mutex;
use runtime::ApiConfig;
use serde::Serialize;
use serde_json::{json, Value};

const INTRO: &str = "Pancakes, made to order.\n\n\
All responses are JSON. Errors carry an `error` message.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pancake {
    pub id: i64,
    pub diameter: i64,
    pub topping: Option<String>,
}

#[derive(Debug, Default)]
pub struct PancakeStore {
    last_id: i64,
    pancakes: BTreeMap<i64, Pancake>,
}

pub type SharedStore = Arc<Mutex<PancakeStore>>;

impl PancakeStore {
    pub fn list(&self) -> Vec<Pancake> {
        self.pancakes.values().cloned().collect()
    }

    pub fn get(&self, id: i64) -> Option<Pancake> {
        self.pancakes.get(&id).cloned()
    }

    pub fn create(&mut self, diameter: i64, topping: Option<String>) -> Pancake {
        self.last_id += 1;
        let pancake = Pancake {
            id: self.last_id,
            diameter,
            topping,
        };
        self.pancakes.insert(pancake.id, pancake.clone());
        pancake
    }

    pub fn set_topping(&mut self, id: i64, topping: String) -> Option<Pancake> {
        let pancake = self.pancakes.get_mut(&id)?;
        pancake.topping = Some(topping);
        Some(pancake.clone())
    }

    pub fn remove(&mut self, id: i64) -> Option<Pancake> {
        self.pancakes.remove(&id)
    }
}

struct ListPancakes<'a> {
    store: &'a PancakeStore,
}

impl Action for ListPancakes<'_> {
    fn perform(&mut self, _ctx: &mut dyn ActionContext) -> Result<Option<Value>, HandlerError> {
        Ok(Some(to_json(self.store.list())?))
    }
}

fn to_json(value: impl Serialize) -> Result<Value, HandlerError> {
    serde_json::to_value(value).map_err(|e| HandlerError::Failed(e.into()))
}

fn positive_integer() -> Matcher {
    Matcher::predicate("PositiveInteger", |v| v.as_i64().is_some_and(|n| n > 0))
}

fn pancake_id(args: &RouteArgs) -> Result<i64, HandlerError> {
    args.named("id")
        .and_then(Value::as_i64)
        .ok_or_else(|| anyhow!("route id was not cast to an integer").into())
}

fn no_such_pancake(ctx: &dyn ActionContext, id: i64) -> HandlerError {
    let mut extras = ParamBag::new();
    extras.insert("id".into(), json!(id));
    bail(ctx, "No such pancake", 404, extras)
}

fn example_pancake() -> Value {
    json!({"id": 1, "diameter": 20, "topping": "maple syrup"})
}

/// Declare every pancake action against `store`.
pub fn build_app(api: &ApiConfig, store: SharedStore) -> Result<App, DefinitionError> {
    let mut options = AppOptions::new(api.title.clone());
    options.version = api.version.clone();
    options.documentation_enabled = api.documentation_enabled;

    let mut builder = AppBuilder::new(options);
    builder
        .mount_at(&api.mount_at)
        .insert_literal_markdown(INTRO)
        .insert_build_timestamp();

    let s = Arc::clone(&store);
    builder
        .describe("List every pancake on the griddle")
        .responds_with(200, "All pancakes", json!([example_pancake()]))
        .get("/pancakes", move |ctx, _| {
            let store = s.lock();
            let mut list = ListPancakes { store: &store };
            action_result(ctx, &mut list)
        })?;

    let s = Arc::clone(&store);
    builder
        .describe("Fetch a single pancake")
        .route_param_with("id", "Pancake ID", Matcher::integer(), Cast::to_int())
        .responds_with(200, "Pancake found", example_pancake())
        .responds_with(404, "No such pancake", json!({"error": "No such pancake", "id": 1}))
        .get("/pancake/:id", move |ctx, args| {
            let id = pancake_id(args)?;
            let found = s.lock().get(id);
            match found {
                Some(pancake) => Ok(ctx.json_response(&to_json(pancake)?)),
                None => Err(no_such_pancake(ctx, id)),
            }
        })?;

    let s = Arc::clone(&store);
    builder
        .describe("Make a pancake")
        .required_param_with(
            "diameter",
            "Diameter in centimetres",
            positive_integer(),
            Cast::to_int(),
        )
        .param("topping", "Topping of choice", Matcher::string())
        .responds_with(201, "Pancake made", example_pancake())
        .responds_with(
            400,
            "Invalid parameters",
            json!({"error": "Missing parameter :diameter"}),
        )
        .post("/pancakes", move |ctx, _| {
            let diameter = ctx
                .param("diameter")
                .and_then(Value::as_i64)
                .ok_or_else(|| anyhow!("diameter was not cast to an integer"))?;
            let topping = ctx
                .param("topping")
                .and_then(Value::as_str)
                .map(str::to_owned);
            let pancake = s.lock().create(diameter, topping);
            ctx.set_status(201);
            Ok(ctx.json_response(&to_json(pancake)?))
        })?;

    let s = Arc::clone(&store);
    builder
        .describe("Change the topping of a pancake")
        .route_param_with("id", "Pancake ID", Matcher::integer(), Cast::to_int())
        .required_param("topping", "New topping", Matcher::string())
        .responds_with(200, "Pancake updated", example_pancake())
        .responds_with(404, "No such pancake", json!({"error": "No such pancake", "id": 1}))
        .put("/pancake/:id", move |ctx, args| {
            let id = pancake_id(args)?;
            let topping = ctx
                .param("topping")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let updated = s.lock().set_topping(id, topping);
            match updated {
                Some(pancake) => Ok(ctx.json_response(&to_json(pancake)?)),
                None => Err(no_such_pancake(ctx, id)),
            }
        })?;

    let s = Arc::clone(&store);
    builder
        .describe("Eat a pancake")
        .route_param_with("id", "Pancake ID", Matcher::integer(), Cast::to_int())
        .responds_with(204, "Eaten", None)
        .responds_with(404, "No such pancake", json!({"error": "No such pancake", "id": 1}))
        .delete("/pancake/:id", move |ctx, args| {
            let id = pancake_id(args)?;
            let removed = s.lock().remove(id);
            match removed {
                Some(_) => {
                    ctx.set_status(204);
                    Ok(Reply::Empty)
                }
                None => Err(no_such_pancake(ctx, id)),
            }
        })?;

    builder.build()
}
