use std::fmt::Write as _;

use crate::definition::{ActionDefinition, Parameter, PossibleResponse};
use crate::dispatcher::Response;

use super::render::escape_html;

pub const TABLE_CLASS: &str = "apiary-table";

/// Markdown section for a single action.
pub struct MethodDocumentation<'a> {
    definition: &'a ActionDefinition,
    mountpoint: &'a str,
}

impl<'a> MethodDocumentation<'a> {
    pub fn new(definition: &'a ActionDefinition, mountpoint: &'a str) -> Self {
        Self {
            definition,
            mountpoint,
        }
    }

    pub fn full_path(&self) -> String {
        format!("{}{}", self.mountpoint, self.definition.path)
    }

    /// Heading, description and whichever tables have content, separated
    /// by blank lines.
    pub fn to_markdown(&self) -> String {
        let def = self.definition;
        let mut parts = vec![format!("## {} {}", def.verb.as_str(), self.full_path())];

        if def.has_description() {
            parts.push(def.description.clone());
        }
        if def.has_route_parameters() {
            parts.push("### URL parameters".to_string());
            parts.push(route_parameters_table(def));
        }
        if def.has_parameters() {
            parts.push("### Request parameters".to_string());
            parts.push(parameters_table(&def.parameters));
        }
        if def.has_responses() {
            parts.push("### Possible responses".to_string());
            parts.push(responses_table(&def.responses));
        }

        parts.join("\n\n")
    }
}

// Tables are emitted on one line each. A blank line inside an HTML block would
// end it and hand the rest back to the Markdown parser.
fn cell(text: &str) -> String {
    escape_html(text.trim()).replace('\n', "<br>")
}

fn route_parameters_table(def: &ActionDefinition) -> String {
    let mut html = format!(
        "<table class=\"{TABLE_CLASS}\"><tr><th>Name</th><th>Description</th></tr>"
    );
    for param in &def.route_parameters {
        let _ = write!(
            html,
            "<tr><td><tt>:{}</tt></td><td>{}</td></tr>",
            escape_html(&param.name),
            cell(&param.description)
        );
    }
    html.push_str("</table>");
    html
}

fn parameters_table(parameters: &[Parameter]) -> String {
    let mut html = format!(
        "<table class=\"{TABLE_CLASS}\"><tr><th>Name</th><th>Required</th>\
         <th>Type after cast</th><th>Description</th></tr>"
    );
    for param in parameters {
        let _ = write!(
            html,
            "<tr><td><tt>{}</tt></td><td>{}</td><td><tt>{}</tt></td><td>{}</td></tr>",
            escape_html(&param.name),
            if param.required { "Yes" } else { "No" },
            escape_html(&param.matcher.describe()),
            cell(&param.description)
        );
    }
    html.push_str("</table>");
    html
}

fn responses_table(responses: &[PossibleResponse]) -> String {
    let mut html = format!(
        "<table class=\"{TABLE_CLASS}\"><tr><th>HTTP status code</th><th>What happened</th>\
         <th>Example response body</th></tr>"
    );
    for response in responses {
        let example = match &response.example {
            Some(value) => {
                let pretty = Response::json(200, value).body_string();
                format!("<pre><code>{}</code></pre>", escape_html(&pretty).replace('\n', "&#10;"))
            }
            None => "(empty)".to_string(),
        };
        let _ = write!(
            html,
            "<tr><td><b>{}</b></td><td>{}</td><td>{}</td></tr>",
            response.status,
            cell(&response.description),
            example
        );
    }
    html.push_str("</table>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cast::Cast;
    use crate::definition::RouteParameter;
    use crate::matcher::Matcher;
    use http::Method;
    use serde_json::json;

    fn pancake_definition() -> ActionDefinition {
        let mut def = ActionDefinition::new(Method::POST, "/pancakes/:id");
        def.description = "Make a pancake.\n\nIt is *delicious*.".into();
        def.route_parameters.push(RouteParameter::new(
            "id",
            "ID of the pancake",
            Matcher::string(),
            Cast::Identity,
        ));
        def.parameters.push(Parameter::new(
            "diameter",
            "Diameter in cm",
            true,
            Matcher::integer(),
            Cast::to_int(),
        ));
        def.responses.push(PossibleResponse::new(
            200,
            "Pancake created",
            Some(json!({"name": "<b>Pancake</b>"})),
        ));
        def.responses.push(PossibleResponse::new(204, "Nothing", None));
        def
    }

    #[test]
    fn test_heading_uses_verb_and_mounted_path() {
        let def = pancake_definition();
        let md = MethodDocumentation::new(&def, "/api").to_markdown();
        assert!(md.starts_with("## POST /api/pancakes/:id\n\nMake a pancake."));
    }

    #[test]
    fn test_sections_in_order() {
        let def = pancake_definition();
        let md = MethodDocumentation::new(&def, "").to_markdown();
        let url = md.find("### URL parameters").unwrap();
        let request = md.find("### Request parameters").unwrap();
        let responses = md.find("### Possible responses").unwrap();
        assert!(url < request && request < responses);
        assert!(md.contains("<td><tt>:id</tt></td><td>ID of the pancake</td>"));
        assert!(md.contains(
            "<td><tt>diameter</tt></td><td>Yes</td><td><tt>Integer</tt></td><td>Diameter in cm</td>"
        ));
    }

    #[test]
    fn test_examples_are_escaped_and_empty_bodies_marked() {
        let def = pancake_definition();
        let md = MethodDocumentation::new(&def, "").to_markdown();
        assert!(md.contains("&lt;b&gt;Pancake&lt;/b&gt;"));
        assert!(md.contains("<td><b>204</b></td><td>Nothing</td><td>(empty)</td>"));
    }

    #[test]
    fn test_bare_definition_has_only_heading() {
        let def = ActionDefinition::new(Method::GET, "/");
        let md = MethodDocumentation::new(&def, "/mount").to_markdown();
        assert_eq!(md, "## GET /mount/");
    }

    #[test]
    fn test_tables_have_no_blank_lines() {
        let def = pancake_definition();
        let md = MethodDocumentation::new(&def, "").to_markdown();
        for table in md.split("\n\n").filter(|part| part.starts_with("<table")) {
            assert!(!table.contains('\n'));
        }
    }
}
