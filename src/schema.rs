//! Structural contracts for the three structured generation calls.
//!
//! Each builder returns a JSON-schema-shaped value that is embedded verbatim
//! into the user prompt, instructing the generator what to emit; the same
//! shapes are pinned by tests against the `domain` decode targets. Schema
//! construction itself cannot fail; mis-shaped generator output is a gateway
//! concern.
//!
//! Style inference deliberately has no schema here: that call is free text,
//! validated after the fact by `LearningStyle::from_response`.

use serde_json::{json, Value};

use crate::domain::ALL_STYLES;

fn style_enum() -> Vec<&'static str> {
  ALL_STYLES.iter().map(|s| s.label()).collect()
}

/// Contract for `request_assessment_questions`:
/// `{ "questions": [ { "question": string, "options": [string] } ] }`.
pub fn assessment_schema() -> Value {
  json!({
    "type": "object",
    "properties": {
      "questions": {
        "type": "array",
        "items": {
          "type": "object",
          "properties": {
            "question": { "type": "string" },
            "options": { "type": "array", "items": { "type": "string" } }
          },
          "required": ["question", "options"]
        }
      }
    },
    "required": ["questions"]
  })
}

/// Contract for `generate_course`: title, learning style restricted to the
/// four labels, and the strict module → lesson → session tree.
pub fn course_schema() -> Value {
  json!({
    "type": "object",
    "properties": {
      "title": { "type": "string" },
      "learningStyle": { "type": "string", "enum": style_enum() },
      "modules": {
        "type": "array",
        "items": {
          "type": "object",
          "properties": {
            "title": { "type": "string" },
            "lessons": {
              "type": "array",
              "items": {
                "type": "object",
                "properties": {
                  "title": { "type": "string" },
                  "sessions": {
                    "type": "array",
                    "items": {
                      "type": "object",
                      "properties": {
                        "title": { "type": "string" },
                        "content": { "type": "string" }
                      },
                      "required": ["title", "content"]
                    }
                  }
                },
                "required": ["title", "sessions"]
              }
            }
          },
          "required": ["title", "lessons"]
        }
      }
    },
    "required": ["title", "learningStyle", "modules"]
  })
}

/// Contract for `generate_session_details`. The mind-map children are
/// described two levels deep; deeper nesting is allowed by the recursive
/// domain type and capped by the consumer, not by this contract.
pub fn session_details_schema() -> Value {
  json!({
    "type": "object",
    "properties": {
      "keyConcepts": { "type": "array", "items": { "type": "string" } },
      "learningObjective": { "type": "string" },
      "sessionContent": { "type": "string" },
      "activity": {
        "type": "object",
        "properties": {
          "title": { "type": "string" },
          "description": { "type": "string" }
        },
        "required": ["title", "description"]
      },
      "mindMap": {
        "type": "object",
        "properties": {
          "name": { "type": "string" },
          "children": {
            "type": "array",
            "items": {
              "type": "object",
              "properties": {
                "name": { "type": "string" },
                "children": {
                  "type": "array",
                  "items": {
                    "type": "object",
                    "properties": { "name": { "type": "string" } }
                  }
                }
              },
              "required": ["name"]
            }
          }
        },
        "required": ["name"]
      }
    },
    "required": ["keyConcepts", "learningObjective", "sessionContent", "activity", "mindMap"]
  })
}

/// Append the structural contract to an instruction prompt.
pub fn with_schema(prompt: &str, schema: &Value) -> String {
  format!(
    "{prompt}\n\nRespond with a single JSON object (no code fences, no commentary) matching this schema:\n{schema}"
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Course, SessionDetails};

  #[test]
  fn assessment_contract_requires_questions() {
    let s = assessment_schema();
    assert_eq!(s["required"][0], "questions");
    assert_eq!(s["properties"]["questions"]["items"]["required"][1], "options");
  }

  #[test]
  fn course_contract_pins_the_style_enum() {
    let s = course_schema();
    let labels: Vec<_> = s["properties"]["learningStyle"]["enum"]
      .as_array()
      .unwrap()
      .iter()
      .map(|v| v.as_str().unwrap())
      .collect();
    assert_eq!(labels, vec!["Visual", "Auditory", "Kinesthetic", "Reading/Writing"]);
  }

  #[test]
  fn course_contract_is_required_at_every_level() {
    let s = course_schema();
    let module = &s["properties"]["modules"]["items"];
    assert_eq!(module["required"][1], "lessons");
    let lesson = &module["properties"]["lessons"]["items"];
    assert_eq!(lesson["required"][1], "sessions");
    let session = &lesson["properties"]["sessions"]["items"];
    assert_eq!(session["required"][1], "content");
  }

  #[test]
  fn a_schema_conforming_course_decodes_into_the_domain_type() {
    let raw = r#"{
      "title": "T",
      "learningStyle": "Auditory",
      "modules": [
        {"title": "W1", "lessons": [
          {"title": "L1", "sessions": [{"title": "S1", "content": "c"}]}
        ]}
      ]
    }"#;
    let c: Course = serde_json::from_str(raw).unwrap();
    assert_eq!(c.modules[0].lessons[0].sessions[0].title, "S1");
  }

  #[test]
  fn a_schema_conforming_session_detail_decodes_into_the_domain_type() {
    let raw = r###"{
      "keyConcepts": ["a", "b"],
      "learningObjective": "obj",
      "sessionContent": "## md",
      "activity": {"title": "t", "description": "d"},
      "mindMap": {"name": "root", "children": [{"name": "child"}]}
    }"###;
    let d: SessionDetails = serde_json::from_str(raw).unwrap();
    assert_eq!(d.mind_map.children[0].name, "child");
    assert!(d.mind_map.children[0].children.is_empty());
  }

  #[test]
  fn with_schema_embeds_both_parts() {
    let out = with_schema("Do the thing.", &assessment_schema());
    assert!(out.starts_with("Do the thing."));
    assert!(out.contains("\"questions\""));
  }
}
