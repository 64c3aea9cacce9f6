//! Request payloads assembled from form values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use hearth_core::{CustomField, Visibility};

use crate::schema::{FormValues, PRIVACY_PREFIX, RuleKind, Schema};

/// Body of a form write request.
///
/// Built-in fields sit at the top level. Custom field values and
/// visibility choices are grouped under `customFields` and `privacy`,
/// keyed by bare name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormPayload {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_fields: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub privacy: BTreeMap<String, Visibility>,
}

impl FormPayload {
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.custom_fields.is_empty() && self.privacy.is_empty()
    }
}

/// Build a payload from the values of every field in `schema`.
///
/// Values for names outside the schema are dropped. Fields the user never
/// filled in are sent with the schema default.
#[must_use]
pub fn assemble(schema: &Schema, values: &FormValues) -> FormPayload {
    let mut payload = FormPayload::default();

    for rule in schema {
        let value = match (&rule.kind, values.get(&rule.name)) {
            (RuleKind::Object(nested), Some(Value::Object(children))) => {
                Value::Object(keep_known(nested, children))
            }
            (_, Some(value)) => value.clone(),
            (_, None) => rule.default_value(),
        };

        if let Some(bare) = rule.name.strip_prefix(CustomField::FORM_PREFIX) {
            payload.custom_fields.insert(bare.to_owned(), value);
        } else if let (RuleKind::Visibility, Some(bare)) =
            (&rule.kind, rule.name.strip_prefix(PRIVACY_PREFIX))
        {
            let visibility = value
                .as_str()
                .and_then(|v| v.parse().ok())
                .unwrap_or_default();
            payload.privacy.insert(bare.to_owned(), visibility);
        } else {
            payload.fields.insert(rule.name.clone(), value);
        }
    }

    payload
}

fn keep_known(schema: &Schema, children: &Map<String, Value>) -> Map<String, Value> {
    schema
        .iter()
        .filter_map(|rule| {
            children
                .get(&rule.name)
                .map(|value| (rule.name.clone(), value.clone()))
        })
        .collect()
}
