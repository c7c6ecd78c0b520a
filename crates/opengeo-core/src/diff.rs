//! Structural diff between two snapshots of a document.
//!
//! The tree walked is fixed and shallow: `_id`, each metadata key, each
//! `values[i]` and, for generic objects, each `children[key][i]`. Fields
//! are paired by position. A field keeping its label and type reports at
//! `values[i].value`; any other change to the slot reports the whole field
//! at `values[i]`, so a reordered field list shows up as replaced fields
//! rather than as a move.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::models::document::Document;
use crate::models::sub_object::SubObject;

/// One leaf-level change, addressed by a path into the document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Difference {
    pub path: String,
    pub initial_value: Value,
    pub value: Value,
}

/// List every difference between `a` (before) and `b` (after).
///
/// Paths are rooted at the id of `a`, e.g.
/// `<id>.children["contact"][0].values[2].value`.
pub fn get_difference<D: Document>(a: &D, b: &D) -> Vec<Difference> {
    let mut out = Vec::new();
    let prefix = a.id().to_string();
    diff_document(&prefix, a, b, &mut out);

    if let (Some(left), Some(right)) = (a.children(), b.children()) {
        let keys: BTreeSet<&String> = left.keys().chain(right.keys()).collect();
        for key in keys {
            let empty = Vec::new();
            let before = left.get(key).unwrap_or(&empty);
            let after = right.get(key).unwrap_or(&empty);
            diff_children(&prefix, key, before, after, &mut out);
        }
    }

    debug!(document = %prefix, changes = out.len(), "computed document difference");
    out
}

fn diff_children(
    prefix: &str,
    key: &str,
    before: &[SubObject],
    after: &[SubObject],
    out: &mut Vec<Difference>,
) {
    let quoted = Value::String(key.to_string()).to_string();
    for i in 0..before.len().max(after.len()) {
        let child_prefix = format!("{prefix}.children[{quoted}][{i}]");
        match (before.get(i), after.get(i)) {
            (Some(a), Some(b)) => diff_document(&child_prefix, a, b, out),
            (a, b) => out.push(Difference {
                path: child_prefix,
                initial_value: to_json(a),
                value: to_json(b),
            }),
        }
    }
}

fn diff_document<D: Document>(prefix: &str, a: &D, b: &D, out: &mut Vec<Difference>) {
    if a.id() != b.id() {
        out.push(Difference {
            path: format!("{prefix}._id"),
            initial_value: Value::String(a.id().to_string()),
            value: Value::String(b.id().to_string()),
        });
    }

    let before = to_json(Some(a.metadata()));
    let after = to_json(Some(b.metadata()));
    let keys: BTreeSet<&String> = before
        .as_object()
        .into_iter()
        .chain(after.as_object())
        .flat_map(|m| m.keys())
        .collect();
    for key in keys {
        let initial = before.get(key).cloned().unwrap_or(Value::Null);
        let value = after.get(key).cloned().unwrap_or(Value::Null);
        if initial != value {
            out.push(Difference {
                path: format!("{prefix}.metadata.{key}"),
                initial_value: initial,
                value,
            });
        }
    }

    let (left, right) = (a.values(), b.values());
    for i in 0..left.len().max(right.len()) {
        match (left.get(i), right.get(i)) {
            (Some(x), Some(y)) if x.label == y.label && x.field_type == y.field_type => {
                if x.value != y.value {
                    out.push(Difference {
                        path: format!("{prefix}.values[{i}].value"),
                        initial_value: x.value.clone(),
                        value: y.value.clone(),
                    });
                }
            }
            // Added, removed, renamed or retyped: the whole field is reported.
            (x, y) => out.push(Difference {
                path: format!("{prefix}.values[{i}]"),
                initial_value: to_json(x),
                value: to_json(y),
            }),
        }
    }
}

fn to_json<T: Serialize>(item: Option<&T>) -> Value {
    item.and_then(|v| serde_json::to_value(v).ok())
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::models::document::Metadata;
    use crate::models::field::{FieldType, GenericField};
    use crate::models::generic_object::GenericObject;
    use crate::models::habilitation::PermissionLevel;

    fn metadata(label: &str) -> Metadata {
        let now = Utc::now();
        Metadata {
            label: label.into(),
            entity: "bretagne".into(),
            authorization: PermissionLevel::Reader,
            color: None,
            description: None,
            created_at: now,
            created_by: "admin".into(),
            updated_at: now,
            updated_by: "admin".into(),
        }
    }

    fn contact(name: &str) -> SubObject {
        SubObject {
            id: Uuid::nil(),
            metadata: metadata("Contact"),
            values: vec![
                GenericField::new("nom", FieldType::String, json!(name)),
                GenericField::new("tel", FieldType::String, json!("")),
            ],
        }
    }

    fn site() -> GenericObject {
        GenericObject {
            id: Uuid::new_v4(),
            metadata: metadata("Port de Lorient"),
            values: vec![
                GenericField::new("adresse", FieldType::String, json!("Quai des Indes")),
                GenericField::new("surface", FieldType::Number, json!(120)),
            ],
            children: BTreeMap::new(),
        }
    }

    #[test]
    fn identical_snapshots_have_no_difference() {
        let a = site();
        assert!(get_difference(&a, &a.clone()).is_empty());
    }

    #[test]
    fn metadata_and_values_are_compared() {
        let a = site();
        let mut b = a.clone();
        b.metadata.label = "Port de Lorient-Keroman".into();
        b.values[1].value = json!(140);

        let diff = get_difference(&a, &b);
        let id = a.id;
        assert_eq!(
            diff,
            vec![
                Difference {
                    path: format!("{id}.metadata.label"),
                    initial_value: json!("Port de Lorient"),
                    value: json!("Port de Lorient-Keroman"),
                },
                Difference {
                    path: format!("{id}.values[1].value"),
                    initial_value: json!(120),
                    value: json!(140),
                },
            ]
        );
    }

    #[test]
    fn added_value_is_reported_whole() {
        let a = site();
        let mut b = a.clone();
        b.values.push(GenericField::empty("site web", FieldType::Url));

        let diff = get_difference(&a, &b);
        assert_eq!(diff.len(), 1);
        assert_eq!(diff[0].path, format!("{}.values[2]", a.id));
        assert_eq!(diff[0].initial_value, Value::Null);
        assert_eq!(diff[0].value["label"], json!("site web"));
    }

    #[test]
    fn removed_value_is_reported_whole() {
        let a = site();
        let mut b = a.clone();
        b.values.pop();

        let diff = get_difference(&a, &b);
        assert_eq!(diff.len(), 1);
        assert_eq!(diff[0].path, format!("{}.values[1]", a.id));
        assert_eq!(diff[0].initial_value["label"], json!("surface"));
        assert_eq!(diff[0].value, Value::Null);
    }

    #[test]
    fn renamed_or_retyped_field_is_a_change() {
        let a = site();
        let mut renamed = a.clone();
        renamed.values[0].label = "adresse postale".into();

        let diff = get_difference(&a, &renamed);
        assert_eq!(diff.len(), 1);
        assert_eq!(diff[0].path, format!("{}.values[0]", a.id));
        assert_eq!(diff[0].initial_value["label"], json!("adresse"));
        assert_eq!(diff[0].value["label"], json!("adresse postale"));
        assert_eq!(diff[0].value["value"], json!("Quai des Indes"));

        let mut retyped = a.clone();
        retyped.values[1].field_type = FieldType::String;
        let diff = get_difference(&a, &retyped);
        assert_eq!(diff.len(), 1);
        assert_eq!(diff[0].path, format!("{}.values[1]", a.id));
    }

    #[test]
    fn children_are_diffed_pairwise() {
        let mut a = site();
        a.embed(contact("Le Bihan"));
        let mut b = a.clone();
        b.children.get_mut("contact").unwrap()[0].values[0].value = json!("Le Goff");

        let diff = get_difference(&a, &b);
        assert_eq!(diff.len(), 1);
        assert_eq!(
            diff[0].path,
            format!("{}.children[\"contact\"][0].values[0].value", a.id)
        );
        assert_eq!(diff[0].initial_value, json!("Le Bihan"));
    }

    #[test]
    fn added_and_removed_children_are_reported() {
        let mut a = site();
        a.embed(contact("Le Bihan"));
        let mut b = a.clone();
        b.embed(contact("Morvan"));
        b.children.insert("occupation".into(), Vec::new());

        let diff = get_difference(&a, &b);
        assert_eq!(diff.len(), 1);
        assert_eq!(diff[0].path, format!("{}.children[\"contact\"][1]", a.id));
        assert_eq!(diff[0].initial_value, Value::Null);

        let back = get_difference(&b, &a);
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].value, Value::Null);
    }

    #[test]
    fn reordered_values_show_as_replaced_fields() {
        let a = site();
        let mut b = a.clone();
        b.values.swap(0, 1);
        // Positional pairing: both slots report a replaced field.
        let diff = get_difference(&a, &b);
        assert_eq!(diff.len(), 2);
        assert!(diff.iter().all(|d| !d.path.ends_with(".value")));
    }
}
