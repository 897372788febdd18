//! Shape validation for raw snapshot data. Runs before any side effect and
//! never touches storage: a snapshot that fails here leaves the store and
//! the backups directory untouched.

use serde_json::Value;

use crate::schema::Entity;

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub violations: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn into_result(self) -> Result<(), Vec<String>> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(self.violations)
        }
    }
}

/// Check that `raw` looks like a snapshot: a JSON object whose known
/// collection fields, if present, are arrays of objects, and whose
/// `settings` field, if present, is an object. Unknown fields are ignored
/// for forward compatibility.
pub fn validate(raw: &Value) -> ValidationReport {
    let mut report = ValidationReport::default();

    let Some(object) = raw.as_object() else {
        report
            .violations
            .push("snapshot must be a JSON object".to_string());
        return report;
    };

    for entity in Entity::all() {
        let name = entity.collection();
        match object.get(name) {
            None | Some(Value::Null) => {}
            Some(Value::Array(records)) => {
                for (index, record) in records.iter().enumerate() {
                    if !record.is_object() {
                        report
                            .violations
                            .push(format!("{name}[{index}] must be an object"));
                    }
                }
            }
            Some(_) => {
                report.violations.push(format!("{name} must be an array"));
            }
        }
    }

    match object.get("settings") {
        None | Some(Value::Null) | Some(Value::Object(_)) => {}
        Some(_) => {
            report
                .violations
                .push("settings must be an object".to_string());
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_object_is_valid() {
        assert!(validate(&json!({})).is_ok());
    }

    #[test]
    fn scalar_snapshot_is_rejected() {
        let report = validate(&json!("not a snapshot"));
        assert_eq!(report.violations, vec!["snapshot must be a JSON object"]);
    }

    #[test]
    fn scalar_collection_is_rejected() {
        let report = validate(&json!({ "sales": "not-an-array" }));
        assert_eq!(report.violations, vec!["sales must be an array"]);
    }

    #[test]
    fn non_object_elements_are_rejected() {
        let report = validate(&json!({ "customers": [{"name": "A"}, 42] }));
        assert_eq!(report.violations, vec!["customers[1] must be an object"]);
    }

    #[test]
    fn settings_must_be_an_object() {
        let report = validate(&json!({ "settings": [] }));
        assert_eq!(report.violations, vec!["settings must be an object"]);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let report = validate(&json!({
            "preferences": "whatever",
            "customers": [],
        }));
        assert!(report.is_ok());
    }

    #[test]
    fn multiple_violations_are_collected() {
        let report = validate(&json!({
            "sales": 1,
            "orders": {"a": 1},
            "settings": "dark",
        }));
        assert_eq!(report.violations.len(), 3);
    }
}
