//! The stored scheduler definition and the descriptors returned by the
//! read APIs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The full definition persisted in a scheduler's hash, written on
/// every override-mode upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tz: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub every: Option<i64>,
    /// Opaque JSON payload for the emitted job.
    pub data: String,
    /// Opaque JSON template job options.
    pub opts: String,
}

impl SchedulerDefinition {
    /// Flattens the definition into the field/value pairs stored in the
    /// Redis hash.
    pub fn to_hash_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("name", self.name.clone()),
            ("data", self.data.clone()),
            ("opts", self.opts.clone()),
        ];
        if let Some(end_date) = self.end_date {
            fields.push(("endDate", end_date.to_string()));
        }
        if let Some(tz) = &self.tz {
            fields.push(("tz", tz.clone()));
        }
        if let Some(pattern) = &self.pattern {
            fields.push(("pattern", pattern.clone()));
        }
        if let Some(every) = self.every {
            fields.push(("every", every.to_string()));
        }
        fields
    }

    /// Reconstructs a definition from the hash fields returned by
    /// `HGETALL`. Returns `None` if the mandatory `name` field is
    /// missing (the hash does not exist).
    pub fn from_hash_fields(fields: &HashMap<String, String>) -> Option<Self> {
        let name = fields.get("name")?.clone();
        Some(Self {
            name,
            end_date: fields.get("endDate").and_then(|v| v.parse().ok()),
            tz: fields.get("tz").cloned(),
            pattern: fields.get("pattern").cloned(),
            every: fields.get("every").and_then(|v| v.parse().ok()),
            data: fields.get("data").cloned().unwrap_or_default(),
            opts: fields.get("opts").cloned().unwrap_or_default(),
        })
    }
}

/// Descriptor returned by the read APIs (`get`, `list`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchedulerJson {
    pub key: String,
    pub name: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tz: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub every: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<i64>,
}

impl SchedulerJson {
    /// Builds a descriptor from a stored definition plus the current
    /// index score.
    pub fn from_definition(id: &str, def: &SchedulerDefinition, next: Option<i64>) -> Self {
        Self {
            key: format!("repeat:{id}"),
            name: def.name.clone(),
            id: id.to_string(),
            end_date: def.end_date,
            tz: def.tz.clone(),
            pattern: def.pattern.clone(),
            every: def.every,
            next,
        }
    }

    /// Synthesizes a minimal descriptor from a legacy colon-delimited
    /// key of the form `name:id:endDate:tz:pattern`, used when the
    /// definition hash is absent but the caller still holds an old
    /// reference. Trailing fields are optional.
    pub fn from_legacy_descriptor(raw: &str, next: Option<i64>) -> Option<Self> {
        let mut parts = raw.splitn(5, ':');
        let name = parts.next()?.to_string();
        let id = parts.next()?.to_string();
        if name.is_empty() || id.is_empty() {
            return None;
        }
        let end_date = parts.next().filter(|s| !s.is_empty()).and_then(|s| s.parse().ok());
        let tz = parts.next().filter(|s| !s.is_empty()).map(str::to_string);
        let pattern = parts.next().filter(|s| !s.is_empty()).map(str::to_string);

        Some(Self {
            key: format!("repeat:{id}"),
            name,
            id,
            end_date,
            tz,
            pattern,
            every: None,
            next,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_hash_fields() {
        let def = SchedulerDefinition {
            name: "send-email".into(),
            end_date: Some(999_999),
            tz: Some("UTC".into()),
            pattern: Some("0 0 * * * *".into()),
            every: None,
            data: "{\"x\":1}".into(),
            opts: "{}".into(),
        };
        let fields: HashMap<String, String> = def
            .to_hash_fields()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let restored = SchedulerDefinition::from_hash_fields(&fields).unwrap();
        assert_eq!(restored.name, def.name);
        assert_eq!(restored.end_date, def.end_date);
        assert_eq!(restored.tz, def.tz);
        assert_eq!(restored.pattern, def.pattern);
        assert_eq!(restored.data, def.data);
    }

    #[test]
    fn missing_name_field_yields_none() {
        let fields = HashMap::new();
        assert!(SchedulerDefinition::from_hash_fields(&fields).is_none());
    }

    #[test]
    fn legacy_descriptor_parses_minimal_form() {
        let descriptor = SchedulerJson::from_legacy_descriptor("send-email:s1", Some(1000)).unwrap();
        assert_eq!(descriptor.name, "send-email");
        assert_eq!(descriptor.id, "s1");
        assert_eq!(descriptor.key, "repeat:s1");
        assert_eq!(descriptor.next, Some(1000));
        assert!(descriptor.end_date.is_none());
    }

    #[test]
    fn legacy_descriptor_parses_full_form() {
        let descriptor =
            SchedulerJson::from_legacy_descriptor("send-email:s1:999999:UTC:0 0 * * * *", None).unwrap();
        assert_eq!(descriptor.end_date, Some(999_999));
        assert_eq!(descriptor.tz.as_deref(), Some("UTC"));
        assert_eq!(descriptor.pattern.as_deref(), Some("0 0 * * * *"));
    }

    #[test]
    fn legacy_descriptor_rejects_empty_name_or_id() {
        assert!(SchedulerJson::from_legacy_descriptor(":s1", None).is_none());
        assert!(SchedulerJson::from_legacy_descriptor("name:", None).is_none());
    }
}
