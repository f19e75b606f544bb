//! YAML to JSON conversion for manifest processing
//!
//! Rendered manifests and user-supplied files arrive as YAML text, often with
//! several documents per blob. Everything downstream (object decoding, typed
//! deserialization of Deployments and Jobs) works on `serde_json::Value`, so
//! parsing converts once here and the rest of the engine never touches YAML.

use serde_json::{Map, Number, Value};
use yaml_rust2::{Yaml, YamlLoader};

use crate::Error;

/// Parse a YAML stream into its documents as `serde_json::Value`s.
///
/// Documents separated by `---` become separate values. Empty documents
/// (blank or comment-only, common in rendered Helm output) are dropped.
pub fn parse_documents(input: &str) -> Result<Vec<Value>, Error> {
    let docs = YamlLoader::load_from_str(input)
        .map_err(|e| Error::serialization(format!("invalid YAML: {}", e)))?;
    docs.into_iter()
        .map(to_json)
        .filter(|doc| !matches!(doc, Ok(Value::Null)))
        .collect()
}

/// Parse a single-document YAML string into a `serde_json::Value`.
///
/// Returns `Value::Null` for empty input; extra documents are ignored.
pub fn parse_document(input: &str) -> Result<Value, Error> {
    let docs = YamlLoader::load_from_str(input)
        .map_err(|e| Error::serialization(format!("invalid YAML: {}", e)))?;
    match docs.into_iter().next() {
        Some(doc) => to_json(doc),
        None => Ok(Value::Null),
    }
}

fn to_json(yaml: Yaml) -> Result<Value, Error> {
    match yaml {
        Yaml::Null => Ok(Value::Null),
        Yaml::Boolean(b) => Ok(Value::Bool(b)),
        Yaml::Integer(i) => Ok(Value::Number(i.into())),
        Yaml::Real(r) => {
            let f: f64 = r
                .parse()
                .map_err(|e| Error::serialization(format!("invalid YAML number {:?}: {}", r, e)))?;
            Ok(Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null))
        }
        Yaml::String(s) => Ok(Value::String(s)),
        Yaml::Array(items) => items
            .into_iter()
            .map(to_json)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Yaml::Hash(entries) => entries
            .into_iter()
            .map(|(key, value)| {
                // Manifest keys are strings; scalar keys of other types are
                // stringified so a quirky annotation cannot abort the parse.
                let key = match key {
                    Yaml::String(s) => s,
                    Yaml::Integer(i) => i.to_string(),
                    Yaml::Real(r) => r,
                    Yaml::Boolean(b) => b.to_string(),
                    Yaml::Null => "null".to_string(),
                    other => {
                        return Err(Error::serialization(format!(
                            "unsupported YAML key: {:?}",
                            other
                        )))
                    }
                };
                to_json(value).map(|v| (key, v))
            })
            .collect::<Result<Map<String, Value>, _>>()
            .map(Value::Object),
        Yaml::Alias(_) => Err(Error::serialization("YAML aliases not supported")),
        Yaml::BadValue => Err(Error::serialization("bad YAML value")),
    }
}
