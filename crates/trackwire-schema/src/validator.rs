use std::cmp::Reverse;

use jsonschema::Validator;
use serde_json::{Map, Value};
use tracing::{debug, trace};
use trackwire_message::{codec, Envelope};

use crate::config::ValidatorConfig;
use crate::error::{Result, SchemaError};

/// JSON Schema for a complete envelope, including every payload and report shape.
pub const ENVELOPE_SCHEMA: &str = include_str!("../schemas/envelope.schema.json");

/// Compiled envelope schema.
pub struct EnvelopeValidator {
    validator: Validator,
    config: ValidatorConfig,
}

impl EnvelopeValidator {
    /// Compile the envelope schema with default (lenient) config.
    pub fn new() -> Result<Self> {
        Self::with_config(ValidatorConfig::default())
    }

    /// Compile the envelope schema with explicit config.
    pub fn with_config(config: ValidatorConfig) -> Result<Self> {
        let mut schema: Value = serde_json::from_str(ENVELOPE_SCHEMA)
            .map_err(|err| SchemaError::CompileFailed(err.to_string()))?;
        if config.strict_mode {
            apply_strict_mode(&mut schema);
        }

        let validator = jsonschema::validator_for(&schema)
            .map_err(|err| SchemaError::CompileFailed(err.to_string()))?;
        Ok(Self { validator, config })
    }

    /// Check the structure of a parsed document and convert it into an [`Envelope`].
    ///
    /// When several members are wrong, the most deeply nested one is reported.
    pub fn validate(&self, value: Value) -> Result<Envelope> {
        let deepest = self
            .validator
            .iter_errors(&value)
            .map(|err| (err.to_string(), err.instance_path().to_string()))
            .min_by_key(|(_, path)| Reverse(path.matches('/').count()));
        if let Some((reason, path)) = deepest {
            trace!(%path, %reason, "envelope failed schema validation");
            return Err(SchemaError::Invalid { reason, path });
        }

        // The schema admits a few values the typed model cannot hold, such
        // as integers outside the i64 range.
        serde_json::from_value(value).map_err(|err| SchemaError::Invalid {
            reason: err.to_string(),
            path: String::new(),
        })
    }

    /// Parse raw bytes and validate the resulting document.
    pub fn decode(&self, raw: &[u8]) -> Result<Envelope> {
        let value = codec::parse(raw)?;
        let envelope = self.validate(value)?;
        debug!(id = envelope.id, kind = %envelope.kind(), "decoded message");
        Ok(envelope)
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }
}

impl std::fmt::Debug for EnvelopeValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeValidator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Close every object schema that does not say otherwise.
///
/// Conditional branches are left alone: they describe a subset of the
/// members of the object they apply to, so closing them would reject every
/// envelope.
fn apply_strict_mode(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if is_object_schema(map) && !map.contains_key("additionalProperties") {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
            }

            recurse_map_schemas(map, "properties");
            recurse_map_schemas(map, "$defs");
            recurse_single_schema(map, "items");
            recurse_array_schemas(map, "prefixItems");
            recurse_array_schemas(map, "allOf");
            recurse_array_schemas(map, "anyOf");
            recurse_array_schemas(map, "oneOf");
        }
        Value::Array(items) => {
            for item in items {
                apply_strict_mode(item);
            }
        }
        _ => {}
    }
}

fn recurse_map_schemas(map: &mut Map<String, Value>, key: &str) {
    if let Some(Value::Object(obj)) = map.get_mut(key) {
        for value in obj.values_mut() {
            apply_strict_mode(value);
        }
    }
}

fn recurse_single_schema(map: &mut Map<String, Value>, key: &str) {
    if let Some(value) = map.get_mut(key) {
        apply_strict_mode(value);
    }
}

fn recurse_array_schemas(map: &mut Map<String, Value>, key: &str) {
    if let Some(Value::Array(items)) = map.get_mut(key) {
        for item in items {
            apply_strict_mode(item);
        }
    }
}

fn is_object_schema(map: &Map<String, Value>) -> bool {
    match map.get("type") {
        Some(Value::String(kind)) => kind == "object",
        _ => map.contains_key("properties") || map.contains_key("required"),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use trackwire_message::{DataReport, MessageError, MessageKind, Payload};

    use super::*;

    fn lenient() -> EnvelopeValidator {
        EnvelopeValidator::new().unwrap()
    }

    fn strict() -> EnvelopeValidator {
        EnvelopeValidator::with_config(ValidatorConfig { strict_mode: true }).unwrap()
    }

    fn invalid_path(result: Result<Envelope>) -> String {
        match result {
            Err(SchemaError::Invalid { path, .. }) => path,
            other => panic!("expected SchemaError::Invalid, got {other:?}"),
        }
    }

    fn track_2d() -> Value {
        json!({
            "type": "data",
            "id": 1001,
            "time": 1700000000.5,
            "data": {
                "type": "tres",
                "data": {
                    "track_id": 3,
                    "cam_angles": [
                        {"cam_id": 0, "direction": [0.1, -0.2]},
                        {"cam_id": 1, "direction": [0.3, 0.0]}
                    ]
                }
            }
        })
    }

    #[test]
    fn accepts_every_payload_shape() {
        let validator = lenient();
        let documents = [
            json!({"type": "req", "id": 1, "time": 1.0, "data": {"req": "status"}}),
            json!({"type": "ack", "id": 2, "time": 2.0, "data": {"to": 1, "ack": true}}),
            json!({"type": "repl", "id": 3, "time": 3.0, "data": {"to": 1, "data": {"cams": [0, 1]}}}),
            track_2d(),
            json!({
                "type": "data", "id": 5, "time": 5.0,
                "data": {"type": "tres3", "data": {
                    "track_id": 9,
                    "position": [1.0, 2.0, 3.0],
                    "cam_angles": [{"cam_id": 0, "position": [0, 0, 0], "direction": [0, 0, 1]}]
                }}
            }),
            json!({
                "type": "data", "id": 6, "time": 6.0,
                "data": {"type": "sinf", "data": {
                    "id": 2,
                    "position": [0, 0, 2],
                    "direction": [1, 0, 0],
                    "fov": [62.2, 48.8],
                    "resolution": [1920, 1080]
                }}
            }),
        ];

        let kinds: Vec<_> = documents
            .into_iter()
            .map(|doc| validator.validate(doc).unwrap().kind())
            .collect();
        assert_eq!(
            kinds,
            vec![
                MessageKind::Req,
                MessageKind::Ack,
                MessageKind::Repl,
                MessageKind::Data,
                MessageKind::Data,
                MessageKind::Data
            ]
        );
    }

    #[test]
    fn unknown_type_is_reported_at_type() {
        let validator = lenient();
        let path = invalid_path(validator.validate(json!({"id": 42, "type": "bogus"})));
        assert_eq!(path, "/type");
    }

    #[test]
    fn missing_payload_member_is_reported_at_data() {
        let validator = lenient();
        let doc = json!({"type": "ack", "id": 2, "time": 2.0, "data": {"to": 1}});
        assert_eq!(invalid_path(validator.validate(doc)), "/data");
    }

    #[test]
    fn nested_errors_carry_full_path() {
        let validator = lenient();

        let mut doc = track_2d();
        doc["data"]["type"] = json!("tres4");
        assert_eq!(invalid_path(validator.validate(doc)), "/data/type");

        let mut doc = track_2d();
        doc["data"]["data"]["cam_angles"][1]["direction"] = json!([0.3]);
        assert_eq!(
            invalid_path(validator.validate(doc)),
            "/data/data/cam_angles/1/direction"
        );

        let mut doc = track_2d();
        doc["data"]["data"]["track_id"] = json!("three");
        assert_eq!(invalid_path(validator.validate(doc)), "/data/data/track_id");
    }

    #[test]
    fn payload_must_match_its_own_tag() {
        let validator = lenient();
        let doc = json!({"type": "req", "id": 1, "time": 1.0, "data": {"to": 1, "ack": true}});
        assert_eq!(invalid_path(validator.validate(doc)), "/data");
    }

    #[test]
    fn semantically_odd_values_pass() {
        let validator = lenient();
        let mut doc = track_2d();
        doc["data"]["data"]["track_id"] = json!(-7);
        doc["time"] = json!(-1);
        let envelope = validator.validate(doc).unwrap();
        match envelope.payload {
            Payload::Data(DataReport::TrackResult2D(track)) => assert_eq!(track.track_id, -7),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn lenient_mode_ignores_unknown_members() {
        let mut doc = track_2d();
        doc["extra"] = json!(true);
        doc["data"]["data"]["cam_angles"][0]["confidence"] = json!(0.9);

        let envelope = lenient().validate(doc.clone()).unwrap();
        assert_eq!(envelope.id, 1001);

        assert_eq!(
            invalid_path(strict().validate(doc)),
            "/data/data/cam_angles/0"
        );
    }

    #[test]
    fn strict_mode_accepts_exact_documents() {
        let validator = strict();
        assert!(validator.validate(track_2d()).is_ok());
        assert!(validator
            .validate(json!({"type": "repl", "id": 3, "time": 3.0, "data": {"to": 1, "data": {"anything": 1}}}))
            .is_ok());
        assert!(validator.config().strict_mode);
    }

    #[test]
    fn out_of_range_id_is_invalid() {
        let doc = json!({"type": "ack", "id": u64::MAX, "time": 2.0, "data": {"to": 1, "ack": true}});
        assert_eq!(invalid_path(lenient().validate(doc)), "");
    }

    #[test]
    fn decode_distinguishes_parse_and_shape_failures() {
        let validator = lenient();

        assert!(matches!(
            validator.decode(b"{\"type\": \"req\", \"id\": 77"),
            Err(SchemaError::Decode(MessageError::Decode(_)))
        ));
        assert!(matches!(
            validator.decode(br#"{"id": 42, "type": "bogus"}"#),
            Err(SchemaError::Invalid { .. })
        ));

        let envelope = validator
            .decode(br#"{"type":"req","id":5,"time":0.5,"data":{"req":"cams"}}"#)
            .unwrap();
        assert_eq!(envelope, Envelope::new(5, 0.5, Payload::request("cams")));
    }

    #[test]
    fn encoded_envelopes_validate() {
        let validator = strict();
        let envelope = Envelope::new(12, 4.0, Payload::nack(11));
        let raw = codec::encode(&envelope).unwrap();
        assert_eq!(validator.decode(&raw).unwrap(), envelope);
    }

    #[test]
    fn path_accessor_only_for_invalid() {
        let err = lenient().validate(json!([])).unwrap_err();
        assert_eq!(err.path(), Some(""));
        let err = lenient().decode(b"nope").unwrap_err();
        assert_eq!(err.path(), None);
    }
}
