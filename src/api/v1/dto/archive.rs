/*
 * Responsibility
 * - archive create の request/response DTO
 * - validate_inputs(): Content-Type / JSON body / workspace 指定のチェック
 *
 * Notes
 * - serde の derive に任せるとエラーメッセージを制御できないため、
 *   body は一度 serde_json::Value で受けてからフィールドを見る
 */
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;
use crate::services::workspace::WorkspaceRef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveCreateRequest {
    pub source: WorkspaceRef,
    pub destination: WorkspaceRef,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveCreateResponse {
    pub source_bucket: String,
    pub destination_bucket: String,
}

/// True for strings with at least one non-whitespace character.
pub fn non_empty_string(v: Option<&str>) -> bool {
    v.is_some_and(|s| !s.trim().is_empty())
}

fn is_json_content_type(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

fn workspace_field(body: &Value, ws: &str, key: &str) -> Result<String, AppError> {
    let value = body.get(ws).and_then(|w| w.get(key)).and_then(Value::as_str);
    if non_empty_string(value) {
        Ok(value.unwrap_or_default().to_string())
    } else {
        Err(AppError::bad_request(format!(
            "Request must contain a non-empty value for [{ws}.{key}]."
        )))
    }
}

/// Validate an archive-create request before anything upstream is called.
pub fn validate_inputs(
    content_type: Option<&str>,
    body: &[u8],
) -> Result<ArchiveCreateRequest, AppError> {
    if !is_json_content_type(content_type) {
        return Err(AppError::bad_request("Request must be application/json."));
    }

    let body: Value = serde_json::from_slice(body)
        .ok()
        .filter(Value::is_object)
        .ok_or_else(|| AppError::bad_request("Request must contain a valid JSON body."))?;

    for key in ["source", "destination"] {
        if body.get(key).is_none_or(Value::is_null) {
            return Err(AppError::bad_request(format!(
                "Request must contain a value for [{key}]."
            )));
        }
    }

    let workspace = |ws: &str| -> Result<WorkspaceRef, AppError> {
        Ok(WorkspaceRef::new(
            workspace_field(&body, ws, "namespace")?,
            workspace_field(&body, ws, "name")?,
        ))
    };

    Ok(ArchiveCreateRequest {
        source: workspace("source")?,
        destination: workspace("destination")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const JSON: Option<&str> = Some("application/json");

    fn legal_body() -> Value {
        json!({
            "source": {"namespace": "mySourceNamespace", "name": "mySourceName"},
            "destination": {"namespace": "myDestinationNamespace", "name": "myDestinationName"},
        })
    }

    fn bytes(v: &Value) -> Vec<u8> {
        serde_json::to_vec(v).unwrap()
    }

    #[test]
    fn non_empty_string_cases() {
        for falsy in [None, Some(""), Some("  "), Some("\t"), Some("\n")] {
            assert!(!non_empty_string(falsy), "{falsy:?}");
        }
        let long = "x".repeat(1_000_000);
        for truthy in [Some("x"), Some(long.as_str()), Some("  x"), Some("x  "), Some("\nx\t")] {
            assert!(non_empty_string(truthy));
        }
    }

    #[test]
    fn requires_json_content_type() {
        let expected = AppError::bad_request("Request must be application/json.");
        assert_eq!(validate_inputs(None, &bytes(&legal_body())).unwrap_err(), expected);
        assert_eq!(
            validate_inputs(Some("text/plain"), &bytes(&legal_body())).unwrap_err(),
            expected
        );
        assert!(validate_inputs(Some("application/json; charset=utf-8"), &bytes(&legal_body())).is_ok());
    }

    #[test]
    fn requires_a_json_object_body() {
        let expected = AppError::bad_request("Request must contain a valid JSON body.");
        assert_eq!(validate_inputs(JSON, b"this is a string!").unwrap_err(), expected);
        assert_eq!(validate_inputs(JSON, br#""a json string""#).unwrap_err(), expected);
        assert_eq!(validate_inputs(JSON, b"").unwrap_err(), expected);
    }

    #[test]
    fn requires_source_and_destination() {
        for key in ["source", "destination"] {
            let mut body = legal_body();
            body.as_object_mut().unwrap().remove(key);
            assert_eq!(
                validate_inputs(JSON, &bytes(&body)).unwrap_err(),
                AppError::bad_request(format!("Request must contain a value for [{key}]."))
            );
        }
    }

    #[test]
    fn requires_each_workspace_field() {
        for ws in ["source", "destination"] {
            for key in ["namespace", "name"] {
                let expected = AppError::bad_request(format!(
                    "Request must contain a non-empty value for [{ws}.{key}]."
                ));

                let mut missing = legal_body();
                missing[ws].as_object_mut().unwrap().remove(key);
                assert_eq!(validate_inputs(JSON, &bytes(&missing)).unwrap_err(), expected);

                let mut blank = legal_body();
                blank[ws][key] = json!(" ");
                assert_eq!(validate_inputs(JSON, &bytes(&blank)).unwrap_err(), expected);
            }
        }
    }

    #[test]
    fn accepts_a_complete_request() {
        let req = validate_inputs(JSON, &bytes(&legal_body())).unwrap();
        assert_eq!(req.source, WorkspaceRef::new("mySourceNamespace", "mySourceName"));
        assert_eq!(
            req.destination,
            WorkspaceRef::new("myDestinationNamespace", "myDestinationName")
        );
    }
}
