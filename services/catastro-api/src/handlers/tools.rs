//! Tool listing and invocation handlers.

use std::sync::Arc;

use axum::{body::Bytes, extract::Path, Extension, Json};
use catastro_common::CatastroError;
use serde_json::{Map, Value};

use super::ApiError;
use crate::state::AppState;
use crate::tools::{self, registry, ToolOutput};

/// GET /tools - Tool descriptors
pub async fn list_tools_handler() -> Json<&'static [registry::ToolDescriptor]> {
    Json(registry::TOOLS)
}

/// POST /tools/:name - Run a tool with a JSON object of arguments
pub async fn call_tool_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<ToolOutput>, ApiError> {
    let arguments = parse_arguments(&body)?;
    let output = tools::execute(&state, &name, &arguments).await?;
    Ok(Json(output))
}

/// An empty body means no arguments; anything else must be a JSON object.
fn parse_arguments(body: &[u8]) -> Result<Map<String, Value>, CatastroError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(_) => Err(CatastroError::invalid_parameter("body", "expected a JSON object")),
        Err(e) => Err(CatastroError::invalid_parameter("body", e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments() {
        assert!(parse_arguments(b"").unwrap().is_empty());
        assert!(parse_arguments(b"  \n").unwrap().is_empty());
        assert_eq!(parse_arguments(br#"{"province": "MADRID"}"#).unwrap()["province"], "MADRID");
        assert_eq!(parse_arguments(b"[1, 2]").unwrap_err().kind(), "InvalidParameter");
        assert_eq!(parse_arguments(b"{").unwrap_err().kind(), "InvalidParameter");
    }
}
