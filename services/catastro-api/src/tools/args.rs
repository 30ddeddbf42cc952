//! Typed access to the JSON arguments of a tool call.

use catastro_common::{CadastralReference, CatastroError, CatastroResult};
use serde_json::{Map, Value};

/// Borrowed argument object. `null` counts as absent.
#[derive(Debug, Clone, Copy)]
pub struct ToolArgs<'a> {
    map: &'a Map<String, Value>,
}

impl<'a> ToolArgs<'a> {
    pub fn new(map: &'a Map<String, Value>) -> Self {
        Self { map }
    }

    fn get(&self, name: &str) -> Option<&'a Value> {
        self.map.get(name).filter(|v| !v.is_null())
    }

    /// Trimmed string; empty strings count as absent. Numbers are accepted
    /// in their decimal form.
    pub fn optional_str(&self, name: &str) -> CatastroResult<Option<String>> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::String(s)) => {
                let s = s.trim();
                Ok((!s.is_empty()).then(|| s.to_string()))
            }
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(_) => Err(CatastroError::invalid_parameter(name, "expected a string")),
        }
    }

    pub fn required_str(&self, name: &str) -> CatastroResult<String> {
        self.optional_str(name)?.ok_or_else(|| missing(name))
    }

    pub fn str_or(&self, name: &str, default: &str) -> CatastroResult<String> {
        Ok(self.optional_str(name)?.unwrap_or_else(|| default.to_string()))
    }

    /// Finite number, given as a JSON number or a numeric string.
    pub fn required_f64(&self, name: &str) -> CatastroResult<f64> {
        let value = match self.get(name) {
            None => return Err(missing(name)),
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            Some(_) => None,
        };
        value
            .filter(|v| v.is_finite())
            .ok_or_else(|| CatastroError::invalid_parameter(name, "expected a finite number"))
    }

    /// Non-negative integer, given as a JSON number or a numeric string.
    pub fn optional_u64(&self, name: &str) -> CatastroResult<Option<u64>> {
        let value = match self.get(name) {
            None => return Ok(None),
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
            Some(_) => None,
        };
        value
            .map(Some)
            .ok_or_else(|| CatastroError::invalid_parameter(name, "expected a non-negative integer"))
    }

    pub fn reference(&self, name: &str) -> CatastroResult<CadastralReference> {
        CadastralReference::parse(&self.required_str(name)?)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'a String> {
        self.map.keys()
    }
}

fn missing(name: &str) -> CatastroError {
    CatastroError::invalid_parameter(name, "is required")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_strings() {
        let m = map(json!({"a": "  MADRID ", "b": "", "c": 28, "d": true, "e": null}));
        let args = ToolArgs::new(&m);
        assert_eq!(args.required_str("a").unwrap(), "MADRID");
        assert_eq!(args.optional_str("b").unwrap(), None);
        assert_eq!(args.required_str("c").unwrap(), "28");
        assert!(args.optional_str("d").is_err());
        assert_eq!(args.optional_str("e").unwrap(), None);

        let err = args.required_str("b").unwrap_err();
        assert_eq!(err.kind(), "InvalidParameter");
        assert!(err.to_string().contains("'b'"));
    }

    #[test]
    fn test_numbers() {
        let m = map(json!({"x": -3.7, "y": "40.41", "bad": "north", "n": 3, "neg": -1}));
        let args = ToolArgs::new(&m);
        assert_eq!(args.required_f64("x").unwrap(), -3.7);
        assert_eq!(args.required_f64("y").unwrap(), 40.41);
        assert!(args.required_f64("bad").is_err());
        assert!(args.required_f64("missing").is_err());
        assert_eq!(args.optional_u64("n").unwrap(), Some(3));
        assert!(args.optional_u64("neg").is_err());
    }

    #[test]
    fn test_reference_argument() {
        let m = map(json!({"reference": "1146801vk4714e", "bad": "1146801VK471"}));
        let args = ToolArgs::new(&m);
        assert_eq!(args.reference("reference").unwrap().parcel_id(), "1146801VK4714E");
        assert_eq!(args.reference("bad").unwrap_err().kind(), "InvalidReferenceFormat");
    }
}
