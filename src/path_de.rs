use serde::de::DeserializeOwned;
use serde_json::Value;

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, String> {
    let de = &mut serde_json::Deserializer::from_str(src);
    match serde_path_to_error::deserialize::<_, T>(de) {
        Ok(v) => Ok(v),
        Err(err) => {
            let path = err.path().to_string();
            Err(format!("at JSON path {path} → {}", err.into_inner()))
        }
    }
}

/// Same as [`from_str_with_path`] for an already-parsed value (schema nodes,
/// options objects embedded in a larger document).
pub fn from_value_with_path<T: DeserializeOwned>(value: Value) -> Result<T, String> {
    match serde_path_to_error::deserialize::<_, T>(value) {
        Ok(v) => Ok(v),
        Err(err) => {
            let path = err.path().to_string();
            Err(format!("at JSON path {path} → {}", err.into_inner()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;

    #[test]
    fn errors_carry_the_failing_path() {
        let err = from_str_with_path::<Options>(r#"{"enums": {"sortValues": "yes"}}"#).unwrap_err();
        assert!(err.contains("enums.sortValues"), "{err}");
    }

    #[test]
    fn values_deserialize_too() {
        let opts: Options = from_value_with_path(serde_json::json!({"maxDepth": 4})).unwrap();
        assert_eq!(opts.max_depth, 4);
    }
}
