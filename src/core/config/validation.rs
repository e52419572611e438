use serde_json::{Map, Value};

use super::settings::Settings;
use crate::core::errors::ApiError;

/// Shape and range checks on the raw merged config, before it is
/// deserialized. Reports the dotted path of the first offending value.
pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 1, 65_535)?;
        validate_u64_field(
            server,
            "server.max_upload_bytes",
            "max_upload_bytes",
            1,
            4_294_967_296,
        )?;
    }

    if let Some(ingest) = expect_optional_object(root, "ingest")? {
        validate_optional_string_field(ingest, "ingest.uploads_dir", "uploads_dir")?;
        validate_u64_field(ingest, "ingest.chunk_size", "chunk_size", 1, 1_000_000)?;
        validate_u64_field(ingest, "ingest.chunk_overlap", "chunk_overlap", 0, 1_000_000)?;
        validate_u64_field(
            ingest,
            "ingest.web_timeout_secs",
            "web_timeout_secs",
            1,
            86_400,
        )?;
        validate_string_array_field(ingest, "ingest.default_urls", "default_urls")?;
    }

    if let Some(embedding) = expect_optional_object(root, "embedding")? {
        if embedding.contains_key("model") {
            validate_required_string_field(embedding, "embedding.model", "model")?;
        }
        validate_optional_string_field(embedding, "embedding.endpoint", "endpoint")?;
        validate_optional_string_field(embedding, "embedding.hf_api_base", "hf_api_base")?;
        validate_u64_field(embedding, "embedding.dimensions", "dimensions", 1, 65_536)?;
        validate_u64_field(embedding, "embedding.batch_size", "batch_size", 1, 4_096)?;
    }

    if let Some(index) = expect_optional_object(root, "index")? {
        if index.contains_key("name") {
            validate_required_string_field(index, "index.name", "name")?;
        }
        validate_optional_string_field(index, "index.namespace", "namespace")?;
        validate_u64_field(index, "index.top_k", "top_k", 1, 10_000)?;
        validate_u64_field(
            index,
            "index.upsert_batch_size",
            "upsert_batch_size",
            1,
            1_000,
        )?;
    }

    if let Some(pinecone) = expect_optional_object(root, "pinecone")? {
        validate_optional_string_field(pinecone, "pinecone.controller_url", "controller_url")?;
        validate_optional_string_field(pinecone, "pinecone.api_version", "api_version")?;
    }

    if let Some(llm) = expect_optional_object(root, "llm")? {
        if llm.contains_key("model_path") {
            validate_required_string_field(llm, "llm.model_path", "model_path")?;
        }
        validate_u64_field(llm, "llm.port", "port", 1, 65_535)?;
        validate_u64_field(llm, "llm.context_length", "context_length", 1, 10_000_000)?;
        validate_u64_field(llm, "llm.max_new_tokens", "max_new_tokens", 1, 1_000_000)?;
        validate_f64_field(llm, "llm.temperature", "temperature", 0.0, 5.0)?;
        validate_i64_field(llm, "llm.n_gpu_layers", "n_gpu_layers", -1, 1_000_000)?;
        validate_u64_field(
            llm,
            "llm.startup_timeout_secs",
            "startup_timeout_secs",
            1,
            86_400,
        )?;
    }

    Ok(())
}

/// Cross-field rules that only make sense on the typed settings.
pub fn validate_settings(settings: &Settings) -> Result<(), ApiError> {
    if settings.ingest.chunk_overlap >= settings.ingest.chunk_size {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at 'ingest.chunk_overlap': must be smaller than chunk_size ({})",
            settings.ingest.chunk_size
        )));
    }
    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(config_type_error(key, "object")),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_i64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: i64,
    max: i64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_i64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_required_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let value = section.get(key).ok_or_else(|| {
        ApiError::BadRequest(format!("Invalid config at '{}': value is required", path))
    })?;
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() || value.as_str().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "string"))
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}
