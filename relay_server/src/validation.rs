use relay_core::{normalize, SynthesisRequest};

use crate::error::ApiError;

/// Callback methods the provider understands.
const CALLBACK_METHODS: [&str; 3] = ["get", "post", "put"];

/// Validate a synthesis request before any provider call is made.
pub fn validate_synthesis_request(req: &SynthesisRequest, max_text_chars: usize) -> Result<(), ApiError> {
    validate_text(&req.text, max_text_chars)?;

    let options = &req.options;
    if let Some(speed) = options.speed {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(ApiError::InvalidInput(format!(
                "Invalid speed: {speed}. Must be a positive number"
            )));
        }
    }
    if let Some(pitch) = options.pitch {
        if !pitch.is_finite() {
            return Err(ApiError::InvalidInput("Invalid pitch".to_string()));
        }
    }

    if let Some(url) = options.callback_url.as_deref().filter(|u| !u.is_empty()) {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ApiError::InvalidInput(format!(
                "Invalid callback_url: {url}. Expected an http(s) URL"
            )));
        }
        if let Some(method) = options.callback_method.as_deref().filter(|m| !m.is_empty()) {
            if !CALLBACK_METHODS.contains(&method.to_ascii_lowercase().as_str()) {
                return Err(ApiError::InvalidInput(format!(
                    "Invalid callback_method: {method}. Expected GET, POST or PUT"
                )));
            }
        }
    }

    Ok(())
}

/// Validate text length, before and after cleanup.
pub fn validate_text(text: &str, max_text_chars: usize) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::InvalidInput("Text cannot be empty".to_string()));
    }
    if text.chars().count() > max_text_chars {
        return Err(ApiError::InvalidInput(format!(
            "Text too long (max {} characters)",
            max_text_chars
        )));
    }
    if normalize(text).is_empty() {
        return Err(ApiError::InvalidInput(
            "Text has nothing to speak after removing formatting".to_string(),
        ));
    }
    Ok(())
}

/// Single-shot requests must fit in one provider call.
pub fn validate_single_shot(text: &str, max_segment_chars: usize) -> Result<(), ApiError> {
    let chars = normalize(text).chars().count();
    if chars > max_segment_chars {
        return Err(ApiError::InvalidInput(format!(
            "Text too long for a single request ({chars} > {max_segment_chars} characters); use /tts"
        )));
    }
    Ok(())
}
