use std::{path::Path, time::Duration};

use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

pub const MAX_SUGGESTED_TAGS: usize = 5;

const SYSTEM_PROMPT: &str = "你是一个图片检索助手";
const CONTENT_PROMPT: &str = concat!(
	"你现在是图片检索助手。",
	"用户的搜索意图是：{user_message}。",
	"给定这张图片，请你判断它是否与用户意图相关，并只输出一个 JSON：",
	r#"{"match_score": 0到1之间的数值, "suggested_tags": ["标签1","标签2","标签3"], "short_caption": "简短描述"} "#,
	"严格输出 JSON，不要输出多余文字。",
);

/// Relevance of one image to the user's request.
///
/// The default value is the zero judgment used whenever a call or its parsing fails.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VisionJudgment {
	/// Always within `[0, 1]`.
	pub match_score: f32,
	pub suggested_tags: Vec<String>,
	pub short_caption: String,
}

pub async fn judge(
	cfg: &lumo_config::VisionProviderConfig,
	image_path: &Path,
	user_message: &str,
) -> Result<VisionJudgment> {
	let bytes = tokio::fs::read(image_path)
		.await
		.map_err(|err| Error::Io { path: image_path.to_path_buf(), source: err })?;
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": build_messages(&image_data_url(image_path, &bytes), user_message),
	});
	let res = client
		.post(&url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;
	let Some(text) = response_text(&json) else {
		return Err(Error::InvalidResponse {
			message: "Vision response is missing message content.".to_string(),
		});
	};

	Ok(parse_judgment(&text))
}

/// Reads a judgment out of free-form model output.
///
/// Strict JSON is tried first, then the first balanced `{...}` object embedded in the text.
/// Anything unusable yields [`VisionJudgment::default`].
pub fn parse_judgment(text: &str) -> VisionJudgment {
	let text = text.trim();

	if text.is_empty() {
		return VisionJudgment::default();
	}

	let object = match serde_json::from_str::<Value>(text) {
		Ok(Value::Object(map)) => Some(map),
		_ => first_balanced_object(text),
	};
	let Some(object) = object else {
		return VisionJudgment::default();
	};

	VisionJudgment {
		match_score: object.get("match_score").map(score_value).unwrap_or(0.0),
		suggested_tags: object.get("suggested_tags").map(tag_values).unwrap_or_default(),
		short_caption: match object.get("short_caption") {
			Some(Value::String(caption)) => caption.trim().to_string(),
			Some(Value::Null) | None => String::new(),
			Some(other) => other.to_string(),
		},
	}
}

fn build_messages(data_url: &str, user_message: &str) -> Value {
	serde_json::json!([
		{ "role": "system", "content": SYSTEM_PROMPT },
		{
			"role": "user",
			"content": [
				{ "type": "image_url", "image_url": { "url": data_url } },
				{ "type": "text", "text": CONTENT_PROMPT.replace("{user_message}", user_message) },
			],
		},
	])
}

fn image_data_url(path: &Path, bytes: &[u8]) -> String {
	let extension =
		path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase).unwrap_or_default();
	let mime = match extension.as_str() {
		"png" => "image/png",
		"gif" => "image/gif",
		"webp" => "image/webp",
		"bmp" => "image/bmp",
		_ => "image/jpeg",
	};

	format!("data:{mime};base64,{}", B64.encode(bytes))
}

fn response_text(json: &Value) -> Option<String> {
	let content = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))?;

	match content {
		Value::String(text) => Some(text.clone()),
		Value::Array(parts) => {
			let texts: Vec<&str> = parts
				.iter()
				.filter_map(|part| part.get("text").and_then(|text| text.as_str()))
				.filter(|text| !text.is_empty())
				.collect();

			Some(texts.join("\n"))
		},
		_ => None,
	}
}

fn first_balanced_object(text: &str) -> Option<serde_json::Map<String, Value>> {
	for (start, _) in text.match_indices('{') {
		let Some(end) = balanced_end(&text[start..]) else { continue };

		if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&text[start..start + end]) {
			return Some(map);
		}
	}

	None
}

// Byte length of the object opening at the start of `text`, if it closes.
fn balanced_end(text: &str) -> Option<usize> {
	let mut depth = 0_usize;
	let mut in_string = false;
	let mut escaped = false;

	for (idx, ch) in text.char_indices() {
		if in_string {
			match ch {
				_ if escaped => escaped = false,
				'\\' => escaped = true,
				'"' => in_string = false,
				_ => {},
			}

			continue;
		}

		match ch {
			'"' => in_string = true,
			'{' => depth += 1,
			'}' => {
				depth = depth.checked_sub(1)?;

				if depth == 0 {
					return Some(idx + ch.len_utf8());
				}
			},
			_ => {},
		}
	}

	None
}

fn score_value(value: &Value) -> f32 {
	let raw = match value {
		Value::Number(number) => number.as_f64(),
		Value::String(text) => text.trim().parse::<f64>().ok(),
		_ => None,
	};

	match raw {
		Some(score) if score.is_finite() => score.clamp(0.0, 1.0) as f32,
		_ => 0.0,
	}
}

fn tag_values(value: &Value) -> Vec<String> {
	let items: Vec<&Value> = match value {
		Value::Array(items) => items.iter().collect(),
		Value::Null => Vec::new(),
		other => vec![other],
	};
	let mut tags: Vec<String> = Vec::new();

	for item in items {
		let name = match item {
			Value::String(text) => text.trim().to_string(),
			Value::Null => continue,
			other => other.to_string(),
		};

		if name.is_empty() || tags.contains(&name) {
			continue;
		}

		tags.push(name);

		if tags.len() >= MAX_SUGGESTED_TAGS {
			break;
		}
	}

	tags
}
