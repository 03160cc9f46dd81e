pub type JSONObject = serde_json::value::Map<String, serde_json::value::Value>;
