use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use std::fmt;

const DATA_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// `data:<mime>;base64,<payload>` 形式の画像データ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    mime_type: String,
    payload: String,
}

impl DataUrl {
    /// サーバーから受け取った値をそのまま連結する
    pub fn from_base64(mime_type: &str, payload: &str) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            payload: payload.to_string(),
        }
    }

    /// ローカルのファイルをエンコードする。MIME タイプは小文字に正規化する
    pub fn encode(mime_type: &str, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.trim().to_ascii_lowercase(),
            payload: BASE64_STANDARD.encode(bytes),
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        let rest = value
            .strip_prefix(DATA_PREFIX)
            .ok_or_else(|| "Data URL must start with 'data:'".to_string())?;
        let (mime_type, payload) = rest
            .split_once(BASE64_MARKER)
            .ok_or_else(|| "Data URL is not base64 encoded".to_string())?;
        if mime_type.is_empty() {
            return Err("Data URL is missing a mime type".to_string());
        }
        Ok(Self {
            mime_type: mime_type.to_string(),
            payload: payload.to_string(),
        })
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }
}

impl fmt::Display for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{DATA_PREFIX}{}{BASE64_MARKER}{}",
            self.mime_type, self.payload
        )
    }
}
