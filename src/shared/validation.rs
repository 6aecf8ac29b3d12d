use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// 入力値のバリデーション失敗理由。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ValidationFailureKind {
    /// ファイルが空。
    EmptyContent,
    /// 許可されていない MIME タイプ。
    UnsupportedMimeType,
    /// サイズが上限を超過。
    ContentTooLarge,
    /// ユーザー ID の形式が不正。
    InvalidUserId,
}

impl ValidationFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationFailureKind::EmptyContent => "empty_content",
            ValidationFailureKind::UnsupportedMimeType => "unsupported_mime_type",
            ValidationFailureKind::ContentTooLarge => "content_too_large",
            ValidationFailureKind::InvalidUserId => "invalid_user_id",
        }
    }
}

impl fmt::Display for ValidationFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationFailureKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "empty_content" => Ok(ValidationFailureKind::EmptyContent),
            "unsupported_mime_type" => Ok(ValidationFailureKind::UnsupportedMimeType),
            "content_too_large" => Ok(ValidationFailureKind::ContentTooLarge),
            "invalid_user_id" => Ok(ValidationFailureKind::InvalidUserId),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_string_roundtrip() {
        for kind in [
            ValidationFailureKind::EmptyContent,
            ValidationFailureKind::UnsupportedMimeType,
            ValidationFailureKind::ContentTooLarge,
            ValidationFailureKind::InvalidUserId,
        ] {
            assert_eq!(kind.as_str().parse::<ValidationFailureKind>(), Ok(kind));
        }
        assert!("nope".parse::<ValidationFailureKind>().is_err());
    }
}
