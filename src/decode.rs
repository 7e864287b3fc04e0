//! 解码管线
//!
//! 每个格式选择器对应且只对应一个解码函数，映射通过穷尽的 `match` 完成，
//! 新增格式时编译器会要求补齐映射。解码是纯函数，单条记录失败只影响该记录。

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{ConsumerError, DecodeError, ErrorCode};
use crate::source::RawRecord;

/// 格式选择器
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatSelector {
    /// UTF-8 文本（非法 UTF-8 视为解码失败）
    String,
    /// JSON 文档
    Json,
    /// 原始字节，以标准 base64 文本呈现
    Base64,
    /// 原始字节，以小写十六进制呈现
    Hex,
}

impl FormatSelector {
    /// 全部格式
    pub const ALL: [FormatSelector; 4] = [
        FormatSelector::String,
        FormatSelector::Json,
        FormatSelector::Base64,
        FormatSelector::Hex,
    ];

    /// 获取格式对应的解码函数
    pub fn decoder(self) -> DecodeFn {
        match self {
            FormatSelector::String => decode_string,
            FormatSelector::Json => decode_json,
            FormatSelector::Base64 => decode_base64,
            FormatSelector::Hex => decode_hex,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FormatSelector::String => "string",
            FormatSelector::Json => "json",
            FormatSelector::Base64 => "base64",
            FormatSelector::Hex => "hex",
        }
    }
}

impl fmt::Display for FormatSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormatSelector {
    type Err = ConsumerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        FormatSelector::ALL
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                ConsumerError::coded(
                    ErrorCode::UnknownFormat,
                    format!("unknown format selector: {wanted}"),
                )
            })
    }
}

/// 解码后的值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum DecodedValue {
    Text(String),
    Json(serde_json::Value),
    /// 墓碑消息（没有 value）
    Null,
}

impl DecodedValue {
    /// 以文本形式呈现（JSON 输出紧凑格式）
    pub fn render(&self) -> String {
        match self {
            DecodedValue::Text(text) => text.clone(),
            DecodedValue::Json(value) => value.to_string(),
            DecodedValue::Null => String::new(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            DecodedValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// 投递给调用方的记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<String>,
    pub value: DecodedValue,
    pub timestamp: Option<i64>,
}

/// 解码函数签名；失败时返回错误代码和原因
pub type DecodeFn = fn(&[u8]) -> Result<DecodedValue, (ErrorCode, String)>;

fn decode_string(bytes: &[u8]) -> Result<DecodedValue, (ErrorCode, String)> {
    std::str::from_utf8(bytes)
        .map(|text| DecodedValue::Text(text.to_string()))
        .map_err(|e| (ErrorCode::InvalidUtf8, e.to_string()))
}

fn decode_json(bytes: &[u8]) -> Result<DecodedValue, (ErrorCode, String)> {
    serde_json::from_slice(bytes)
        .map(DecodedValue::Json)
        .map_err(|e| (ErrorCode::InvalidJson, e.to_string()))
}

fn decode_base64(bytes: &[u8]) -> Result<DecodedValue, (ErrorCode, String)> {
    Ok(DecodedValue::Text(
        base64::engine::general_purpose::STANDARD.encode(bytes),
    ))
}

fn decode_hex(bytes: &[u8]) -> Result<DecodedValue, (ErrorCode, String)> {
    Ok(DecodedValue::Text(hex::encode(bytes)))
}

/// 解码单条原始记录
///
/// key 按 UTF-8 宽松解码；value 缺失时为墓碑消息，总能解码
pub fn decode_record(
    format: FormatSelector,
    topic: &str,
    raw: &RawRecord,
) -> Result<DecodedRecord, DecodeError> {
    let value = match raw.value.as_deref() {
        Some(bytes) => (format.decoder())(bytes).map_err(|(code, reason)| {
            DecodeError::new(format, raw.partition, raw.offset, code, reason)
        })?,
        None => DecodedValue::Null,
    };

    Ok(DecodedRecord {
        topic: topic.to_string(),
        partition: raw.partition,
        offset: raw.offset,
        key: raw
            .key
            .as_deref()
            .map(|k| String::from_utf8_lossy(k).into_owned()),
        value,
        timestamp: raw.timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Option<&[u8]>) -> RawRecord {
        RawRecord::new(0, 7, Some(b"key-1"), value)
    }

    #[test]
    fn string_format_decodes_utf8() {
        let record = decode_record(FormatSelector::String, "t", &raw(Some("héllo".as_bytes()))).unwrap();
        assert_eq!(record.value, DecodedValue::Text("héllo".to_string()));
        assert_eq!(record.key.as_deref(), Some("key-1"));
        assert_eq!((record.partition, record.offset), (0, 7));
    }

    #[test]
    fn string_format_rejects_invalid_utf8() {
        let err = decode_record(FormatSelector::String, "t", &raw(Some(&[0xff, 0xfe]))).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidUtf8);
        assert_eq!(err.offset, 7);
    }

    #[test]
    fn json_format_parses_documents() {
        let record =
            decode_record(FormatSelector::Json, "t", &raw(Some(br#"{"id":1,"tags":["a"]}"#))).unwrap();
        assert_eq!(record.value, DecodedValue::Json(json!({"id": 1, "tags": ["a"]})));
        assert_eq!(record.value.render(), r#"{"id":1,"tags":["a"]}"#);
    }

    #[test]
    fn json_format_rejects_garbage() {
        let err = decode_record(FormatSelector::Json, "t", &raw(Some(b"{not json"))).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidJson);
        assert_eq!(err.format, FormatSelector::Json);
    }

    #[test]
    fn binary_formats_never_fail() {
        let bytes: &[u8] = &[0x00, 0xff, 0x10];
        let b64 = decode_record(FormatSelector::Base64, "t", &raw(Some(bytes))).unwrap();
        let hex = decode_record(FormatSelector::Hex, "t", &raw(Some(bytes))).unwrap();
        assert_eq!(b64.value.as_text(), Some("AP8Q"));
        assert_eq!(hex.value.as_text(), Some("00ff10"));
    }

    #[test]
    fn tombstones_decode_to_null_for_every_format() {
        for format in FormatSelector::ALL {
            let record = decode_record(format, "t", &raw(None)).unwrap();
            assert_eq!(record.value, DecodedValue::Null);
        }
    }

    #[test]
    fn selectors_parse_case_insensitively() {
        assert_eq!("JSON".parse::<FormatSelector>().unwrap(), FormatSelector::Json);
        assert_eq!(" hex ".parse::<FormatSelector>().unwrap(), FormatSelector::Hex);
        let err = "avro".parse::<FormatSelector>().unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnknownFormat);
    }
}
