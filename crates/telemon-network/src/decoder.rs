//! GPB key-value 레코드 디코더.
//!
//! `RecordDecoder` 포트 구현. 텔레메트리 envelope을 prost로 파싱하고
//! 행별 key-value 트리(`keys`/`content` 등 중첩 컨테이너 포함)를
//! 필드 이름 → 값 맵으로 평탄화한다.

use prost::Message;
use std::collections::BTreeMap;
use telemon_core::error::DecodeError;
use telemon_core::models::telemetry::{
    FieldValue, RowEntry, SubscriptionEncoding, TelemetryMessage, TelemetryRecord,
};
use telemon_core::ports::decoder::RecordDecoder;

use crate::proto::telemetry::telemetry_field::ValueByType;
use crate::proto::telemetry::{Telemetry, TelemetryField};

/// GPB key-value 디코더: `RecordDecoder` 포트 구현
#[derive(Debug, Clone, Copy, Default)]
pub struct GpbDecoder;

impl GpbDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl RecordDecoder for GpbDecoder {
    fn decode(&self, message: &TelemetryMessage) -> Result<TelemetryRecord, DecodeError> {
        if message.encoding != SubscriptionEncoding::Gpb {
            return Err(DecodeError::UnsupportedEncoding(message.encoding.to_string()));
        }
        if message.payload.is_empty() {
            return Err(DecodeError::Truncated);
        }

        let envelope = Telemetry::decode(message.payload.as_slice()).map_err(map_prost_error)?;

        if envelope.encoding_path.is_empty() {
            return Err(DecodeError::MissingPath);
        }

        // 컴팩트 행은 모델별 스키마 없이는 필드 이름을 알 수 없다
        let has_compact_rows = envelope
            .data_gpb
            .as_ref()
            .is_some_and(|table| !table.row.is_empty());
        if envelope.data_gpbkv.is_empty() && has_compact_rows {
            return Err(DecodeError::UnsupportedEncoding(
                SubscriptionEncoding::GpbCompact.to_string(),
            ));
        }

        let rows = envelope.data_gpbkv.iter().map(flatten_row).collect();

        // 단위 정규화는 추출 단계에서 한다
        Ok(TelemetryRecord {
            timestamp: envelope.msg_timestamp,
            path: envelope.encoding_path,
            rows,
            node_id: non_empty(envelope.node_id_str),
            subscription_id: non_empty(envelope.subscription_id_str),
        })
    }
}

/// prost 에러 → `DecodeError`
///
/// prost는 에러 종류를 노출하지 않아 메시지 문구("buffer underflow")로 잘림을 판별한다.
/// prost 버전을 올리면 `cut_off_string_is_truncated` 테스트로 문구 변화를 확인할 것.
fn map_prost_error(err: prost::DecodeError) -> DecodeError {
    let description = err.to_string();
    if description.contains("buffer underflow") {
        DecodeError::Truncated
    } else {
        DecodeError::Malformed(description)
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// 행 트리 → 필드 맵
///
/// 같은 이름의 리프가 여러 번 나오면 먼저 나온 값을 유지한다.
fn flatten_row(row: &TelemetryField) -> RowEntry {
    let mut fields = BTreeMap::new();
    collect_leaves(row, &mut fields);
    RowEntry { fields }
}

fn collect_leaves(node: &TelemetryField, out: &mut BTreeMap<String, FieldValue>) {
    if let Some(value) = &node.value_by_type {
        if !node.name.is_empty() {
            out.entry(node.name.clone())
                .or_insert_with(|| convert_value(value));
        }
    }
    for child in &node.fields {
        collect_leaves(child, out);
    }
}

fn convert_value(value: &ValueByType) -> FieldValue {
    match value {
        ValueByType::BytesValue(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => FieldValue::String(text.to_string()),
            Err(_) => FieldValue::String(hex_string(bytes)),
        },
        ValueByType::StringValue(s) => FieldValue::String(s.clone()),
        ValueByType::BoolValue(b) => FieldValue::Boolean(*b),
        ValueByType::Uint32Value(v) => FieldValue::Integer(i64::from(*v)),
        // i64 범위를 넘는 카운터는 정밀도를 잃더라도 실수로 보존
        ValueByType::Uint64Value(v) => match i64::try_from(*v) {
            Ok(v) => FieldValue::Integer(v),
            Err(_) => FieldValue::Float(*v as f64),
        },
        ValueByType::Sint32Value(v) => FieldValue::Integer(i64::from(*v)),
        ValueByType::Sint64Value(v) => FieldValue::Integer(*v),
        ValueByType::DoubleValue(v) => FieldValue::Float(*v),
        ValueByType::FloatValue(v) => FieldValue::Float(f64::from(*v)),
    }
}

fn hex_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// 레코드 → GPB key-value envelope 바이트 (디코더의 역변환)
///
/// 각 행은 `content` 컨테이너 아래 리프로 기록되며 타임스탬프는 나노초 그대로 쓴다.
pub fn encode_record(record: &TelemetryRecord) -> Vec<u8> {
    let rows = record
        .rows
        .iter()
        .map(|row| TelemetryField {
            timestamp: record.timestamp,
            fields: vec![TelemetryField {
                name: "content".to_string(),
                fields: row
                    .fields
                    .iter()
                    .map(|(name, value)| TelemetryField {
                        name: name.clone(),
                        value_by_type: Some(to_wire_value(value)),
                        ..Default::default()
                    })
                    .collect(),
                ..Default::default()
            }],
            ..Default::default()
        })
        .collect();

    let envelope = Telemetry {
        node_id_str: record.node_id.clone().unwrap_or_default(),
        subscription_id_str: record.subscription_id.clone().unwrap_or_default(),
        encoding_path: record.path.clone(),
        msg_timestamp: record.timestamp,
        data_gpbkv: rows,
        ..Default::default()
    };

    envelope.encode_to_vec()
}

fn to_wire_value(value: &FieldValue) -> ValueByType {
    match value {
        FieldValue::Boolean(b) => ValueByType::BoolValue(*b),
        FieldValue::Integer(v) => ValueByType::Sint64Value(*v),
        FieldValue::Float(v) => ValueByType::DoubleValue(*v),
        FieldValue::String(s) => ValueByType::StringValue(s.clone()),
    }
}
