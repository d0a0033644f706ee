//! Success envelope shared by every data endpoint

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// `{ success: true, data, ...meta }`; metadata fields sit next to `data`
#[derive(Debug, Serialize)]
pub struct Envelope<T, M = NoMeta> {
    pub success: bool,
    pub data: T,
    #[serde(flatten)]
    pub meta: M,
}

/// Envelope without metadata
#[derive(Debug, Default, Serialize)]
pub struct NoMeta {}

impl<T> Envelope<T, NoMeta> {
    pub fn new(data: T) -> Self {
        Envelope {
            success: true,
            data,
            meta: NoMeta {},
        }
    }
}

impl<T, M> Envelope<T, M> {
    pub fn with_meta(data: T, meta: M) -> Self {
        Envelope {
            success: true,
            data,
            meta,
        }
    }
}

impl<T: Serialize, M: Serialize> IntoResponse for Envelope<T, M> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Meta {
        total_count: i64,
        district: &'static str,
    }

    #[test]
    fn test_meta_is_flattened() {
        let envelope = Envelope::with_meta(vec![1, 2], Meta { total_count: 2, district: "강남구" });
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({ "success": true, "data": [1, 2], "totalCount": 2, "district": "강남구" })
        );
    }

    #[test]
    fn test_without_meta() {
        let envelope = Envelope::new(Vec::<i32>::new());
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({ "success": true, "data": [] })
        );
    }
}
