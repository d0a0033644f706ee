//! Request builder - assemble upstream URLs with credentials, paging and filters

use crate::upstream::types::UpstreamError;
use reqwest::Url;

/// Comparison operators of the odcloud `cond[FIELD::OP]=value` filter convention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondOp {
    Eq,
    Like,
    Gte,
    Lte,
}

impl CondOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CondOp::Eq => "EQ",
            CondOp::Like => "LIKE",
            CondOp::Gte => "GTE",
            CondOp::Lte => "LTE",
        }
    }
}

/// One outbound GET against an upstream API
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    base: String,
    path: String,
    params: Vec<(String, String)>,
}

impl UpstreamRequest {
    pub fn new(base: &str, path: &str) -> Self {
        UpstreamRequest {
            base: base.trim_end_matches('/').to_string(),
            path: path.trim_start_matches('/').to_string(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.push((key.to_string(), value.into()));
        self
    }

    /// Add `key=value` only when `value` is non-empty
    pub fn param_if(self, key: &str, value: &str) -> Self {
        if value.is_empty() {
            self
        } else {
            self.param(key, value)
        }
    }

    /// Add an odcloud filter condition; empty values are skipped
    pub fn cond(self, field: &str, op: CondOp, value: &str) -> Self {
        let key = format!("cond[{}::{}]", field, op.as_str());
        self.param_if(&key, value)
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn build(&self) -> Result<Url, UpstreamError> {
        let raw = format!("{}/{}", self.base, self.path);
        let mut url = Url::parse(&raw).map_err(|e| UpstreamError::Url(format!("{}: {}", raw, e)))?;

        if !self.params.is_empty() {
            url.query_pairs_mut().extend_pairs(
                self.params
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.as_str())),
            );
        }

        Ok(url)
    }
}

/// URL with credential parameters masked, for logs
pub fn redacted(url: &Url) -> String {
    let mut masked = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            let value = if key == "serviceKey" || key == "KEY" {
                "***".to_string()
            } else {
                value.into_owned()
            };
            (key.into_owned(), value)
        })
        .collect();

    if pairs.is_empty() {
        return masked.to_string();
    }

    masked.query_pairs_mut().clear().extend_pairs(pairs);
    masked.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query_value(url: &Url, key: &str) -> Option<String> {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn test_build_joins_base_and_path() {
        let url = UpstreamRequest::new("https://apis.data.go.kr/", "/1613000/Svc/getItems")
            .param("serviceKey", "secret")
            .param("pageNo", "1")
            .build()
            .unwrap();

        assert_eq!(url.path(), "/1613000/Svc/getItems");
        assert_eq!(query_value(&url, "pageNo").as_deref(), Some("1"));
        assert_eq!(query_value(&url, "serviceKey").as_deref(), Some("secret"));
    }

    #[test]
    fn test_cond_convention() {
        let url = UpstreamRequest::new("https://api.odcloud.kr/api", "LfrMasterSvc/v1/getLfrMicro")
            .cond("YM", CondOp::Eq, "202401")
            .cond("REG", CondOp::Eq, "")
            .cond("ADRES", CondOp::Like, "강남")
            .build()
            .unwrap();

        assert_eq!(query_value(&url, "cond[YM::EQ]").as_deref(), Some("202401"));
        assert_eq!(query_value(&url, "cond[REG::EQ]"), None);
        assert_eq!(query_value(&url, "cond[ADRES::LIKE]").as_deref(), Some("강남"));
    }

    #[test]
    fn test_param_if_skips_empty() {
        let request = UpstreamRequest::new("http://localhost", "x")
            .param_if("sidoNm", "")
            .param_if("houseTy", "APT");
        assert_eq!(request.params().len(), 1);
    }

    #[test]
    fn test_invalid_base_url() {
        let result = UpstreamRequest::new("not a url", "x").build();
        assert!(matches!(result, Err(UpstreamError::Url(_))));
    }

    #[test]
    fn test_redacted_masks_keys() {
        let url = UpstreamRequest::new("http://localhost", "x")
            .param("serviceKey", "secret")
            .param("KEY", "other")
            .param("pageNo", "1")
            .build()
            .unwrap();

        let logged = redacted(&url);
        assert!(!logged.contains("secret"));
        assert!(!logged.contains("other"));
        assert!(logged.contains("pageNo=1"));
    }
}
