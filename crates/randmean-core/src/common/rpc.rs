//! JSON-RPC 2.0 wire types for random.org's `generateIntegers` method.
//!
//! Only the members the service reads are modelled on the response side;
//! everything else (`bitsUsed`, `requestsLeft`, ...) is ignored.

use crate::types::{MAX_VALUE, MIN_VALUE, RandomSet};
use serde::{Deserialize, Serialize};

pub const JSONRPC_VERSION: &str = "2.0";
pub const GENERATE_INTEGERS: &str = "generateIntegers";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateIntegersRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: GenerateIntegersParams,
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateIntegersParams {
    pub api_key: String,
    pub n: usize,
    pub min: i64,
    pub max: i64,
    pub replacement: bool,
}

impl GenerateIntegersRequest {
    /// Request for `n` integers in `[MIN_VALUE, MAX_VALUE]`, drawn with
    /// replacement.
    pub fn new(api_key: impl Into<String>, n: usize, id: u64) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: GENERATE_INTEGERS.to_string(),
            params: GenerateIntegersParams {
                api_key: api_key.into(),
                n,
                min: MIN_VALUE,
                max: MAX_VALUE,
                replacement: true,
            },
            id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateIntegersResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<GenerateIntegersResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    #[serde(default)]
    pub id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateIntegersResult {
    pub random: RandomData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomData {
    pub data: RandomSet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    #[serde(default)]
    pub code: Option<i64>,
    pub message: String,
}

impl GenerateIntegersResponse {
    pub fn success(data: RandomSet, id: u64) -> Self {
        Self {
            result: Some(GenerateIntegersResult {
                random: RandomData { data },
            }),
            error: None,
            id: Some(id),
        }
    }

    pub fn failure(code: i64, message: impl Into<String>, id: u64) -> Self {
        Self {
            result: None,
            error: Some(RpcError {
                code: Some(code),
                message: message.into(),
            }),
            id: Some(id),
        }
    }
}
