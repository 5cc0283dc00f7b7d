use core::fmt;
use randmean_core::{
    Error, Result,
    types::{MAX_LENGTH, MAX_REQUESTS},
};
use serde::{
    Deserialize, Deserializer,
    de::{self, MapAccess, Unexpected, Visitor},
};

const FIELDS: &[&str] = &["requests", "length"];

/// Query parameters of `GET /random/mean`.
///
/// Decoding rules:
///
/// - Missing or empty parameters are `0` and are then rejected by
///   [`validate`].
/// - A repeated parameter takes its last value.
/// - Unknown parameters and non-integer values fail to decode.
///
/// [`validate`]: MeanQuery::validate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeanQuery {
    pub requests: i64,
    pub length: i64,
}

impl<'de> Deserialize<'de> for MeanQuery {
    fn deserialize<D>(deserializer: D) -> core::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(MeanQueryVisitor)
    }
}

struct MeanQueryVisitor;

impl<'de> Visitor<'de> for MeanQueryVisitor {
    type Value = MeanQuery;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("`requests` and `length` integer parameters")
    }

    fn visit_map<A>(self, mut map: A) -> core::result::Result<MeanQuery, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut requests = None;
        let mut length = None;
        while let Some(key) = map.next_key::<String>()? {
            let slot = match key.as_str() {
                "requests" => &mut requests,
                "length" => &mut length,
                other => return Err(de::Error::unknown_field(other, FIELDS)),
            };
            *slot = Some(map.next_value::<String>()?);
        }

        Ok(MeanQuery {
            requests: parse_integer::<A::Error>(requests.as_deref())?,
            length: parse_integer::<A::Error>(length.as_deref())?,
        })
    }
}

fn parse_integer<E: de::Error>(raw: Option<&str>) -> core::result::Result<i64, E> {
    match raw {
        None | Some("") => Ok(0),
        Some(raw) => raw
            .parse()
            .map_err(|_| E::invalid_value(Unexpected::Str(raw), &"an integer")),
    }
}

/// A validated [`MeanQuery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeanRequest {
    pub requests: usize,
    pub length: usize,
}

impl MeanQuery {
    /// Checks the bounds in a fixed order; the first violation wins.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] describing the violated bound.
    pub fn validate(self) -> Result<MeanRequest> {
        if self.length <= 0 {
            return Err(Error::invalid_request("Length must be greater than 0"));
        }
        if self.length > MAX_LENGTH {
            return Err(Error::invalid_request(format!(
                "Length must be less than or equal {MAX_LENGTH}"
            )));
        }
        if self.requests <= 0 {
            return Err(Error::invalid_request("Requests must be greater than 0"));
        }
        if self.requests > MAX_REQUESTS {
            return Err(Error::invalid_request(format!(
                "Requests must be less than or equal {MAX_REQUESTS}"
            )));
        }

        // Both values are within (0, MAX] here.
        Ok(MeanRequest {
            requests: self.requests as usize,
            length: self.length as usize,
        })
    }
}
