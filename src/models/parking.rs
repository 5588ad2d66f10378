//! 停车场查询参数

use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_VEHICLE_TYPE: &str = "car";
pub const DEFAULT_RADIUS: &str = "5";

/// 查询参数错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("missing lon/lat")]
    MissingCoordinates,
}

/// 经过校验的停车场查询
///
/// 经纬度只要求非空，不做数值范围检查
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParkingQuery {
    pub longitude: String,
    pub latitude: String,
    pub vehicle_type: String,
    pub radius: String,
}

impl ParkingQuery {
    /// 从原始查询字符串解析
    ///
    /// 同名参数取第一次出现的值；`longitude` 优先于 `lon`，`latitude` 优先于 `lat`，
    /// `vehicle_type` 优先于 `type`
    pub fn from_query_string(raw: Option<&str>) -> Result<Self, QueryError> {
        let pairs: Vec<(String, String)> = url::form_urlencoded::parse(raw.unwrap_or("").as_bytes())
            .into_owned()
            .collect();

        let first = |name: &str| {
            pairs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str())
        };
        let pick = |primary: &str, alias: Option<&str>| {
            first(primary)
                .or_else(|| alias.and_then(|a| first(a)))
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };

        let longitude = pick("longitude", Some("lon"));
        let latitude = pick("latitude", Some("lat"));
        if longitude.is_empty() || latitude.is_empty() {
            return Err(QueryError::MissingCoordinates);
        }

        Ok(Self {
            longitude,
            latitude,
            vehicle_type: non_blank_or(pick("vehicle_type", Some("type")), DEFAULT_VEHICLE_TYPE),
            radius: non_blank_or(pick("radius", None), DEFAULT_RADIUS),
        })
    }

    /// 停车场 API 路径：`{base}/{lon}/{lat}/{type}/{radius}`，每段均做百分号编码
    pub fn resource_path(&self, base: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            base.trim_end_matches('/'),
            urlencoding::encode(&self.longitude),
            urlencoding::encode(&self.latitude),
            urlencoding::encode(&self.vehicle_type),
            urlencoding::encode(&self.radius),
        )
    }
}

fn non_blank_or(value: String, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}
