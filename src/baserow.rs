//! Fact store adapter for a Baserow-style row API.
//!
//! Rows travel as JSON objects keyed by positional `field_<id>` names.
//! [`FactFields`] carries the table's field ids, and the row ↔
//! [`DistanceFact`] translation below is the only code aware of that
//! external shape. Decimal columns come back as strings; coordinates are
//! written at fixed precision so range filters compare what was stored.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::cache::{DistanceFact, FactId, NewDistanceFact};
use crate::error::StoreError;
use crate::geo::{self, Coordinate, GeoBox};
use crate::polyline;
use crate::traits::FactStore;

/// Page size for list requests; the API caps pages at 200 rows.
const PAGE_SIZE: usize = 200;

#[derive(Debug, Clone)]
pub struct BaserowConfig {
    pub base_url: String,
    pub token: String,
    pub table_id: u64,
    pub timeout_secs: u64,
}

impl BaserowConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, table_id: u64) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            table_id,
            timeout_secs: 10,
        }
    }
}

/// Positional field ids of the distance-fact table.
#[derive(Debug, Clone)]
pub struct FactFields {
    pub origin_address: u64,
    pub origin_lat: u64,
    pub origin_lng: u64,
    pub destination_address: u64,
    pub destination_lat: u64,
    pub destination_lng: u64,
    pub distance_meters: u64,
    pub duration_seconds: u64,
    pub created_at: u64,
    pub last_used_at: u64,
    pub polyline: u64,
}

fn column(id: u64) -> String {
    format!("field_{id}")
}

#[derive(Debug, Clone)]
pub struct BaserowStore {
    config: BaserowConfig,
    fields: FactFields,
    client: reqwest::blocking::Client,
}

impl BaserowStore {
    pub fn new(config: BaserowConfig, fields: FactFields) -> Result<Self, StoreError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| StoreError::http(&err))?;

        Ok(Self {
            config,
            fields,
            client,
        })
    }

    fn rows_url(&self) -> String {
        format!(
            "{}/api/database/rows/table/{}/",
            self.config.base_url, self.config.table_id
        )
    }

    fn row_url(&self, id: FactId) -> String {
        format!("{}{}/", self.rows_url(), id.0)
    }

    fn check(resp: reqwest::blocking::Response) -> Result<reqwest::blocking::Response, StoreError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().unwrap_or_default();
        Err(StoreError::Rejected {
            status: status.as_u16(),
            body,
        })
    }

    fn list_page(&self, query: &[(String, String)], page: usize) -> Result<RowPage, StoreError> {
        let resp = self
            .client
            .get(self.rows_url())
            .header("Authorization", format!("Token {}", self.config.token))
            .query(query)
            .query(&[("size", PAGE_SIZE.to_string()), ("page", page.to_string())])
            .send()
            .map_err(|err| StoreError::http(&err))?;

        Self::check(resp)?
            .json::<RowPage>()
            .map_err(|err| StoreError::http(&err))
    }

    /// Collects row pages until `limit` rows or the last page.
    fn list_all(
        &self,
        query: &[(String, String)],
        limit: usize,
    ) -> Result<Vec<Value>, StoreError> {
        let mut rows = Vec::new();
        let mut page = 1;

        loop {
            let batch = self.list_page(query, page)?;
            let has_next = batch.next.is_some();
            rows.extend(batch.results);
            if rows.len() >= limit || !has_next {
                break;
            }
            page += 1;
        }

        rows.truncate(limit);
        Ok(rows)
    }

    // Row mapping: the only place aware of the external field layout.

    fn fact_from_row(&self, row: &Value) -> Result<DistanceFact, StoreError> {
        let id = row
            .get("id")
            .and_then(Value::as_u64)
            .ok_or_else(|| StoreError::Malformed("row without id".to_string()))?;

        let fields = &self.fields;
        Ok(DistanceFact {
            id: FactId(id),
            origin_address: text(row, fields.origin_address),
            origin: Coordinate::new(
                decimal(row, fields.origin_lat)?,
                decimal(row, fields.origin_lng)?,
            ),
            destination_address: text(row, fields.destination_address),
            destination: Coordinate::new(
                decimal(row, fields.destination_lat)?,
                decimal(row, fields.destination_lng)?,
            ),
            distance_meters: integer(row, fields.distance_meters)?,
            duration_seconds: integer(row, fields.duration_seconds)?,
            created_at: date(row, fields.created_at)?,
            last_used_at: date(row, fields.last_used_at)?,
            polyline: {
                let encoded = text(row, fields.polyline);
                if encoded.is_empty() {
                    None
                } else {
                    Some(polyline::decode(&encoded))
                }
            },
        })
    }

    fn row_payload(&self, fact: &NewDistanceFact) -> Value {
        let fields = &self.fields;
        let mut row = Map::new();
        row.insert(column(fields.origin_address), json!(fact.origin_address));
        row.insert(
            column(fields.origin_lat),
            json!(geo::store_decimal(fact.origin.lat)),
        );
        row.insert(
            column(fields.origin_lng),
            json!(geo::store_decimal(fact.origin.lng)),
        );
        row.insert(
            column(fields.destination_address),
            json!(fact.destination_address),
        );
        row.insert(
            column(fields.destination_lat),
            json!(geo::store_decimal(fact.destination.lat)),
        );
        row.insert(
            column(fields.destination_lng),
            json!(geo::store_decimal(fact.destination.lng)),
        );
        row.insert(column(fields.distance_meters), json!(fact.distance_meters));
        row.insert(
            column(fields.duration_seconds),
            json!(fact.duration_seconds),
        );
        row.insert(column(fields.created_at), json!(fact.created_at.to_rfc3339()));
        row.insert(
            column(fields.last_used_at),
            json!(fact.last_used_at.to_rfc3339()),
        );
        row.insert(
            column(fields.polyline),
            json!(fact
                .polyline
                .as_ref()
                .map(polyline::encode)
                .unwrap_or_default()),
        );
        Value::Object(row)
    }

    fn range_filters(&self, lat_field: u64, lng_field: u64, bounds: GeoBox) -> Vec<(String, String)> {
        vec![
            (
                format!("filter__{}__higher_than_or_equal", column(lat_field)),
                geo::store_decimal(bounds.lat_min),
            ),
            (
                format!("filter__{}__lower_than_or_equal", column(lat_field)),
                geo::store_decimal(bounds.lat_max),
            ),
            (
                format!("filter__{}__higher_than_or_equal", column(lng_field)),
                geo::store_decimal(bounds.lng_min),
            ),
            (
                format!("filter__{}__lower_than_or_equal", column(lng_field)),
                geo::store_decimal(bounds.lng_max),
            ),
        ]
    }
}

impl FactStore for BaserowStore {
    fn find_in_box(
        &self,
        origin: GeoBox,
        destination: GeoBox,
    ) -> Result<Vec<DistanceFact>, StoreError> {
        let mut query = vec![("filter_type".to_string(), "AND".to_string())];
        query.extend(self.range_filters(self.fields.origin_lat, self.fields.origin_lng, origin));
        query.extend(self.range_filters(
            self.fields.destination_lat,
            self.fields.destination_lng,
            destination,
        ));
        query.push((
            "order_by".to_string(),
            format!("-{}", column(self.fields.last_used_at)),
        ));

        self.list_all(&query, PAGE_SIZE)?
            .iter()
            .map(|row| self.fact_from_row(row))
            .collect()
    }

    fn insert(&self, fact: NewDistanceFact) -> Result<DistanceFact, StoreError> {
        let resp = self
            .client
            .post(self.rows_url())
            .header("Authorization", format!("Token {}", self.config.token))
            .json(&self.row_payload(&fact))
            .send()
            .map_err(|err| StoreError::http(&err))?;

        let row = Self::check(resp)?
            .json::<Value>()
            .map_err(|err| StoreError::http(&err))?;
        self.fact_from_row(&row)
    }

    fn touch(&self, id: FactId, at: DateTime<Utc>) -> Result<(), StoreError> {
        let patch = json!({ column(self.fields.last_used_at): at.to_rfc3339() });
        let resp = self
            .client
            .patch(self.row_url(id))
            .header("Authorization", format!("Token {}", self.config.token))
            .json(&patch)
            .send()
            .map_err(|err| StoreError::http(&err))?;

        Self::check(resp).map(|_| ())
    }

    fn delete(&self, id: FactId) -> Result<(), StoreError> {
        let resp = self
            .client
            .delete(self.row_url(id))
            .header("Authorization", format!("Token {}", self.config.token))
            .send()
            .map_err(|err| StoreError::http(&err))?;

        Self::check(resp).map(|_| ())
    }

    fn count(&self) -> Result<u64, StoreError> {
        let page = self.list_page(&[], 1)?;
        Ok(page.count)
    }

    fn find_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<FactId>, StoreError> {
        let query = vec![(
            format!("filter__{}__date_before", column(self.fields.last_used_at)),
            cutoff.to_rfc3339(),
        )];

        let rows = self.list_all(&query, usize::MAX)?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get("id").and_then(Value::as_u64))
            .map(FactId)
            .collect())
    }

    fn oldest(&self, limit: usize) -> Result<Vec<FactId>, StoreError> {
        let query = vec![(
            "order_by".to_string(),
            column(self.fields.last_used_at),
        )];

        let rows = self.list_all(&query, limit)?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get("id").and_then(Value::as_u64))
            .map(FactId)
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct RowPage {
    count: u64,
    next: Option<String>,
    #[serde(default)]
    results: Vec<Value>,
}

fn field<'a>(row: &'a Value, id: u64) -> Option<&'a Value> {
    row.get(column(id))
}

fn text(row: &Value, id: u64) -> String {
    field(row, id)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Decimal columns arrive as JSON strings; tolerate plain numbers too.
fn decimal(row: &Value, id: u64) -> Result<f64, StoreError> {
    let value = field(row, id)
        .ok_or_else(|| StoreError::Malformed(format!("missing field_{id}")))?;
    match value {
        Value::Number(number) => number
            .as_f64()
            .ok_or_else(|| StoreError::Malformed(format!("field_{id} is not a decimal"))),
        Value::String(text) => text
            .parse::<f64>()
            .map_err(|_| StoreError::Malformed(format!("field_{id}: {text:?}"))),
        other => Err(StoreError::Malformed(format!("field_{id}: {other}"))),
    }
}

fn integer(row: &Value, id: u64) -> Result<u32, StoreError> {
    let value = decimal(row, id)?;
    if value < 0.0 || value > f64::from(u32::MAX) {
        return Err(StoreError::Malformed(format!(
            "field_{id} out of range: {value}"
        )));
    }
    Ok(value.round() as u32)
}

fn date(row: &Value, id: u64) -> Result<DateTime<Utc>, StoreError> {
    let text = field(row, id)
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::Malformed(format!("missing field_{id}")))?;
    DateTime::parse_from_rfc3339(text)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| StoreError::Malformed(format!("field_{id}: {text:?}")))
}
