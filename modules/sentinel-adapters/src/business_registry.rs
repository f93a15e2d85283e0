use crate::adapter::SourceAdapter;
use crate::raw_item::RawItem;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sentinel_common::{hex32, SentinelError};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};

/// Danish Central Business Registry adapter — §4.1 "Business-registry adapter".
pub struct BusinessRegistryAdapter {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    search_terms: Vec<String>,
    country: String,
}

impl BusinessRegistryAdapter {
    pub fn new(api_url: String, api_key: Option<String>, search_terms: Vec<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            search_terms,
            country: "dk".to_string(),
        }
    }

    async fn query_one(&self, search_term: &str) -> anyhow::Result<Option<RawItem>> {
        let mut request = self
            .client
            .get(&self.api_url)
            .timeout(Duration::from_secs(20))
            .header("User-Agent", "sentinel-osint/0.1 (contact@example.invalid)")
            .query(&[("search", search_term), ("country", self.country.as_str())]);

        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let data: Value = request.send().await?.error_for_status()?.json().await?;
        Ok(response_to_raw_item(&data, self.name()))
    }
}

#[async_trait]
impl SourceAdapter for BusinessRegistryAdapter {
    fn name(&self) -> &str {
        "cvr"
    }

    async fn fetch(&self) -> Result<Vec<RawItem>, SentinelError> {
        if self.search_terms.is_empty() {
            warn!("cvr adapter has no search_terms configured -- nothing to fetch");
            return Ok(vec![]);
        }

        let mut items = Vec::new();
        for term in &self.search_terms {
            match self.query_one(term).await {
                Ok(Some(item)) => items.push(item),
                Ok(None) => {}
                Err(e) => warn!(term, error = %e, "cvr query failed for search term"),
            }
        }
        info!(count = items.len(), "cvr fetch complete");
        Ok(items)
    }
}

fn response_to_raw_item(data: &Value, adapter_name: &str) -> Option<RawItem> {
    let cvr_number = data
        .get("vat")
        .map(|v| value_to_string(v))
        .unwrap_or_default()
        .trim()
        .to_string();
    let company_name = data
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_string();

    if cvr_number.is_empty() && company_name.is_empty() {
        return None;
    }

    let external_id = hex32(&format!("cvr:{cvr_number}"));

    let directors: Vec<String> = data
        .get("owners")
        .and_then(Value::as_array)
        .map(|owners| {
            owners
                .iter()
                .filter_map(|o| o.get("name").and_then(Value::as_str))
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let address_parts = [
        str_field(data, "address"),
        str_field(data, "zipcode"),
        str_field(data, "city"),
    ];
    let address = address_parts
        .iter()
        .filter(|p| !p.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");

    let industry_description = str_field(data, "industrydesc");
    let industry_code = data.get("industrycode").cloned().unwrap_or(Value::Null);

    let title = if !cvr_number.is_empty() {
        format!("{company_name} (CVR: {cvr_number})")
    } else {
        company_name.clone()
    };

    let start_date = data.get("startdate").and_then(Value::as_str).and_then(parse_cvr_date);

    let mut item = RawItem::new(adapter_name, external_id, title);
    item.summary = Some(format!(
        "Danish company: {company_name}. Industry: {industry_description}."
    ));
    item.authors = directors.clone();
    item.published_at = start_date;
    item.source_url = if cvr_number.is_empty() {
        None
    } else {
        Some(format!("https://datacvr.virk.dk/enhed/virksomhed/{cvr_number}"))
    };
    item.metadata.insert("cvr_number".into(), json!(cvr_number));
    item.metadata.insert("company_name".into(), json!(company_name));
    item.metadata.insert("directors".into(), json!(directors));
    item.metadata.insert("address".into(), json!(address));
    item.metadata.insert("industry_code".into(), industry_code);
    item.metadata
        .insert("industry_description".into(), json!(industry_description));
    item.metadata
        .insert("company_type".into(), json!(str_field(data, "companydesc")));
    item.metadata.insert("email".into(), json!(str_field(data, "email")));
    item.metadata.insert("phone".into(), json!(str_field(data, "phone")));
    item.metadata
        .insert("country".into(), json!(str_field_or(data, "country", "dk")));
    item.metadata.insert("status".into(), json!(str_field(data, "status")));

    Some(item)
}

fn str_field(data: &Value, key: &str) -> String {
    data.get(key).and_then(Value::as_str).unwrap_or("").to_string()
}

fn str_field_or(data: &Value, key: &str, default: &str) -> String {
    data.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .to_string()
}

fn value_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Try three historical CVR date formats in order, per §4.1.
fn parse_cvr_date(date_str: &str) -> Option<DateTime<Utc>> {
    for fmt in ["%d/%m - %Y", "%Y-%m-%d", "%d-%m-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(date_str, fmt) {
            return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_with_neither_vat_nor_name_yields_nothing() {
        let data = json!({});
        assert!(response_to_raw_item(&data, "cvr").is_none());
    }

    #[test]
    fn response_maps_core_fields() {
        let data = json!({
            "vat": "12345678",
            "name": "Acme ApS",
            "owners": [{"name": "Alice Jensen"}],
            "address": "Main St 1",
            "zipcode": "1000",
            "city": "Copenhagen",
            "industrydesc": "Software",
            "startdate": "2020-01-15",
        });
        let item = response_to_raw_item(&data, "cvr").unwrap();
        assert_eq!(item.title, "Acme ApS (CVR: 12345678)");
        assert_eq!(item.authors, vec!["Alice Jensen".to_string()]);
        assert_eq!(
            item.source_url,
            Some("https://datacvr.virk.dk/enhed/virksomhed/12345678".to_string())
        );
        assert!(item.published_at.is_some());
    }

    #[test]
    fn parse_cvr_date_tries_formats_in_order() {
        assert!(parse_cvr_date("15/06 - 2020").is_some());
        assert!(parse_cvr_date("2020-06-15").is_some());
        assert!(parse_cvr_date("15-06-2020").is_some());
        assert!(parse_cvr_date("not a date").is_none());
    }
}
