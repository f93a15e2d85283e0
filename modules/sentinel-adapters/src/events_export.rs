use crate::adapter::SourceAdapter;
use crate::raw_item::RawItem;
use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use sentinel_common::{hex32, SentinelError};
use serde_json::json;
use std::io::Read;
use std::time::Duration;
use tracing::{info, warn};

/// GDELT 2.0 event export column indices (58-column format). Subset of the
/// most useful columns, per §4.1 "Events-export adapter".
const COL_GLOBAL_EVENT_ID: usize = 0;
const COL_DATE: usize = 1;
const COL_ACTOR1_NAME: usize = 6;
const COL_ACTOR1_COUNTRY: usize = 7;
const COL_ACTOR2_NAME: usize = 16;
const COL_ACTOR2_COUNTRY: usize = 17;
const COL_EVENT_ROOT_CODE: usize = 26;
const COL_EVENT_CODE: usize = 27;
const COL_GOLDSTEIN: usize = 30;
const COL_NUM_MENTIONS: usize = 31;
const COL_AVG_TONE: usize = 34;
const COL_ACTION_GEO_FULLNAME: usize = 49;
const COL_ACTION_GEO_LAT: usize = 53;
const COL_ACTION_GEO_LONG: usize = 54;
const COL_SOURCE_URL: usize = 57;

const MIN_COLUMNS: usize = 58;

fn cameo_category(root_code: &str) -> &'static str {
    match root_code {
        "01" => "public_statement",
        "02" => "appeal",
        "03" => "cooperation",
        "04" => "consultation",
        "05" => "diplomacy",
        "06" => "material_cooperation",
        "07" => "aid",
        "08" => "concession",
        "09" => "investigation",
        "10" => "demand",
        "11" => "disapproval",
        "12" => "rejection",
        "13" => "threat",
        "14" => "protest",
        "15" => "force_posture",
        "16" => "reduce_relations",
        "17" => "coercion",
        "18" => "assault",
        "19" => "fight",
        "20" => "mass_violence",
        _ => "unknown",
    }
}

/// Global events dataset adapter — §4.1 "Events-export adapter".
pub struct EventsExportAdapter {
    client: reqwest::Client,
    base_url: String,
    focus_countries: Vec<String>,
}

impl EventsExportAdapter {
    pub fn new(base_url: String, focus_countries: Vec<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            focus_countries,
        }
    }

    async fn latest_export_url(&self) -> anyhow::Result<Option<String>> {
        let manifest_url = format!("{}/lastupdate.txt", self.base_url.trim_end_matches('/'));
        let text = self
            .client
            .get(&manifest_url)
            .timeout(Duration::from_secs(30))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        for line in text.trim().lines() {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() >= 3 && parts[2].ends_with(".export.CSV.zip") {
                return Ok(Some(parts[2].to_string()));
            }
        }
        warn!("lastupdate.txt contained no .export.CSV.zip entry");
        Ok(None)
    }

    async fn download_csv(&self, url: &str) -> anyhow::Result<String> {
        let bytes = self
            .client
            .get(url)
            .timeout(Duration::from_secs(60))
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let cursor = std::io::Cursor::new(bytes);
        let mut archive = zip::ZipArchive::new(cursor)?;
        let name = (0..archive.len())
            .map(|i| archive.by_index(i).map(|f| f.name().to_string()))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .find(|n| n.ends_with(".CSV"))
            .ok_or_else(|| anyhow::anyhow!("export zip had no .CSV entry"))?;

        let mut file = archive.by_name(&name)?;
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        Ok(buf)
    }

    fn parse_rows(csv_text: &str) -> Vec<Vec<String>> {
        csv_text
            .lines()
            .map(|line| line.split('\t').map(|s| s.to_string()).collect())
            .collect()
    }

    fn row_to_raw_item(&self, row: &[String]) -> Option<RawItem> {
        if row.len() < MIN_COLUMNS {
            return None;
        }
        let global_event_id = safe_col(row, COL_GLOBAL_EVENT_ID);
        if global_event_id.is_empty() {
            return None;
        }

        let external_id = hex32(&format!("gdelt:{global_event_id}"));
        let actor1 = safe_col(row, COL_ACTOR1_NAME);
        let actor2 = safe_col(row, COL_ACTOR2_NAME);
        let event_code = safe_col(row, COL_EVENT_CODE);
        let root_code = safe_col(row, COL_EVENT_ROOT_CODE);
        let category = cameo_category(&root_code);
        let source_url = safe_col(row, COL_SOURCE_URL);

        let category_label = category.replace('_', " ");
        let title_parts: Vec<&str> = [actor1.as_str(), category_label.as_str(), actor2.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect();
        let title = if title_parts.is_empty() {
            format!("GDELT event {global_event_id}")
        } else {
            title_parts.join(" -- ")
        };

        let published_at = parse_gdelt_date(&safe_col(row, COL_DATE));
        let goldstein = safe_float(row, COL_GOLDSTEIN);
        let tone = safe_float(row, COL_AVG_TONE);
        let location = safe_col(row, COL_ACTION_GEO_FULLNAME);
        let lat = safe_float(row, COL_ACTION_GEO_LAT);
        let lon = safe_float(row, COL_ACTION_GEO_LONG);
        let actor1_country = safe_col(row, COL_ACTOR1_COUNTRY);
        let actor2_country = safe_col(row, COL_ACTOR2_COUNTRY);

        let actors: Vec<String> = [&actor1, &actor2]
            .into_iter()
            .filter(|s| !s.is_empty())
            .cloned()
            .collect();

        let mut item = RawItem::new(self.name(), external_id, title);
        item.summary = Some(format!("CAMEO {event_code}: {category}"));
        item.authors = actors;
        item.published_at = published_at;
        item.source_url = if source_url.is_empty() { None } else { Some(source_url) };
        item.metadata.insert("gdelt_event_id".into(), json!(global_event_id));
        item.metadata.insert("cameo_code".into(), json!(event_code));
        item.metadata.insert("cameo_root".into(), json!(root_code));
        item.metadata.insert("category".into(), json!(category));
        item.metadata.insert("actor1".into(), json!(actor1));
        item.metadata.insert("actor1_country".into(), json!(actor1_country));
        item.metadata.insert("actor2".into(), json!(actor2));
        item.metadata.insert("actor2_country".into(), json!(actor2_country));
        item.metadata.insert("goldstein_scale".into(), json!(goldstein));
        item.metadata.insert("avg_tone".into(), json!(tone));
        item.metadata
            .insert("num_mentions".into(), json!(safe_int(row, COL_NUM_MENTIONS)));
        item.metadata.insert("location".into(), json!(location));
        item.metadata.insert("latitude".into(), json!(lat));
        item.metadata.insert("longitude".into(), json!(lon));

        let passes_filter = self.focus_countries.is_empty()
            || self.focus_countries.contains(&actor1_country)
            || self.focus_countries.contains(&actor2_country);
        if !passes_filter {
            return None;
        }

        Some(item)
    }
}

#[async_trait]
impl SourceAdapter for EventsExportAdapter {
    fn name(&self) -> &str {
        "gdelt"
    }

    async fn fetch(&self) -> Result<Vec<RawItem>, SentinelError> {
        let url = self
            .latest_export_url()
            .await
            .map_err(|e| SentinelError::Fetch {
                adapter: self.name().to_string(),
                source: e,
            })?;
        let Some(url) = url else {
            return Ok(vec![]);
        };

        let csv_text = self.download_csv(&url).await.map_err(|e| SentinelError::Fetch {
            adapter: self.name().to_string(),
            source: e,
        })?;

        let rows = Self::parse_rows(&csv_text);
        let total = rows.len();
        let items: Vec<RawItem> = rows.iter().filter_map(|row| self.row_to_raw_item(row)).collect();
        info!(total, kept = items.len(), "gdelt fetch complete");
        Ok(items)
    }
}

fn safe_col(row: &[String], idx: usize) -> String {
    row.get(idx).map(|s| s.trim().to_string()).unwrap_or_default()
}

fn safe_float(row: &[String], idx: usize) -> Option<f64> {
    let v = safe_col(row, idx);
    if v.is_empty() {
        None
    } else {
        v.parse().ok()
    }
}

fn safe_int(row: &[String], idx: usize) -> Option<i64> {
    let v = safe_col(row, idx);
    if v.is_empty() {
        None
    } else {
        v.parse().ok()
    }
}

fn parse_gdelt_date(date_str: &str) -> Option<chrono::DateTime<Utc>> {
    if date_str.len() < 8 {
        return None;
    }
    let date = NaiveDate::parse_from_str(&date_str[..8], "%Y%m%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_row(overrides: &[(usize, &str)]) -> Vec<String> {
        let mut row = vec![String::new(); MIN_COLUMNS];
        for (idx, val) in overrides {
            row[*idx] = val.to_string();
        }
        row
    }

    #[test]
    fn row_shorter_than_58_columns_is_dropped() {
        let adapter = EventsExportAdapter::new("http://x".into(), vec![]);
        let row = vec!["1".to_string(); 10];
        assert!(adapter.row_to_raw_item(&row).is_none());
    }

    #[test]
    fn row_with_empty_event_id_is_dropped() {
        let adapter = EventsExportAdapter::new("http://x".into(), vec![]);
        let row = make_row(&[]);
        assert!(adapter.row_to_raw_item(&row).is_none());
    }

    #[test]
    fn unknown_root_code_maps_to_unknown_category() {
        assert_eq!(cameo_category("99"), "unknown");
        assert_eq!(cameo_category("01"), "public_statement");
    }

    #[test]
    fn country_filter_keeps_matching_rows_only() {
        let adapter = EventsExportAdapter::new("http://x".into(), vec!["DA".into(), "US".into()]);
        let keep = make_row(&[
            (COL_GLOBAL_EVENT_ID, "1"),
            (COL_ACTOR1_COUNTRY, "DA"),
            (COL_ACTOR2_COUNTRY, "XX"),
        ]);
        let drop = make_row(&[
            (COL_GLOBAL_EVENT_ID, "2"),
            (COL_ACTOR1_COUNTRY, "ZZ"),
            (COL_ACTOR2_COUNTRY, "YY"),
        ]);
        assert!(adapter.row_to_raw_item(&keep).is_some());
        assert!(adapter.row_to_raw_item(&drop).is_none());
    }

    #[test]
    fn empty_focus_set_keeps_everything() {
        let adapter = EventsExportAdapter::new("http://x".into(), vec![]);
        let row = make_row(&[(COL_GLOBAL_EVENT_ID, "3")]);
        assert!(adapter.row_to_raw_item(&row).is_some());
    }

    #[test]
    fn parse_gdelt_date_parses_yyyymmdd() {
        let dt = parse_gdelt_date("20240115").unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2024-01-15");
    }
}
