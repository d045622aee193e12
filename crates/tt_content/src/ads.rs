use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;
use tt_core::Result;

pub const DEFAULT_ADS_PATH: &str = "src/config/ads.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    pub title: String,
    pub url: String,
    pub description: String,
}

impl Banner {
    fn new(title: &str, url: impl Into<String>, description: &str) -> Self {
        Self {
            title: title.to_string(),
            url: url.into(),
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdSlots {
    pub header: Vec<Banner>,
    pub inline: Vec<Banner>,
    pub sidebar: Vec<Banner>,
    pub footer: Vec<Banner>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdsMeta {
    pub generated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdsConfig {
    pub meta: AdsMeta,
    pub slots: AdSlots,
}

/// Builds the banner slots from partner ids in `credentials`.
///
/// Networks without an id are left out; house banners are always present.
pub fn build_ads_config(credentials: &HashMap<String, String>, now: DateTime<Utc>) -> AdsConfig {
    let id = |key: &str| credentials.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());
    let mut slots = AdSlots::default();

    if let Some(aid) = id("BOOKING_AFF_ID") {
        slots.header.push(Banner::new(
            "Booking Deals",
            format!("https://www.booking.com/index.html?aid={}", aid),
            "Travel deals",
        ));
    }
    if let Some(a) = id("HAPPYCOW_ID") {
        slots.inline.push(Banner::new(
            "HappyCow Vegan Finder",
            format!("https://www.happycow.net/?a={}", a),
            "Find vegan options",
        ));
    }
    if let Some(r) = id("LEGALZOOM_ID") {
        slots.sidebar.push(Banner::new(
            "LegalZoom",
            format!("https://www.legalzoom.com/?ref={}", r),
            "LLC and legal help",
        ));
    }
    if let Some(p) = id("ROCKETLAWYER_ID") {
        slots.sidebar.push(Banner::new(
            "Rocket Lawyer",
            format!("https://www.rocketlawyer.com/?partner={}", p),
            "Legal documents",
        ));
    }
    if id("PAYHIP_API_TOKEN").is_some() {
        slots.footer.push(Banner::new("Payhip Store", "https://payhip.com/", "Digital products"));
    }

    slots.header.push(Banner::new("Subscribe to TrendTiers", "/about", "Get new rankings weekly"));
    slots.inline.push(Banner::new(
        "Support us via our affiliate links",
        "/affiliate-disclosure",
        "It helps keep the site free",
    ));
    slots.footer.push(Banner::new("Latest Tier Lists", "/", "See what's new"));

    AdsConfig {
        meta: AdsMeta {
            generated_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        },
        slots,
    }
}

pub async fn write_ads_config(config: &AdsConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json).await?;
    info!("📣 Generated ads config at {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_house_banners_only() {
        let config = build_ads_config(&HashMap::new(), at());
        assert_eq!(config.meta.generated_at, "2025-03-01T12:00:00.000Z");
        assert_eq!(config.slots.header.len(), 1);
        assert_eq!(config.slots.inline.len(), 1);
        assert!(config.slots.sidebar.is_empty());
        assert_eq!(config.slots.footer[0].url, "/");
    }

    #[test]
    fn test_partner_banners() {
        let credentials: HashMap<String, String> = [
            ("BOOKING_AFF_ID", "123"),
            ("LEGALZOOM_ID", "lz"),
            ("ROCKETLAWYER_ID", "rl"),
            ("HAPPYCOW_ID", "  "),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let config = build_ads_config(&credentials, at());

        assert_eq!(config.slots.header[0].url, "https://www.booking.com/index.html?aid=123");
        assert_eq!(config.slots.header[1].title, "Subscribe to TrendTiers");
        assert_eq!(config.slots.sidebar.len(), 2);
        assert_eq!(config.slots.inline.len(), 1);
    }

    #[tokio::test]
    async fn test_write_ads_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config").join("ads.json");
        let config = build_ads_config(&HashMap::new(), at());
        write_ads_config(&config, &path).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"generatedAt\""));
        let parsed: AdsConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
