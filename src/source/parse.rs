use bytes::Bytes;
use chrono::{DateTime, FixedOffset, Utc};
use rss::{Channel, Item};

use super::RawItem;

pub fn parse_channel(xml: &Bytes) -> Result<Channel, rss::Error> {
    Channel::read_from(&xml[..])
}

pub fn extract_published_at(item: &Item) -> Option<DateTime<FixedOffset>> {
    if let Some(pub_date) = item.pub_date() {
        if let Ok(dt) = DateTime::parse_from_rfc2822(pub_date.trim()) { return Some(dt); }
    }
    // Attempt Dublin Core date if available (RFC3339)
    if let Some(dc) = item.dublin_core_ext() {
        if let Some(first) = dc.dates().first() {
            if let Ok(dt) = DateTime::parse_from_rfc3339(first.trim()) { return Some(dt); }
        }
    }
    None
}

// Map channel items to RawItems. Entries without a link are dropped since the
// link is the dedup key; undated entries are stamped with `fetched_at`.
pub fn to_raw_items(channel: &Channel, source_name: &str, fetched_at: DateTime<Utc>) -> Vec<RawItem> {
    channel
        .items()
        .iter()
        .filter_map(|item| {
            let link = item.link()?.trim();
            if link.is_empty() { return None; }
            Some(RawItem {
                title: item.title().unwrap_or("").trim().to_string(),
                link: link.to_string(),
                summary: item.description().unwrap_or("").trim().to_string(),
                categories: item.categories().iter().map(|c| c.name().trim().to_string()).collect(),
                published_at: extract_published_at(item).unwrap_or_else(|| fetched_at.fixed_offset()),
                source_name: source_name.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>Example</title>
    <link>https://example.test</link>
    <description>Example feed</description>
    <item>
      <title> Rust 2.0 released </title>
      <link>https://example.test/rust</link>
      <description>&lt;p&gt;Big news&lt;/p&gt;</description>
      <category>Programming</category>
      <category>Rust</category>
      <pubDate>Tue, 10 Jun 2025 15:30:00 +0300</pubDate>
    </item>
    <item>
      <title>Dublin dated</title>
      <link>https://example.test/dc</link>
      <dc:date>2025-06-11T08:00:00Z</dc:date>
    </item>
    <item>
      <title>Undated</title>
      <link>https://example.test/undated</link>
    </item>
    <item>
      <title>No link</title>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn maps_items_and_keeps_source_offset() {
        let channel = parse_channel(&Bytes::from_static(FEED.as_bytes())).unwrap();
        let fetched_at = Utc.with_ymd_and_hms(2025, 6, 12, 0, 0, 0).unwrap();
        let items = to_raw_items(&channel, "example", fetched_at);

        assert_eq!(items.len(), 3);
        let first = &items[0];
        assert_eq!(first.title, "Rust 2.0 released");
        assert_eq!(first.link, "https://example.test/rust");
        assert_eq!(first.summary, "<p>Big news</p>");
        assert_eq!(first.categories, vec!["Programming".to_string(), "Rust".to_string()]);
        assert_eq!(first.published_at.offset().local_minus_utc(), 3 * 3600);
        assert_eq!(first.published_at.with_timezone(&Utc), Utc.with_ymd_and_hms(2025, 6, 10, 12, 30, 0).unwrap());
        assert_eq!(first.source_name, "example");
    }

    #[test]
    fn falls_back_to_dublin_core_then_fetch_time() {
        let channel = parse_channel(&Bytes::from_static(FEED.as_bytes())).unwrap();
        let fetched_at = Utc.with_ymd_and_hms(2025, 6, 12, 0, 0, 0).unwrap();
        let items = to_raw_items(&channel, "example", fetched_at);

        assert_eq!(items[1].published_at.with_timezone(&Utc), Utc.with_ymd_and_hms(2025, 6, 11, 8, 0, 0).unwrap());
        assert_eq!(items[2].published_at.with_timezone(&Utc), fetched_at);
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(parse_channel(&Bytes::from_static(b"<html>not a feed")).is_err());
    }
}
