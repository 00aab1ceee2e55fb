use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::core::constants::platform_types;
use crate::error::{ResolverError, ResolverResult};
use crate::infrastructure::download;
use crate::version::BuildNumber;

/// Release track of a published build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseChannel {
    Release,
    Eap,
    Rc,
    Beta,
}

impl FromStr for ReleaseChannel {
    type Err = ResolverError;

    fn from_str(s: &str) -> ResolverResult<Self> {
        match s.to_lowercase().as_str() {
            "release" => Ok(Self::Release),
            "eap" => Ok(Self::Eap),
            "rc" => Ok(Self::Rc),
            "beta" => Ok(Self::Beta),
            other => Err(ResolverError::parse(other, "unknown release channel")),
        }
    }
}

impl fmt::Display for ReleaseChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Release => "release",
            Self::Eap => "eap",
            Self::Rc => "rc",
            Self::Beta => "beta",
        };
        write!(f, "{name}")
    }
}

/// One published IDE release.
#[derive(Debug, Clone)]
pub struct ReleaseRecord {
    pub product_code: String,
    pub version: String,
    pub build: BuildNumber,
    pub channel: ReleaseChannel,
    pub release_date: Option<NaiveDate>,
}

/// Catalog query. Empty channel/product sets mean "no restriction"; missing
/// bounds are unbounded on that side.
#[derive(Debug, Clone, Default)]
pub struct ReleaseFilter {
    pub since_build: Option<BuildNumber>,
    pub until_build: Option<BuildNumber>,
    pub channels: HashSet<ReleaseChannel>,
    pub products: HashSet<String>,
}

impl ReleaseFilter {
    fn matches(&self, record: &ReleaseRecord) -> bool {
        if !self.channels.is_empty() && !self.channels.contains(&record.channel) {
            return false;
        }
        if !self.products.is_empty() && !self.products.contains(&record.product_code) {
            return false;
        }
        record
            .build
            .is_within(self.since_build.as_ref(), self.until_build.as_ref())
    }
}

// The JetBrains updates feed: <products><product><channel><build/>…

#[derive(Debug, Deserialize, Default)]
struct UpdatesFeed {
    #[serde(default, rename = "product")]
    products: Vec<ProductEntry>,
}

#[derive(Debug, Deserialize, Default)]
struct ProductEntry {
    #[serde(default, rename = "code")]
    codes: Vec<String>,
    #[serde(default, rename = "channel")]
    channels: Vec<ChannelEntry>,
}

#[derive(Debug, Deserialize, Default)]
struct ChannelEntry {
    #[serde(default, rename = "@status")]
    status: Option<String>,
    #[serde(default, rename = "build")]
    builds: Vec<BuildEntry>,
}

#[derive(Debug, Deserialize, Default)]
struct BuildEntry {
    #[serde(default, rename = "@number")]
    number: Option<String>,
    #[serde(default, rename = "@version")]
    version: Option<String>,
    #[serde(default, rename = "@releaseDate")]
    release_date: Option<String>,
}

// The Android Studio releases list: <content><item>…</item></content>

#[derive(Debug, Deserialize, Default)]
struct AndroidStudioFeed {
    #[serde(default, rename = "item")]
    items: Vec<AndroidStudioItem>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct AndroidStudioItem {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    platform_build: Option<String>,
    #[serde(default)]
    build: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

/// Queryable list of published IDE releases, built from remote feeds.
///
/// An unreachable or malformed feed degrades to an empty contribution; the
/// rest of the catalog still builds. Records are deduplicated by (product,
/// build) and held in descending build order, product code breaking ties.
pub struct ReleaseCatalog {
    records: Vec<ReleaseRecord>,
}

impl ReleaseCatalog {
    /// Fetches every feed and builds the catalog.
    pub async fn fetch(client: &Client, feed_urls: &[String]) -> Self {
        let mut documents = Vec::new();
        for url in feed_urls {
            match download::download_to_bytes(client, url).await {
                Ok(bytes) => {
                    documents.push((url.clone(), String::from_utf8_lossy(&bytes).into_owned()))
                }
                Err(err) => warn!(url = %url, %err, "release feed unreachable, skipping"),
            }
        }
        Self::from_documents(&documents)
    }

    /// Builds the catalog from already-fetched feed documents.
    pub fn from_documents(documents: &[(String, String)]) -> Self {
        let mut records = Vec::new();
        for (name, xml) in documents {
            match parse_feed(name, xml) {
                Ok(mut parsed) => {
                    debug!(feed = %name, count = parsed.len(), "parsed release feed");
                    records.append(&mut parsed);
                }
                Err(err) => warn!(feed = %name, %err, "malformed release feed, skipping"),
            }
        }

        let mut seen = HashSet::new();
        records.retain(|record| seen.insert((record.product_code.clone(), record.build.clone())));
        records.sort_by(|a, b| {
            b.build
                .cmp(&a.build)
                .then_with(|| a.product_code.cmp(&b.product_code))
        });
        Self { records }
    }

    /// Lazily iterates the releases matching `filter`, most recent first.
    /// The iterator is restartable; each call walks the catalog afresh.
    pub fn releases<'a>(
        &'a self,
        filter: &'a ReleaseFilter,
    ) -> impl Iterator<Item = &'a ReleaseRecord> + 'a {
        self.records.iter().filter(move |record| filter.matches(record))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Parses one feed document, accepting either schema: the JetBrains
/// `<products>` feed or the Android Studio `<content>` list.
fn parse_feed(name: &str, xml: &str) -> ResolverResult<Vec<ReleaseRecord>> {
    let updates: Result<UpdatesFeed, _> = quick_xml::de::from_str(xml);
    if let Ok(feed) = updates {
        if !feed.products.is_empty() {
            return Ok(updates_records(feed));
        }
    }

    let android: AndroidStudioFeed = quick_xml::de::from_str(xml)
        .map_err(|e| ResolverError::xml(name, e.to_string()))?;
    if android.items.is_empty() {
        return Err(ResolverError::xml(name, "no recognizable release entries"));
    }
    Ok(android_records(android))
}

fn updates_records(feed: UpdatesFeed) -> Vec<ReleaseRecord> {
    let mut records = Vec::new();
    for product in feed.products {
        let Some(code) = product.codes.first().cloned() else {
            continue;
        };
        for channel in &product.channels {
            let Some(channel_kind) = channel
                .status
                .as_deref()
                .and_then(|status| status.parse::<ReleaseChannel>().ok())
            else {
                continue;
            };
            for build in &channel.builds {
                let Some(number) = build.number.as_deref() else {
                    continue;
                };
                let Ok(parsed) = BuildNumber::parse(number) else {
                    debug!(number, "skipping unparseable build number");
                    continue;
                };
                records.push(ReleaseRecord {
                    product_code: code.clone(),
                    version: build.version.clone().unwrap_or_else(|| number.to_string()),
                    build: parsed.or_product_code(&code),
                    channel: channel_kind,
                    release_date: build
                        .release_date
                        .as_deref()
                        .and_then(|date| NaiveDate::parse_from_str(date, "%Y%m%d").ok()),
                });
            }
        }
    }
    records
}

fn android_records(feed: AndroidStudioFeed) -> Vec<ReleaseRecord> {
    let mut records = Vec::new();
    for item in feed.items {
        let Some(number) = item.platform_build.or(item.build) else {
            continue;
        };
        let Ok(parsed) = BuildNumber::parse(&number) else {
            debug!(number = %number, "skipping unparseable build number");
            continue;
        };
        let channel = match item.channel.as_deref().map(str::to_lowercase).as_deref() {
            Some("release") => ReleaseChannel::Release,
            Some("rc") => ReleaseChannel::Rc,
            Some("beta") => ReleaseChannel::Beta,
            Some("canary") | Some("preview") => ReleaseChannel::Eap,
            _ => continue,
        };
        records.push(ReleaseRecord {
            product_code: platform_types::ANDROID_STUDIO.to_string(),
            version: item.version.unwrap_or_else(|| number.clone()),
            build: parsed.or_product_code(platform_types::ANDROID_STUDIO),
            channel,
            release_date: item
                .date
                .as_deref()
                .and_then(|date| NaiveDate::parse_from_str(date, "%B %d, %Y").ok()),
        });
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    const UPDATES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<products>
  <product name="IntelliJ IDEA">
    <code>IU</code>
    <code>IIU</code>
    <channel id="IJ-RELEASE" status="release" licensing="release">
      <build number="213.6777.52" version="2021.3.2" releaseDate="20220125"/>
      <build number="212.5712.43" version="2021.2.4"/>
    </channel>
    <channel id="IJ-EAP" status="eap" licensing="eap">
      <build number="221.3427.89" version="2022.1 EAP"/>
    </channel>
  </product>
  <product name="PhpStorm">
    <code>PS</code>
    <channel id="PS-RELEASE" status="release" licensing="release">
      <build number="213.6777.58" version="2021.3.2"/>
    </channel>
  </product>
</products>"#;

    const ANDROID_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<content>
  <item>
    <name>Android Studio Chipmunk (2021.2.1) Beta 4</name>
    <build>2021.2.1.10</build>
    <version>2021.2.1 Beta 4</version>
    <channel>Beta</channel>
    <platformBuild>212.5712.43</platformBuild>
    <date>February 10, 2022</date>
  </item>
  <item>
    <name>Android Studio Bumblebee (2021.1.1)</name>
    <build>2021.1.1.22</build>
    <version>2021.1.1</version>
    <channel>Release</channel>
    <platformBuild>211.7628.21</platformBuild>
  </item>
</content>"#;

    fn docs(entries: &[(&str, &str)]) -> Vec<(String, String)> {
        entries
            .iter()
            .map(|(name, xml)| (name.to_string(), xml.to_string()))
            .collect()
    }

    #[test]
    fn parses_both_feed_schemas() {
        let catalog = ReleaseCatalog::from_documents(&docs(&[
            ("updates.xml", UPDATES_XML),
            ("android.xml", ANDROID_XML),
        ]));
        assert_eq!(catalog.len(), 6);
    }

    #[test]
    fn records_are_ordered_descending_with_product_tiebreak() {
        let catalog = ReleaseCatalog::from_documents(&docs(&[
            ("updates.xml", UPDATES_XML),
            ("android.xml", ANDROID_XML),
        ]));
        let all = ReleaseFilter::default();
        let builds: Vec<String> = catalog.releases(&all).map(|r| r.build.to_string()).collect();
        assert_eq!(
            builds,
            vec![
                "IU-221.3427.89",
                "PS-213.6777.58",
                "IU-213.6777.52",
                "AI-212.5712.43",
                "IU-212.5712.43",
                "AI-211.7628.21",
            ]
        );
    }

    #[test]
    fn filters_by_channel_and_range() {
        let catalog = ReleaseCatalog::from_documents(&docs(&[("updates.xml", UPDATES_XML)]));
        let filter = ReleaseFilter {
            since_build: Some(BuildNumber::parse("213.0").unwrap()),
            until_build: Some(BuildNumber::parse("213.*").unwrap()),
            channels: [ReleaseChannel::Release].into_iter().collect(),
            products: HashSet::new(),
        };
        let matched: Vec<&ReleaseRecord> = catalog.releases(&filter).collect();
        assert_eq!(matched.len(), 2);
        assert!(matched.iter().all(|r| r.channel == ReleaseChannel::Release));
        assert!(matched.iter().all(|r| r.build.baseline_version() == 213));
    }

    #[test]
    fn filters_by_product() {
        let catalog = ReleaseCatalog::from_documents(&docs(&[("updates.xml", UPDATES_XML)]));
        let filter = ReleaseFilter {
            products: ["PS".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let matched: Vec<&ReleaseRecord> = catalog.releases(&filter).collect();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].version, "2021.3.2");
    }

    #[test]
    fn malformed_feed_degrades_without_losing_others() {
        let catalog = ReleaseCatalog::from_documents(&docs(&[
            ("broken.xml", "<products><product>"),
            ("updates.xml", UPDATES_XML),
        ]));
        assert_eq!(catalog.len(), 4);
    }

    #[test]
    fn early_termination_does_not_consume_the_catalog() {
        let catalog = ReleaseCatalog::from_documents(&docs(&[("updates.xml", UPDATES_XML)]));
        let all = ReleaseFilter::default();
        let first = catalog.releases(&all).next().unwrap().build.to_string();
        let again = catalog.releases(&all).next().unwrap().build.to_string();
        assert_eq!(first, again);
    }

    #[test]
    fn release_dates_are_parsed() {
        let catalog = ReleaseCatalog::from_documents(&docs(&[("updates.xml", UPDATES_XML)]));
        let all = ReleaseFilter::default();
        let dated = catalog
            .releases(&all)
            .find(|r| r.build.to_string() == "IU-213.6777.52")
            .unwrap();
        assert_eq!(
            dated.release_date,
            Some(NaiveDate::from_ymd_opt(2022, 1, 25).unwrap())
        );
    }
}
