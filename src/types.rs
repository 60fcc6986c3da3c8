use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Top-level content classification of a series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    #[default]
    Dubbed,
    Sub,
}

impl Track {
    pub fn as_str(self) -> &'static str {
        match self {
            Track::Dubbed => "dubbed",
            Track::Sub => "sub",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Track::Dubbed => "Dubbed",
            Track::Sub => "Subtitled",
        }
    }
}

impl FromStr for Track {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dubbed" | "dub" => Ok(Track::Dubbed),
            "sub" | "subbed" => Ok(Track::Sub),
            other => Err(format!("unknown track '{other}' (expected dubbed or sub)")),
        }
    }
}

/// Language variant of a season's manifest.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Hi,
    Ur,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::En, Language::Hi, Language::Ur];

    pub fn as_str(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Hi => "hi",
            Language::Ur => "ur",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Hi => "Hindi",
            Language::Ur => "Urdu",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "hi" => Ok(Language::Hi),
            "ur" => Ok(Language::Ur),
            other => Err(format!("unknown language '{other}' (expected en, hi or ur)")),
        }
    }
}

/// One entry of a season manifest.
///
/// Manifests are written by hand, so every field is read leniently: numbers and
/// booleans become text and values of any other shape are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    #[serde(default, deserialize_with = "deserialize_episode_number")]
    pub ep: String,
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub thumb: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub embed: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub embed2: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub embed3: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub watch3: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub download: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub download2: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub shortlink: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub timestamp: Option<String>,
}

impl EpisodeRecord {
    /// Title to show, falling back to "Episode N".
    pub fn display_title(&self) -> String {
        match non_empty(self.title.as_deref()) {
            Some(title) => title.to_string(),
            None => format!("Episode {}", self.ep),
        }
    }

    pub fn shortlink(&self) -> Option<&str> {
        non_empty(self.shortlink.as_deref())
    }

    /// Player payloads for the inline players, in server order.
    pub fn players(&self) -> Vec<&str> {
        [self.embed.as_deref(), self.embed2.as_deref()]
            .into_iter()
            .filter_map(non_empty)
            .collect()
    }

    pub fn downloads(&self) -> Vec<&str> {
        [self.download.as_deref(), self.download2.as_deref()]
            .into_iter()
            .filter_map(non_empty)
            .collect()
    }

    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        non_empty(self.timestamp.as_deref()).and_then(parse_timestamp)
    }
}

/// Returns the first record whose episode number matches `episode` as a string.
pub fn find_episode<'a>(records: &'a [EpisodeRecord], episode: &str) -> Option<&'a EpisodeRecord> {
    records.iter().find(|record| record.ep == episode)
}

/// A season manifest: any JSON array. Entries that are not objects are dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest(pub Vec<EpisodeRecord>);

impl<'de> Deserialize<'de> for Manifest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries: Vec<Value> = Deserialize::deserialize(deserializer)?;
        let records = entries
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|entry| EpisodeRecord::deserialize(entry).ok())
            .collect();
        Ok(Manifest(records))
    }
}

/// Series description: either a plain string or a localized object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Description {
    Plain(String),
    Localized { en: String },
}

/// Seasons of a series: a count or an explicit list of labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SeasonSpec {
    Count(u32),
    List(Vec<String>),
}

/// One catalogue entry. Only `slug` is required; an unknown track or an
/// unrecognised `seasons` value reads as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesMeta {
    #[serde(deserialize_with = "deserialize_slug")]
    pub slug: String,
    #[serde(default, deserialize_with = "deserialize_text_or_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "deserialize_text_or_empty")]
    pub poster: String,
    #[serde(default, deserialize_with = "deserialize_description")]
    pub desc: Option<Description>,
    #[serde(default, deserialize_with = "deserialize_seasons")]
    pub seasons: Option<SeasonSpec>,
    #[serde(default, deserialize_with = "deserialize_track")]
    pub track: Option<Track>,
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub sub_lang: Option<String>,
}

impl SeriesMeta {
    /// Season labels in tab order. Absent seasons mean a single season "1".
    pub fn seasons(&self) -> Vec<String> {
        match &self.seasons {
            Some(SeasonSpec::Count(count)) => (1..=*count).map(|n| n.to_string()).collect(),
            Some(SeasonSpec::List(labels)) => labels.clone(),
            None => vec![String::from("1")],
        }
    }

    pub fn description(&self) -> &str {
        match &self.desc {
            Some(Description::Plain(text)) => text,
            Some(Description::Localized { en }) => en,
            None => "",
        }
    }
}

/// One entry of the broadcast schedule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub day: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub live: bool,
    #[serde(default)]
    pub countdown: Option<String>,
}

/// Remote switches for episode-card click behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlags {
    #[serde(default)]
    pub shortlink: bool,
    #[serde(default)]
    pub sponsor_popup: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            shortlink: false,
            sponsor_popup: true,
        }
    }
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parses the timestamp formats found in hand-authored manifests.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::<FixedOffset>::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Renders a JSON number the way JavaScript's `String(n)` does for integral values.
fn number_label(n: &serde_json::Number) -> String {
    if let Some(float) = n.as_f64().filter(|_| n.is_f64()) {
        if float.fract() == 0.0 && float.abs() < 1e15 {
            return format!("{}", float as i64);
        }
    }
    n.to_string()
}

/// Scalars as text; arrays, objects and null have none.
fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(number_label(&n)),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn deserialize_episode_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Value = Deserialize::deserialize(deserializer)?;
    Ok(scalar_text(value).unwrap_or_default())
}

fn deserialize_lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Value = Deserialize::deserialize(deserializer)?;
    Ok(scalar_text(value))
}

fn deserialize_text_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_lenient_text(deserializer)?.unwrap_or_default())
}

fn deserialize_slug<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_lenient_text(deserializer)?
        .filter(|slug| !slug.trim().is_empty())
        .ok_or_else(|| D::Error::custom("series entry has no usable slug"))
}

fn deserialize_track<'de, D>(deserializer: D) -> Result<Option<Track>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_lenient_text(deserializer)?.and_then(|raw| raw.parse().ok()))
}

fn deserialize_description<'de, D>(deserializer: D) -> Result<Option<Description>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Value = Deserialize::deserialize(deserializer)?;
    Ok(match value {
        Value::String(text) => Some(Description::Plain(text)),
        Value::Object(mut map) => match map.remove("en") {
            Some(Value::String(en)) => Some(Description::Localized { en }),
            _ => None,
        },
        _ => None,
    })
}

fn deserialize_seasons<'de, D>(deserializer: D) -> Result<Option<SeasonSpec>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Value = Deserialize::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => number_label(&n).parse().ok().map(SeasonSpec::Count),
        Value::Array(labels) => Some(SeasonSpec::List(
            labels.into_iter().filter_map(scalar_text).collect(),
        )),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn episode_numbers_compare_as_strings() {
        let records: Vec<EpisodeRecord> =
            serde_json::from_value(json!([{ "ep": 7 }, { "ep": "8" }, { "ep": 9.0 }])).unwrap();
        assert_eq!(find_episode(&records, "7").map(|r| r.ep.as_str()), Some("7"));
        assert_eq!(find_episode(&records, "8").map(|r| r.ep.as_str()), Some("8"));
        assert_eq!(find_episode(&records, "9").map(|r| r.ep.as_str()), Some("9"));
        assert!(find_episode(&records, "10").is_none());
    }

    #[test]
    fn first_duplicate_wins() {
        let records: Vec<EpisodeRecord> = serde_json::from_value(json!([
            { "ep": 1, "title": "first" },
            { "ep": "1", "title": "second" }
        ]))
        .unwrap();
        let found = find_episode(&records, "1").unwrap();
        assert_eq!(found.title.as_deref(), Some("first"));
    }

    #[test]
    fn record_fields_are_read_leniently() {
        let Manifest(records) = serde_json::from_value(json!([
            { "ep": true, "title": 12, "embed": { "src": "x" }, "download": 3.0 },
            "stray",
            { "ep": null, "timestamp": ["2025-01-01"] }
        ]))
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].ep, "true");
        assert_eq!(records[0].title.as_deref(), Some("12"));
        assert_eq!(records[0].embed, None);
        assert_eq!(records[0].download.as_deref(), Some("3"));
        assert_eq!(records[1].ep, "");
        assert_eq!(records[1].timestamp, None);

        assert!(serde_json::from_value::<Manifest>(json!({ "ep": 1 })).is_err());
    }

    #[test]
    fn display_title_falls_back_to_number() {
        let record = EpisodeRecord {
            ep: String::from("3"),
            title: Some(String::from("  ")),
            ..Default::default()
        };
        assert_eq!(record.display_title(), "Episode 3");
    }

    #[test]
    fn seasons_expand_from_count_list_or_default() {
        let meta: SeriesMeta = serde_json::from_value(json!({
            "slug": "foo", "title": "Foo", "poster": "p.jpg", "seasons": 3, "track": "dubbed"
        }))
        .unwrap();
        assert_eq!(meta.seasons(), vec!["1", "2", "3"]);

        let meta: SeriesMeta = serde_json::from_value(json!({
            "slug": "bar", "title": "Bar", "poster": "p.jpg", "seasons": [1, "2"], "track": "sub",
            "subLang": "en", "desc": { "en": "English text" }
        }))
        .unwrap();
        assert_eq!(meta.seasons(), vec!["1", "2"]);
        assert_eq!(meta.description(), "English text");
        assert_eq!(meta.sub_lang.as_deref(), Some("en"));

        let meta: SeriesMeta =
            serde_json::from_value(json!({ "slug": "baz", "desc": "plain" })).unwrap();
        assert_eq!(meta.seasons(), vec!["1"]);
        assert_eq!(meta.description(), "plain");
    }

    #[test]
    fn timestamps_accept_common_shapes() {
        assert!(parse_timestamp("2025-03-01T10:00:00Z").is_some());
        assert!(parse_timestamp("2025-03-01T10:00:00+05:00").is_some());
        assert!(parse_timestamp("2025-03-01T10:00:00").is_some());
        assert!(parse_timestamp("2025-03-01").is_some());
        assert!(parse_timestamp("next friday").is_none());
    }

    #[test]
    fn feature_flags_default_to_sponsor_popup() {
        let flags = FeatureFlags::default();
        assert!(!flags.shortlink);
        assert!(flags.sponsor_popup);
    }
}
