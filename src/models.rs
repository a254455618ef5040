use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Which catalog endpoint to enumerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogKind {
    Country,
    Indicator,
}

impl CatalogKind {
    /// Path segment under the API base URL.
    pub fn path(&self) -> &'static str {
        match *self {
            CatalogKind::Country => "country",
            CatalogKind::Indicator => "indicator",
        }
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Metadata section returned by the API (position 0).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meta {
    #[serde(deserialize_with = "de_u32_from_string_or_number")]
    pub page: u32,
    #[serde(deserialize_with = "de_u32_from_string_or_number")]
    pub pages: u32,
    /// Some responses encode `per_page` as a string, others as a number.
    /// Accept both and normalize to `u32`.
    #[serde(default, deserialize_with = "de_u32_from_string_or_number")]
    pub per_page: u32,
    #[serde(default, deserialize_with = "de_u32_from_string_or_number")]
    pub total: u32,
}

/// Serde helper: parse `u32` from either a JSON number or a string.
fn de_u32_from_string_or_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    struct U32Visitor;

    impl<'de> Visitor<'de> for U32Visitor {
        type Value = u32;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a string or integer representing a non-negative number")
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            u32::try_from(v).map_err(E::custom)
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("negative value for u32"));
            }
            u32::try_from(v).map_err(E::custom)
        }

        fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            s.trim().parse::<u32>().map_err(E::custom)
        }
    }

    deserializer.deserialize_any(U32Visitor)
}

/// One decoded API page: pagination metadata plus its payload rows.
#[derive(Debug, Clone)]
pub struct PageEnvelope<T> {
    pub meta: Meta,
    pub items: Vec<T>,
}

/// `{ "id": ..., "value": ... }` pair the API uses for country and indicator references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeName {
    pub id: String,
    #[serde(default)]
    pub value: String,
}

/// Catalog row. Only the code is kept; names, regions etc. are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
}

/// Raw observation row from the API (position 1 array).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub indicator: CodeName,
    pub country: CodeName,
    #[serde(default)]
    pub countryiso3code: String,
    pub date: String,
    pub value: Option<f64>,
    pub unit: Option<String>,
    #[serde(rename = "obs_status")]
    pub obs_status: Option<String>,
    pub decimal: Option<i32>,
}

impl Observation {
    /// Year of the observation, if `date` is a plain year.
    pub fn year(&self) -> Option<i32> {
        self.date.trim().parse::<i32>().ok()
    }
}

/// Tidy structure used for CSV export (one row = one observation).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataPoint {
    pub indicator_id: String,
    pub indicator_name: String,
    pub country_id: String, // typically ISO2
    pub country_name: String,
    pub country_iso3: String,
    /// Raw API date: `2020`, `2020M01`, `2020Q1`.
    pub date: String,
    /// Set only when `date` is a plain year.
    pub year: Option<i32>,
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub obs_status: Option<String>,
    pub decimal: Option<i32>,
}

impl From<Observation> for DataPoint {
    fn from(o: Observation) -> Self {
        let year = o.year();
        Self {
            indicator_id: o.indicator.id,
            indicator_name: o.indicator.value,
            country_id: o.country.id,
            country_name: o.country.value,
            country_iso3: o.countryiso3code,
            date: o.date,
            year,
            value: o.value,
            unit: o.unit,
            obs_status: o.obs_status,
            decimal: o.decimal,
        }
    }
}

/// One unit of work: a (country, indicator) pair.
///
/// Serializes as `"COUNTRY|INDICATOR"` so it can key a JSON object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairKey {
    pub country: String,
    pub indicator: String,
}

impl PairKey {
    pub const SEPARATOR: char = '|';

    pub fn new(country: impl Into<String>, indicator: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            indicator: indicator.into(),
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.country, Self::SEPARATOR, self.indicator)
    }
}

impl FromStr for PairKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(Self::SEPARATOR) {
            Some((c, i)) if !c.is_empty() && !i.is_empty() => Ok(PairKey::new(c, i)),
            _ => Err(format!(
                "invalid pair key {:?}, expected COUNTRY{}INDICATOR",
                s,
                Self::SEPARATOR
            )),
        }
    }
}

impl Serialize for PairKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PairKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Downloaded observations per pair. Ordered by key, so output is reproducible.
pub type ResultStore = BTreeMap<PairKey, Vec<Observation>>;
