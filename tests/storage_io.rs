use std::fs;
use tempfile::tempdir;
use wbi_bulk::models::{CodeName, Observation};
use wbi_bulk::{FetchError, PairKey, RequestError, ResultStore, storage};

fn observation(country: &str, indicator: &str, year: i32, value: Option<f64>) -> Observation {
    Observation {
        indicator: CodeName {
            id: indicator.into(),
            value: "Indicator".into(),
        },
        country: CodeName {
            id: country[..2].into(),
            value: "Country".into(),
        },
        countryiso3code: country.into(),
        date: year.to_string(),
        value,
        unit: None,
        obs_status: Some("".into()),
        decimal: Some(0),
    }
}

fn sample_store() -> ResultStore {
    let mut store = ResultStore::new();
    store.insert(
        PairKey::new("DEU", "SP.POP.TOTL"),
        vec![
            observation("DEU", "SP.POP.TOTL", 2020, Some(83_100_000.0)),
            observation("DEU", "SP.POP.TOTL", 2019, None),
        ],
    );
    store.insert(PairKey::new("DEU", "NY.GDP.MKTP.CD"), vec![]);
    store.insert(
        PairKey::new("USA", "SP.POP.TOTL"),
        vec![observation("USA", "SP.POP.TOTL", 2020, Some(331_500_000.0))],
    );
    store
}

#[test]
fn store_round_trips_through_json_with_nulls_and_empty_pairs() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data").join("raw").join("world_bank_data.json");
    let store = sample_store();

    storage::save_json(&store, &path).unwrap();
    let loaded = storage::load_json(&path).unwrap();
    assert_eq!(loaded, store);

    let v: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let obj = v.as_object().unwrap();
    assert_eq!(obj.len(), 3);
    assert!(obj.contains_key("DEU|SP.POP.TOTL"));
    assert!(obj["DEU|SP.POP.TOTL"][1]["value"].is_null());
    assert_eq!(obj["DEU|NY.GDP.MKTP.CD"], serde_json::json!([]));
}

#[test]
fn load_rejects_keys_without_separator() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.json");
    fs::write(&path, r#"{"DEU": []}"#).unwrap();
    assert!(storage::load_json(&path).is_err());
}

#[test]
fn failures_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("failures.json");
    let failures = vec![
        FetchError {
            country: "BRA".into(),
            indicator: "SP.POP.TOTL".into(),
            page: 2,
            attempts: 3,
            cause: RequestError::Status(503),
        },
        FetchError {
            country: "CAN".into(),
            indicator: "XX".into(),
            page: 1,
            attempts: 1,
            cause: RequestError::Api("invalid value".into()),
        },
    ];
    storage::save_failures(&failures, &path).unwrap();
    assert_eq!(storage::load_failures(&path).unwrap(), failures);
}

#[test]
fn csv_has_one_row_per_observation() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rows.csv");
    storage::save_csv(&sample_store(), &path).unwrap();
    let txt = fs::read_to_string(&path).unwrap();
    assert!(txt.starts_with("indicator_id,indicator_name,"));
    assert_eq!(txt.lines().count(), 1 + 3);
}

//a CSV opened in a spreadsheet evaluates cells starting with = + - @ as formulas,
//so text cells are prefixed with a single quote
#[test]
fn csv_cells_are_prefixed_to_avoid_formulas() {
    let mut o = observation("DEU", "=HYPERLINK(\"http://evil\")", 2020, Some(1.0));
    o.indicator.value = "+SUM(A1:A9)".into();
    o.country.value = "@foo".into();
    let mut store = ResultStore::new();
    store.insert(PairKey::new("DEU", "X"), vec![o]);

    let dir = tempdir().unwrap();
    let path = dir.path().join("injection.csv");
    storage::save_csv(&store, &path).unwrap();

    let mut rdr = csv::Reader::from_path(&path).unwrap();
    let headers = rdr.headers().unwrap().clone();
    let row = rdr.records().next().expect("one data row expected").unwrap();
    let cell = |name: &str| {
        let idx = headers.iter().position(|h| h == name).expect("header present");
        row.get(idx).unwrap().to_string()
    };

    assert!(cell("indicator_id").starts_with("'=HYPERLINK"));
    assert!(cell("indicator_name").starts_with("'+SUM"));
    assert!(cell("country_name").starts_with("'@foo"));
    assert_eq!(cell("country_iso3"), "DEU");
    assert_eq!(cell("year"), "2020");
    assert_eq!(cell("date"), "2020");
}

#[test]
fn csv_keeps_non_annual_dates_and_leaves_year_blank() {
    let mut o = observation("AUS", "CPTOTSAXN", 2020, Some(101.5));
    o.date = "2020M01".into();
    let mut store = ResultStore::new();
    store.insert(PairKey::new("AUS", "CPTOTSAXN"), vec![o]);

    let dir = tempdir().unwrap();
    let path = dir.path().join("monthly.csv");
    storage::save_csv(&store, &path).unwrap();

    let mut rdr = csv::Reader::from_path(&path).unwrap();
    let headers = rdr.headers().unwrap().clone();
    let row = rdr.records().next().unwrap().unwrap();
    let col = |name: &str| headers.iter().position(|h| h == name).unwrap();
    assert_eq!(&row[col("date")], "2020M01");
    assert_eq!(&row[col("year")], "");
    assert_eq!(&row[col("value")], "101.5");
}

// xorshift64, so the sample is the same on every run
fn pseudo_random_values(n: usize) -> Vec<f64> {
    let mut x: u64 = 0x9E37_79B9_7F4A_7C15;
    (0..n)
        .map(|i| {
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            let unit = x as f64 / u64::MAX as f64;
            match i % 4 {
                0 => 1e7 * unit,
                1 => 1e-3 * unit,
                2 => 1e15 * (unit - 0.5),
                _ => f64::from_bits(x >> 2), // any positive finite value
            }
        })
        .collect()
}

#[test]
fn values_survive_json_round_trip_bit_for_bit() {
    let rows: Vec<Observation> = pseudo_random_values(20_000)
        .into_iter()
        .enumerate()
        .map(|(i, v)| observation("DEU", "NY.GDP.MKTP.CD", 1960 + (i % 60) as i32, Some(v)))
        .collect();
    let mut store = ResultStore::new();
    store.insert(PairKey::new("DEU", "NY.GDP.MKTP.CD"), rows);

    let dir = tempdir().unwrap();
    let path = dir.path().join("floats.json");
    storage::save_json(&store, &path).unwrap();
    let loaded = storage::load_json(&path).unwrap();

    let before = store.values().flatten().map(|o| o.value.map(f64::to_bits));
    let after = loaded.values().flatten().map(|o| o.value.map(f64::to_bits));
    assert!(before.eq(after));
}
