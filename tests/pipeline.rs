//! End-to-end decoding of generated receiver lines

use chrono::{DateTime, Utc};
use tempfile::TempDir;
use weather_bridge::config::StorageConfig;
use weather_bridge::error::Result;
use weather_bridge::radio::encoder::{capture_bits, encode_line, seal_payload};
use weather_bridge::radio::protocol::{Protocol, SensorReading};
use weather_bridge::station::{publish, Station};
use weather_bridge::storage::jsonl::JsonlStore;
use weather_bridge::storage::Collaborators;

#[derive(Default)]
struct Recorder {
    persisted: Vec<(DateTime<Utc>, SensorReading)>,
    scheduled: usize,
    live: Vec<SensorReading>,
}

impl Collaborators for Recorder {
    fn persist(&mut self, timestamp: DateTime<Utc>, record: &SensorReading) -> Result<()> {
        self.persisted.push((timestamp, *record));
        Ok(())
    }

    fn run_scheduled_tasks(&mut self) -> Result<()> {
        self.scheduled += 1;
        Ok(())
    }

    fn notify_live(&mut self, record: &SensorReading) -> Result<()> {
        self.live.push(*record);
        Ok(())
    }
}

/// 21.0 °C and 55 % indoors, 1013.0 hPa, 123.4 mm rain
fn base_station_line() -> String {
    let mut data = vec![0u8; 36];
    data[0] = 0xE1;
    data[1] = 0x20;
    data[3] = 34;
    data[4] = 71;
    data[5] = 0x0E;
    data[20] = 0x04;
    data[21] = 0xD2;
    data[24] = 0x45;
    data[25] = 0x46;
    data[26] = 80;
    data[27] = 0x4A;
    data[28] = 55;
    data[29] = 0x27;
    data[30] = 0x92;
    data[31] = 0x27;
    data[32] = 0xB0;
    data[33] = 0xFF;
    data[34] = 0xFA;
    data[35] = 0xFA;
    encode_line(&capture_bits(Protocol::BaseStation, &seal_payload(&data)))
}

/// 10.0 °C and 70 % outdoors, 250 lux, uv 3
fn outdoor_cluster_line() -> String {
    let data = [0xC5, 0x00, 0x1E, 0x2D, 180, 0x00, 0x64, 0x03, 0x84, 70, 0x00, 0xFA, 3];
    encode_line(&capture_bits(Protocol::OutdoorCluster, &seal_payload(&data)))
}

fn feed(station: &mut Station, collaborators: &mut dyn Collaborators, lines: &[String]) -> usize {
    let mut emitted = 0;
    for line in lines {
        if let Some(reading) = station.process_line(Some(line.as_str())) {
            publish(&reading, collaborators);
            emitted += 1;
        }
    }
    emitted
}

#[test]
fn test_base_then_outdoor_produces_composite() {
    let mut station = Station::default();
    let mut recorder = Recorder::default();

    let lines = vec![
        "Manchester receiver v1.2".to_string(),
        base_station_line(),
        outdoor_cluster_line(),
    ];
    assert_eq!(feed(&mut station, &mut recorder, &lines), 1);

    let (timestamp, record) = recorder.persisted[0];
    assert_eq!(timestamp.timestamp_subsec_nanos(), 0);
    assert_eq!(record.temp_in, Some(21.0));
    assert_eq!(record.hum_in, Some(55.0));
    assert!((record.abs_pressure.unwrap() - 1013.0).abs() < 1e-6);
    assert!((record.rain.unwrap() - 123.4).abs() < 1e-6);
    assert_eq!(record.temp_out, Some(10.0));
    assert_eq!(record.hum_out, Some(70.0));
    assert_eq!(record.illuminance, Some(250.0));
    assert_eq!(record.uv, Some(3.0));
    assert!((record.wind_gust.unwrap() - 4.5).abs() < 1e-6);
    assert_eq!(record.wind_dir, Some(8));

    assert_eq!(recorder.scheduled, 1);
    assert_eq!(recorder.live, vec![record]);
}

#[test]
fn test_outdoor_first_is_dropped() {
    let mut station = Station::default();
    let mut recorder = Recorder::default();

    assert_eq!(feed(&mut station, &mut recorder, &[outdoor_cluster_line()]), 0);
    assert!(station.merger().snapshot().is_none());
    assert!(recorder.persisted.is_empty());
}

#[test]
fn test_base_station_alone_emits_nothing() {
    let mut station = Station::default();
    let mut recorder = Recorder::default();

    let lines = vec![base_station_line(), base_station_line()];
    assert_eq!(feed(&mut station, &mut recorder, &lines), 0);
    assert!(station.merger().snapshot().is_some());
}

#[test]
fn test_malformed_lines_do_not_disturb_cache() {
    let mut station = Station::default();
    let mut recorder = Recorder::default();

    let mut corrupted = base_station_line();
    corrupted.replace_range(corrupted.len() - 2.., "00");

    let lines = vec![
        "garbage".to_string(),
        "0010 FFFF".to_string(),
        "0010 FFF 00".to_string(),
        corrupted,
        outdoor_cluster_line(),
    ];
    assert_eq!(feed(&mut station, &mut recorder, &lines), 0);
    assert!(station.merger().snapshot().is_none());
    assert_eq!(station.lines_seen(), 5);
}

#[test]
fn test_each_outdoor_reading_reuses_snapshot() {
    let mut station = Station::default();
    let mut recorder = Recorder::default();

    let lines = vec![
        base_station_line(),
        outdoor_cluster_line(),
        outdoor_cluster_line(),
    ];
    assert_eq!(feed(&mut station, &mut recorder, &lines), 2);
    assert_eq!(recorder.persisted[0].1, recorder.persisted[1].1);
    assert_eq!(station.records_emitted(), 2);
}

#[test]
fn test_readings_land_in_jsonl_store() {
    let dir = TempDir::new().unwrap();
    let config = StorageConfig {
        data_dir: dir.path().to_string_lossy().into_owned(),
        ..StorageConfig::default()
    };
    let mut store = JsonlStore::open(&config).unwrap();
    let mut station = Station::default();

    let lines = vec![base_station_line(), outdoor_cluster_line()];
    assert_eq!(feed(&mut station, &mut store, &lines), 1);

    let files = store.files().unwrap();
    assert_eq!(files.len(), 1);
    let stored: serde_json::Value =
        serde_json::from_str(std::fs::read_to_string(&files[0]).unwrap().trim()).unwrap();
    assert_eq!(stored["hum_in"], 55.0);
    assert_eq!(stored["temp_out"], 10.0);

    let live: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("live.json")).unwrap())
            .unwrap();
    assert_eq!(live["uv"], 3.0);
}
