use anyhow::Context;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use roadcore::detection::{RawDetection, Severity};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

const KM_PER_DEGREE: f64 = 111.32;

const STREETS: [&str; 8] = [
    "Strand",
    "Whitehall",
    "Fleet St",
    "Euston Rd",
    "Kingsway",
    "Piccadilly",
    "Borough High St",
    "Commercial Rd",
];

/// Configuration for generating a synthetic detection feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub count: usize,
    pub center_lat: f64,
    pub center_lng: f64,
    pub spread_km: f64,
    pub seed: u64,
    pub severe_ratio: f64,
    pub moderate_ratio: f64,
    /// Share of entries deliberately broken to exercise load-time rejection.
    pub malformed_ratio: f64,
    pub model: String,
    pub start: String,
    pub interval_minutes: i64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            count: 50,
            center_lat: 51.505,
            center_lng: -0.09,
            spread_km: 5.0,
            seed: 0,
            severe_ratio: 0.3,
            moderate_ratio: 0.4,
            malformed_ratio: 0.0,
            model: "Vision-Detect-v2.1".into(),
            start: "2023-10-25T08:00:00Z".into(),
            interval_minutes: 15,
        }
    }
}

impl GeneratorConfig {
    pub fn with_count(count: usize, seed: u64) -> Self {
        Self {
            count,
            seed,
            ..Default::default()
        }
    }

    fn pick_severity(&self, roll: f64) -> Severity {
        if roll < self.severe_ratio {
            Severity::Severe
        } else if roll < self.severe_ratio + self.moderate_ratio {
            Severity::Moderate
        } else {
            Severity::Minor
        }
    }
}

type SeverityProfile = (RangeInclusive<i64>, &'static str, u32, &'static str);

fn profile_for(severity: Severity) -> SeverityProfile {
    match severity {
        Severity::Severe => (
            85..=99,
            "Deep (>5cm)",
            4,
            "Severe defect. Suspension shock sensor corroborated vision data.",
        ),
        Severity::Moderate => (
            70..=90,
            "Medium (2-5cm)",
            2,
            "Surface irregularity detected. Requires secondary validation.",
        ),
        Severity::Minor => (
            55..=80,
            "Shallow (<2cm)",
            1,
            "Possible surface cracking detected. Single pass confirmation only.",
        ),
    }
}

fn corrupt(entry: &mut RawDetection, rng: &mut StdRng) {
    match rng.gen_range(0..4) {
        0 => entry.severity = Some("unknown".into()),
        1 => entry.lat = Some(123.0),
        2 => entry.confidence = Some(140),
        _ => entry.id = None,
    }
}

pub fn build_feed(config: &GeneratorConfig) -> anyhow::Result<Vec<RawDetection>> {
    let start: DateTime<Utc> = DateTime::parse_from_rfc3339(&config.start)
        .with_context(|| format!("parsing generator start time {}", config.start))?
        .with_timezone(&Utc);

    let mut rng = StdRng::seed_from_u64(config.seed);
    let lat_span = config.spread_km / KM_PER_DEGREE;
    let lng_scale = config.center_lat.to_radians().cos().max(0.01);
    let lng_span = config.spread_km / (KM_PER_DEGREE * lng_scale);
    let mut feed = Vec::with_capacity(config.count);

    for index in 0..config.count {
        let severity = config.pick_severity(rng.gen::<f64>());
        let (confidence, depth, passes, explanation) = profile_for(severity);
        let lat = config.center_lat + rng.gen_range(-1.0..=1.0) * lat_span;
        let lng = config.center_lng + rng.gen_range(-1.0..=1.0) * lng_span;
        let detected_at = start + Duration::minutes(config.interval_minutes * index as i64);
        let street = STREETS[rng.gen_range(0..STREETS.len())];

        let mut entry = RawDetection {
            id: Some(format!("G-{:04}", index + 1)),
            lat: Some(lat),
            lng: Some(lng),
            severity: Some(severity.label().to_string()),
            confidence: Some(rng.gen_range(confidence)),
            detected_at: Some(detected_at.to_rfc3339_opts(SecondsFormat::Secs, true)),
            location: Some(street.to_string()),
            depth_category: Some(depth.to_string()),
            vehicle_speed: Some(rng.gen_range(10..=40)),
            vehicle_count: Some(passes + rng.gen_range(0..=2)),
            model: Some(config.model.clone()),
            snapshot: Some(format!("/potholes/generated_{}.png", index % 4 + 1)),
            explanation: Some(explanation.to_string()),
        };
        if rng.gen_bool(config.malformed_ratio.clamp(0.0, 1.0)) {
            corrupt(&mut entry, &mut rng);
        }
        feed.push(entry);
    }

    Ok(feed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use roadcore::detection::DetectionRecord;

    #[test]
    fn generator_builds_requested_count() {
        let feed = build_feed(&GeneratorConfig::with_count(40, 7)).unwrap();
        assert_eq!(feed.len(), 40);
        assert_eq!(feed[0].id.as_deref(), Some("G-0001"));
        assert_eq!(feed[1].detected_at.as_deref(), Some("2023-10-25T08:15:00Z"));
        assert!(feed
            .into_iter()
            .all(|entry| DetectionRecord::try_from(entry).is_ok()));
    }

    #[test]
    fn same_seed_same_feed() {
        let config = GeneratorConfig::with_count(25, 99);
        assert_eq!(build_feed(&config).unwrap(), build_feed(&config).unwrap());
    }

    #[test]
    fn entries_stay_within_spread() {
        let config = GeneratorConfig {
            spread_km: 2.0,
            ..GeneratorConfig::with_count(100, 3)
        };
        for entry in build_feed(&config).unwrap() {
            let lat = entry.lat.unwrap();
            assert!((lat - config.center_lat).abs() <= 2.0 / KM_PER_DEGREE + 1e-9);
        }
    }

    #[test]
    fn malformed_ratio_one_breaks_everything() {
        let config = GeneratorConfig {
            malformed_ratio: 1.0,
            ..GeneratorConfig::with_count(20, 11)
        };
        assert!(build_feed(&config)
            .unwrap()
            .into_iter()
            .all(|entry| DetectionRecord::try_from(entry).is_err()));
    }

    #[test]
    fn bad_start_time_is_reported() {
        let config = GeneratorConfig {
            start: "soon".into(),
            ..Default::default()
        };
        assert!(build_feed(&config).is_err());
    }
}
