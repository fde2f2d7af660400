// Shared test helpers for reader lifecycle tests.
//
// Provides a line-based fake database, a scripted snapshot source and a
// manually driven clock so refresh behaviour can be tested without network
// access or real MaxMind files.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use geoip_refresh::{
    AsnRecord, CityRecord, Clock, CountryRecord, DatabaseMetadata, GeoDatabase, GeoError,
    GeoResult, SnapshotSource,
};

/// Snapshot prefix used across tests.
#[allow(dead_code)]
pub const PREFIX: &str = "GeoIP2-City.mmdb";

/// Start of every test clock (2023-11-14T22:13:20Z).
#[allow(dead_code)]
pub const T0: u64 = 1_700_000_000;

const HEADER: &str = "FAKEDB";

/// Serializes a fake database: one `ip=country,city` line per entry.
#[allow(dead_code)] // Used by other test files
pub fn fake_db_bytes(build_epoch: u64, entries: &[(&str, &str, &str)]) -> Vec<u8> {
    let mut text = format!("{} build={}\n", HEADER, build_epoch);
    for (ip, country, city) in entries {
        text.push_str(&format!("{}={},{}\n", ip, country, city));
    }
    text.into_bytes()
}

/// Database answering from the lines written by [`fake_db_bytes`].
pub struct FakeDatabase {
    build_epoch: u64,
    entries: HashMap<IpAddr, (String, String)>,
}

impl GeoDatabase for FakeDatabase {
    fn open(path: &Path) -> GeoResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| GeoError::Storage {
            path: path.to_path_buf(),
            source: e,
        })?;
        let invalid = |reason: &str| GeoError::InvalidDatabase {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        let text = String::from_utf8(bytes).map_err(|_| invalid("not utf-8"))?;
        let mut lines = text.lines();
        let build_epoch = lines
            .next()
            .and_then(|header| header.strip_prefix(HEADER))
            .and_then(|rest| rest.trim().strip_prefix("build="))
            .and_then(|epoch| epoch.parse().ok())
            .ok_or_else(|| invalid("missing header"))?;

        let mut entries = HashMap::new();
        for line in lines {
            let (ip, rest) = line.split_once('=').ok_or_else(|| invalid("bad line"))?;
            let (country, city) = rest.split_once(',').ok_or_else(|| invalid("bad line"))?;
            let ip: IpAddr = ip.parse().map_err(|_| invalid("bad address"))?;
            entries.insert(ip, (country.to_string(), city.to_string()));
        }
        Ok(Self {
            build_epoch,
            entries,
        })
    }

    fn city(&self, ip: IpAddr) -> GeoResult<CityRecord> {
        let (country, city) = self.entry(ip)?;
        Ok(CityRecord {
            country_code: Some(country.clone()),
            city: Some(city.clone()),
            ..Default::default()
        })
    }

    fn country(&self, ip: IpAddr) -> GeoResult<CountryRecord> {
        let (country, _) = self.entry(ip)?;
        Ok(CountryRecord {
            country_code: Some(country.clone()),
            country_name: None,
        })
    }

    fn asn(&self, ip: IpAddr) -> GeoResult<AsnRecord> {
        self.entry(ip)?;
        Ok(AsnRecord::default())
    }

    fn metadata(&self) -> DatabaseMetadata {
        DatabaseMetadata {
            database_type: "Fake-City".to_string(),
            build_epoch: self.build_epoch,
            ip_version: 6,
        }
    }
}

impl FakeDatabase {
    fn entry(&self, ip: IpAddr) -> GeoResult<&(String, String)> {
        self.entries.get(&ip).ok_or_else(|| GeoError::Query {
            input: ip.to_string(),
            reason: "address not found in database".to_string(),
        })
    }
}

/// Source replaying scripted responses; the last one repeats forever.
#[allow(dead_code)]
pub struct ScriptedSource {
    responses: Mutex<VecDeque<Result<Vec<u8>, String>>>,
    fetches: Arc<AtomicUsize>,
    delay: Duration,
}

#[allow(dead_code)]
impl ScriptedSource {
    pub fn always(bytes: Vec<u8>) -> Self {
        Self::sequence(vec![Ok(bytes)])
    }

    pub fn sequence(responses: Vec<Result<Vec<u8>, String>>) -> Self {
        assert!(!responses.is_empty(), "script needs at least one response");
        Self {
            responses: Mutex::new(responses.into()),
            fetches: Arc::new(AtomicUsize::new(0)),
            delay: Duration::ZERO,
        }
    }

    /// Makes every fetch take `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Shared fetch counter, readable after the source moved into a reader.
    pub fn fetch_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.fetches)
    }
}

impl SnapshotSource for ScriptedSource {
    async fn fetch(&self) -> GeoResult<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let response = {
            let mut responses = self.responses.lock().expect("script lock poisoned");
            if responses.len() > 1 {
                responses.pop_front()
            } else {
                responses.front().cloned()
            }
        };
        match response {
            Some(Ok(bytes)) => Ok(bytes),
            Some(Err(message)) => Err(GeoError::Fetch(anyhow::anyhow!(message))),
            None => Err(GeoError::Fetch(anyhow::anyhow!("script exhausted"))),
        }
    }

    fn describe(&self) -> String {
        "scripted test source".to_string()
    }
}

/// Clock that only moves when told to.
#[derive(Clone)]
pub struct ManualClock(Arc<AtomicU64>);

#[allow(dead_code)]
impl ManualClock {
    pub fn at(now: u64) -> Self {
        Self(Arc::new(AtomicU64::new(now)))
    }

    pub fn advance(&self, seconds: u64) {
        self.0.fetch_add(seconds, Ordering::SeqCst);
    }

    /// The same clock as the trait object a reader takes.
    pub fn shared(&self) -> Arc<dyn Clock> {
        Arc::new(self.clone())
    }
}

impl Clock for ManualClock {
    fn now_epoch_seconds(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}
