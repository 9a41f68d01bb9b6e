#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sea_orm::Database;
use session_locator::migration::{Migrator, MigratorTrait};
use session_locator::{
    Clock, GeoLookup, FraudSignal, Location, Lookup, Reconciler, SeaOrmStore, VpnSignal,
};
use time::OffsetDateTime;

pub async fn store() -> SeaOrmStore {
    let conn = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&conn, None).await.unwrap();
    SeaOrmStore::new(conn)
}

/// Geolocation double answering with a configurable city.
pub struct FakeGeo {
    pub calls: AtomicUsize,
    city: Mutex<String>,
}

impl FakeGeo {
    pub fn new(city: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            city: Mutex::new(city.to_string()),
        })
    }

    pub fn set_city(&self, city: &str) {
        *self.city.lock().unwrap() = city.to_string();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GeoLookup for FakeGeo {
    async fn locate(&self, ip: &str) -> Lookup<Location> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Lookup::Confirmed(Location {
            ip: ip.to_string(),
            country: "Germany".to_string(),
            city: self.city.lock().unwrap().clone(),
            latitude: Some(52.52),
            longitude: Some(13.405),
            isp: "Example ISP".to_string(),
            timezone: Some("Europe/Berlin".to_string()),
        })
    }
}

/// Fraud signal double whose VPN verdict can be flipped between calls.
pub struct FakeFraud {
    pub calls: AtomicUsize,
    vpn: Mutex<Option<String>>,
}

impl FakeFraud {
    pub fn clean() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            vpn: Mutex::new(None),
        })
    }

    pub fn behind(provider: &str) -> Arc<Self> {
        let fraud = Self::clean();
        fraud.connect(provider);
        fraud
    }

    pub fn connect(&self, provider: &str) {
        *self.vpn.lock().unwrap() = Some(provider.to_string());
    }

    pub fn disconnect(&self) {
        *self.vpn.lock().unwrap() = None;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FraudSignal for FakeFraud {
    async fn assess(&self, _ip: &str) -> Lookup<VpnSignal> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let signal = match self.vpn.lock().unwrap().clone() {
            Some(provider) => VpnSignal {
                is_vpn: true,
                is_proxy: false,
                is_tor: false,
                provider: Some(provider),
                fraud_score: 85,
                confidence: 50,
            },
            None => VpnSignal::clean(),
        };
        Lookup::Confirmed(signal)
    }
}

/// Clock advancing one second per reading, starting at a fixed instant.
pub struct StepClock {
    seconds: AtomicI64,
}

impl StepClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            seconds: AtomicI64::new(1_700_000_000),
        })
    }
}

impl Clock for StepClock {
    fn now(&self) -> OffsetDateTime {
        let seconds = self.seconds.fetch_add(1, Ordering::SeqCst);
        OffsetDateTime::from_unix_timestamp(seconds).unwrap()
    }
}

pub struct Harness {
    pub reconciler: Reconciler<SeaOrmStore>,
    pub geo: Arc<FakeGeo>,
    pub fraud: Arc<FakeFraud>,
}

pub async fn harness(fraud: Arc<FakeFraud>) -> Harness {
    let geo = FakeGeo::new("Berlin");
    let reconciler = Reconciler::new(store().await, geo.clone(), fraud.clone())
        .with_clock(StepClock::new());

    Harness {
        reconciler,
        geo,
        fraud,
    }
}
