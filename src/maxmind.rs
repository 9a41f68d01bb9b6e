//! Offline geolocation backed by a MaxMind City database.

use std::net::IpAddr;
use std::path::Path;

use async_trait::async_trait;
use maxminddb::{geoip2, Reader};

use crate::error::LookupError;
use crate::geo::GeoProvider;
use crate::model::{Location, UNKNOWN};

/// Secondary geolocation source reading a local `.mmdb` file.
///
/// The dataset carries no ISP information, so `isp` is always `"Unknown"`.
pub struct MaxMindProvider {
    reader: Reader<Vec<u8>>,
}

impl MaxMindProvider {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LookupError> {
        Ok(Self {
            reader: Reader::open_readfile(path)?,
        })
    }

    fn lookup_sync(&self, ip: &str) -> Result<Location, LookupError> {
        let addr: IpAddr = ip
            .trim()
            .parse()
            .map_err(|_| LookupError::InvalidAddress(ip.to_string()))?;
        let city: geoip2::City = self.reader.lookup(addr)?;

        Ok(location_from_city(ip, city))
    }
}

/// Maps a City record onto a [`Location`].
///
/// The country prefers the English name and falls back to the ISO code.
fn location_from_city(ip: &str, city: geoip2::City<'_>) -> Location {
    let country = city.country.and_then(|country| {
        english_name(country.names.as_ref()).or_else(|| country.iso_code.map(str::to_string))
    });
    let city_name = city
        .city
        .and_then(|city| english_name(city.names.as_ref()));
    let (latitude, longitude, timezone) = match city.location {
        Some(location) => (
            location.latitude,
            location.longitude,
            location.time_zone.map(str::to_string),
        ),
        None => (None, None, None),
    };

    Location {
        ip: ip.to_string(),
        country: country.unwrap_or_else(|| UNKNOWN.to_string()),
        city: city_name.unwrap_or_else(|| UNKNOWN.to_string()),
        latitude,
        longitude,
        isp: UNKNOWN.to_string(),
        timezone,
    }
}

fn english_name(names: Option<&std::collections::BTreeMap<&str, &str>>) -> Option<String> {
    names
        .and_then(|names| names.get("en"))
        .map(|name| name.to_string())
}

#[async_trait]
impl GeoProvider for MaxMindProvider {
    fn name(&self) -> &'static str {
        "maxmind"
    }

    async fn lookup(&self, ip: &str) -> Result<Location, LookupError> {
        self.lookup_sync(ip)
    }
}
