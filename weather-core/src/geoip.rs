//! MaxMind GeoLite2-City backed locator.

use std::{fmt, net::IpAddr, path::Path, sync::Arc};

use anyhow::{Context, Result};
use maxminddb::{MaxMindDBError, Reader, geoip2};
use tracing::{info, warn};

use crate::resolver::{GeoLocator, NullLocator};

pub struct MaxMindLocator {
    reader: Reader<Vec<u8>>,
}

impl MaxMindLocator {
    pub fn open(path: &Path) -> Result<Self> {
        let reader = Reader::open_readfile(path)
            .with_context(|| format!("Failed to open GeoIP database: {}", path.display()))?;
        Ok(Self { reader })
    }
}

impl fmt::Debug for MaxMindLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaxMindLocator")
            .field("database_type", &self.reader.metadata.database_type)
            .finish()
    }
}

impl GeoLocator for MaxMindLocator {
    fn lookup_city(&self, ip: IpAddr) -> Option<String> {
        let record = match self.reader.lookup::<geoip2::City>(ip) {
            Ok(record) => record,
            Err(MaxMindDBError::AddressNotFoundError(_)) => return None,
            Err(e) => {
                warn!(%ip, error = %e, "GeoIP lookup failed");
                return None;
            }
        };

        record
            .city?
            .names?
            .get("en")
            .map(|name| name.to_string())
    }
}

/// Locator for the configured database path, or a [`NullLocator`] when none is set
/// or the database cannot be opened.
pub fn locator_from_path(path: Option<&Path>) -> Arc<dyn GeoLocator> {
    let Some(path) = path else {
        info!("no GeoIP database configured; current-location lookups use the default city");
        return Arc::new(NullLocator);
    };

    match MaxMindLocator::open(path) {
        Ok(locator) => {
            info!(path = %path.display(), "GeoIP database loaded");
            Arc::new(locator)
        }
        Err(e) => {
            warn!(error = %format!("{e:#}"), "GeoIP disabled; current-location lookups use the default city");
            Arc::new(NullLocator)
        }
    }
}
