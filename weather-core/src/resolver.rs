//! Best-effort mapping from a caller's IP address to a CWA city name.

use std::{collections::HashMap, fmt::Debug, net::IpAddr, sync::Arc};

use tracing::debug;

/// Fallback city when an address cannot be placed.
pub const DEFAULT_CITY: &str = "臺北市";

/// Black-box IP geolocation.
pub trait GeoLocator: Send + Sync + Debug {
    /// English city name for `ip`, or `None` when the address is unknown.
    fn lookup_city(&self, ip: IpAddr) -> Option<String>;
}

/// Locator used when no geolocation database is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLocator;

impl GeoLocator for NullLocator {
    fn lookup_city(&self, _ip: IpAddr) -> Option<String> {
        None
    }
}

const BUILTIN_NAMES: &[(&str, &str)] = &[
    ("taipei", "臺北市"),
    ("taipei city", "臺北市"),
    ("new taipei", "新北市"),
    ("new taipei city", "新北市"),
    ("banqiao", "新北市"),
    ("keelung", "基隆市"),
    ("taoyuan", "桃園市"),
    ("taoyuan city", "桃園市"),
    ("hsinchu", "新竹市"),
    ("zhubei", "新竹縣"),
    ("miaoli", "苗栗縣"),
    ("taichung", "臺中市"),
    ("taichung city", "臺中市"),
    ("changhua", "彰化縣"),
    ("nantou", "南投縣"),
    ("douliu", "雲林縣"),
    ("chiayi", "嘉義市"),
    ("tainan", "臺南市"),
    ("tainan city", "臺南市"),
    ("kaohsiung", "高雄市"),
    ("kaohsiung city", "高雄市"),
    ("pingtung", "屏東縣"),
    ("yilan", "宜蘭縣"),
    ("hualien", "花蓮縣"),
    ("hualien city", "花蓮縣"),
    ("taitung", "臺東縣"),
    ("magong", "澎湖縣"),
    ("jincheng", "金門縣"),
    ("nangan", "連江縣"),
];

/// Immutable English → administrative city name table with a default.
#[derive(Debug, Clone)]
pub struct CityNames {
    names: HashMap<String, String>,
    default_city: String,
}

impl CityNames {
    /// Table with the given entries only. Keys are matched case-insensitively.
    pub fn new<I, K, V>(entries: I, default_city: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut default_city = default_city.into();
        if default_city.trim().is_empty() {
            default_city = DEFAULT_CITY.to_string();
        }

        let names = entries
            .into_iter()
            .map(|(k, v)| (k.as_ref().trim().to_lowercase(), v.into()))
            .collect();

        Self { names, default_city }
    }

    /// Built-in Taiwan table with `DEFAULT_CITY` as fallback.
    pub fn taiwan() -> Self {
        Self::new(BUILTIN_NAMES.iter().copied(), DEFAULT_CITY)
    }

    /// Built-in table with extra entries and a custom default layered on top.
    pub fn taiwan_with<I, K, V>(overrides: I, default_city: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut table = Self::new(BUILTIN_NAMES.iter().copied(), default_city);
        for (k, v) in overrides {
            table.names.insert(k.as_ref().trim().to_lowercase(), v.into());
        }
        table
    }

    pub fn default_city(&self) -> &str {
        &self.default_city
    }

    /// Exact case-insensitive lookup; unknown names yield the default.
    pub fn translate(&self, english: &str) -> &str {
        self.names
            .get(&english.trim().to_lowercase())
            .map(String::as_str)
            .unwrap_or(self.default_city.as_str())
    }

    pub(crate) fn len(&self) -> usize {
        self.names.len()
    }
}

impl Default for CityNames {
    fn default() -> Self {
        Self::taiwan()
    }
}

/// Resolves a raw client IP to a city name. Never fails.
#[derive(Debug, Clone)]
pub struct CityResolver {
    locator: Arc<dyn GeoLocator>,
    names: CityNames,
}

impl CityResolver {
    pub fn new(locator: Arc<dyn GeoLocator>, names: CityNames) -> Self {
        Self { locator, names }
    }

    pub fn default_city(&self) -> &str {
        self.names.default_city()
    }

    pub fn resolve_city(&self, ip: &str) -> String {
        let Ok(addr) = ip.trim().parse::<IpAddr>() else {
            debug!(ip, "unparsable client address, using default city");
            return self.default_city().to_string();
        };

        let Some(english) = self.locator.lookup_city(addr.to_canonical()) else {
            debug!(%addr, "no geolocation record, using default city");
            return self.default_city().to_string();
        };

        let city = self.names.translate(&english);
        debug!(%addr, english = %english, city, "resolved client city");
        city.to_string()
    }
}
