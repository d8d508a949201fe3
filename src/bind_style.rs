use std::collections::HashMap;
use std::fmt;
use std::sync::{LazyLock, RwLock};

use crate::error::Error;

/// The placeholder syntax a database driver expects for bound parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BindStyle {
    /// Not resolved yet. Rewriting with this style fails unless the
    /// sqlx-compatible fallback is enabled.
    #[default]
    Unknown,
    /// `?`, used by MySQL and SQLite
    Question,
    /// `$1`, `$2`, ..., used by PostgreSQL
    Dollar,
    /// `:name`, used by Oracle
    Named,
    /// `@1`, `@2`, ..., used by Microsoft SQL Server
    At,
}

impl BindStyle {
    /// Returns the bind style registered for `driver`, if any.
    ///
    /// ```
    /// use sqlsw::BindStyle;
    ///
    /// assert_eq!(BindStyle::lookup("postgres"), Some(BindStyle::Dollar));
    /// assert_eq!(BindStyle::lookup("not-a-driver"), None);
    /// ```
    pub fn lookup(driver: &str) -> Option<BindStyle> {
        DRIVERS.lookup(driver)
    }

    /// Registers the bind style of a driver that is not known yet.
    ///
    /// Intended to be called once at process start, before any mapper is
    /// created for `driver`.
    ///
    /// # Errors
    ///
    /// Fails if `driver` already has a bind style, or if `style` is
    /// [`BindStyle::Unknown`].
    pub fn register(driver: impl Into<String>, style: BindStyle) -> crate::Result<()> {
        DRIVERS.register(driver, style)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BindStyle::Unknown => "Unknown",
            BindStyle::Question => "?",
            BindStyle::Dollar => "$",
            BindStyle::Named => ":",
            BindStyle::At => "@",
        }
    }
}

impl fmt::Display for BindStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const DEFAULT_DRIVERS: &[(&str, BindStyle)] = &[
    ("postgres", BindStyle::Dollar),
    ("pgx", BindStyle::Dollar),
    ("pq-timeouts", BindStyle::Dollar),
    ("cloudsqlpostgres", BindStyle::Dollar),
    ("ql", BindStyle::Dollar),
    ("nrpostgres", BindStyle::Dollar),
    ("cockroach", BindStyle::Dollar),
    ("mysql", BindStyle::Question),
    ("sqlite3", BindStyle::Question),
    ("nrmysql", BindStyle::Question),
    ("nrsqlite3", BindStyle::Question),
    ("oci8", BindStyle::Named),
    ("ora", BindStyle::Named),
    ("goracle", BindStyle::Named),
    ("godror", BindStyle::Named),
    ("sqlserver", BindStyle::At),
];

static DRIVERS: LazyLock<BindStyleRegistry> = LazyLock::new(BindStyleRegistry::with_defaults);

/// An append-only table from driver name to [`BindStyle`].
///
/// [`BindStyle::lookup`] and [`BindStyle::register`] use a process-wide
/// instance seeded with the well-known drivers. A separate registry can be
/// kept for callers that do not want to touch the global table.
#[derive(Debug, Default)]
pub struct BindStyleRegistry {
    drivers: RwLock<HashMap<String, BindStyle>>,
}

impl BindStyleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry seeded with the well-known driver names.
    pub fn with_defaults() -> Self {
        let drivers = DEFAULT_DRIVERS
            .iter()
            .map(|&(name, style)| (name.to_owned(), style))
            .collect();
        Self {
            drivers: RwLock::new(drivers),
        }
    }

    pub fn lookup(&self, driver: &str) -> Option<BindStyle> {
        let drivers = self.drivers.read().unwrap_or_else(|e| e.into_inner());
        drivers.get(driver).copied()
    }

    pub fn register(&self, driver: impl Into<String>, style: BindStyle) -> crate::Result<()> {
        if style == BindStyle::Unknown {
            return Err(Error::UnsupportedBindStyle(style));
        }
        let driver = driver.into();
        let mut drivers = self.drivers.write().unwrap_or_else(|e| e.into_inner());
        if drivers.contains_key(&driver) {
            return Err(Error::DuplicateDriver(driver));
        }
        tracing::debug!(driver = %driver, style = %style, "registered bind style");
        drivers.insert(driver, style);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_defaults() {
        assert_eq!(BindStyle::lookup("mysql"), Some(BindStyle::Question));
        assert_eq!(BindStyle::lookup("postgres"), Some(BindStyle::Dollar));
        assert_eq!(BindStyle::lookup("godror"), Some(BindStyle::Named));
        assert_eq!(BindStyle::lookup("sqlserver"), Some(BindStyle::At));
        assert_eq!(BindStyle::lookup("unknown-driver"), None);
    }

    #[test]
    fn test_register_new_driver() {
        BindStyle::register("test-register-new-driver", BindStyle::At).unwrap();
        assert_eq!(
            BindStyle::lookup("test-register-new-driver"),
            Some(BindStyle::At)
        );
    }

    #[test]
    fn test_register_existing_driver_fails() {
        let err = BindStyle::register("postgres", BindStyle::Question).unwrap_err();
        assert!(matches!(err, Error::DuplicateDriver(name) if name == "postgres"));
        // the first registration is kept
        assert_eq!(BindStyle::lookup("postgres"), Some(BindStyle::Dollar));
    }

    #[test]
    fn test_register_unknown_style_fails() {
        let registry = BindStyleRegistry::new();
        let err = registry.register("mydriver", BindStyle::Unknown).unwrap_err();
        assert!(matches!(err, Error::UnsupportedBindStyle(BindStyle::Unknown)));
        assert_eq!(registry.lookup("mydriver"), None);
    }

    #[test]
    fn test_private_registry_is_separate() {
        let registry = BindStyleRegistry::new();
        assert_eq!(registry.lookup("mysql"), None);
        registry.register("mysql", BindStyle::Dollar).unwrap();
        assert_eq!(registry.lookup("mysql"), Some(BindStyle::Dollar));
        assert_eq!(BindStyle::lookup("mysql"), Some(BindStyle::Question));
    }

    #[test]
    fn test_concurrent_register_and_lookup() {
        let registry = BindStyleRegistry::with_defaults();
        std::thread::scope(|s| {
            for i in 0..8 {
                let registry = &registry;
                s.spawn(move || {
                    registry
                        .register(format!("driver-{i}"), BindStyle::Dollar)
                        .unwrap();
                    assert_eq!(registry.lookup("mysql"), Some(BindStyle::Question));
                });
            }
        });
        for i in 0..8 {
            assert_eq!(
                registry.lookup(&format!("driver-{i}")),
                Some(BindStyle::Dollar)
            );
        }
    }
}
