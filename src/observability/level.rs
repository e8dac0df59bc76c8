//! Log levels and categories (spec §4.7).

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    Off,
}

impl FromStr for Level {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TRACE" => Ok(Level::Trace),
            "DEBUG" => Ok(Level::Debug),
            "INFO" => Ok(Level::Info),
            "WARN" => Ok(Level::Warn),
            "ERROR" => Ok(Level::Error),
            "FATAL" => Ok(Level::Fatal),
            "OFF" => Ok(Level::Off),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Http,
    Auth,
    ScimUser,
    ScimGroup,
    ScimPatch,
    ScimFilter,
    ScimDiscovery,
    Endpoint,
    Database,
    Backup,
    Oauth,
    General,
}

impl Category {
    pub fn as_wire(&self) -> &'static str {
        match self {
            Category::Http => "http",
            Category::Auth => "auth",
            Category::ScimUser => "scim.user",
            Category::ScimGroup => "scim.group",
            Category::ScimPatch => "scim.patch",
            Category::ScimFilter => "scim.filter",
            Category::ScimDiscovery => "scim.discovery",
            Category::Endpoint => "endpoint",
            Category::Database => "database",
            Category::Backup => "backup",
            Category::Oauth => "oauth",
            Category::General => "general",
        }
    }
}

impl FromStr for Category {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(Category::Http),
            "auth" => Ok(Category::Auth),
            "scim.user" => Ok(Category::ScimUser),
            "scim.group" => Ok(Category::ScimGroup),
            "scim.patch" => Ok(Category::ScimPatch),
            "scim.filter" => Ok(Category::ScimFilter),
            "scim.discovery" => Ok(Category::ScimDiscovery),
            "endpoint" => Ok(Category::Endpoint),
            "database" => Ok(Category::Database),
            "backup" => Ok(Category::Backup),
            "oauth" => Ok(Category::Oauth),
            "general" => Ok(Category::General),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_order_trace_below_fatal() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Error < Level::Fatal);
        assert!(Level::Fatal < Level::Off);
    }

    #[test]
    fn level_parses_case_insensitively() {
        assert_eq!("warn".parse::<Level>(), Ok(Level::Warn));
        assert_eq!("WARN".parse::<Level>(), Ok(Level::Warn));
    }
}
