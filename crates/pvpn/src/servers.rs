//! Server catalogue cached by the CLI (`serverinfo.json`) and the
//! country/server tree shown by the front-end.

use crate::countries;
use crate::error::CliError;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Countries that only host Secure Core entry servers. They are hidden from
/// the tree in Secure Core mode, where only exit countries are listed.
pub const SECURE_CORE_ENTRY_COUNTRIES: [&str; 3] = ["Iceland", "Switzerland", "Sweden"];

/// Pools at least this large pick randomly among the best few servers.
const LARGE_POOL: usize = 50;
const LARGE_POOL_CHOICES: usize = 4;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct LogicalServer {
    pub name: String,
    #[serde(default)]
    pub entry_country: String,
    pub exit_country: String,
    pub tier: u8,
    pub features: u32,
    pub load: u32,
    pub score: f64,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default = "default_status")]
    pub status: u8,
}

fn default_status() -> u8 {
    1
}

impl LogicalServer {
    pub fn feature(&self) -> Option<Feature> {
        Feature::from_code(self.features)
    }

    pub fn is_secure_core(&self) -> bool {
        self.feature() == Some(Feature::SecureCore)
    }

    pub fn country_name(&self) -> String {
        countries::display_name(&self.exit_country)
    }
}

#[derive(Debug, Deserialize)]
struct ServerInfo {
    #[serde(rename = "LogicalServers")]
    logical_servers: Vec<LogicalServer>,
}

/// Server feature codes as published by the ProtonVPN API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    SecureCore,
    Tor,
    P2p,
}

impl Feature {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Feature::SecureCore),
            2 => Some(Feature::Tor),
            4 => Some(Feature::P2p),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Feature::SecureCore => "Secure Core",
            Feature::Tor => "Tor",
            Feature::P2p => "P2P",
        }
    }
}

pub fn parse_servers(json: &str) -> Result<Vec<LogicalServer>, CliError> {
    let info: ServerInfo = serde_json::from_str(json)?;
    Ok(info.logical_servers)
}

/// Loads the server list the CLI cached during its last API pull.
pub fn load_servers(path: impl AsRef<Path>) -> Result<Vec<LogicalServer>, CliError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|e| CliError::ServerData {
        message: format!("{}: {}", path.display(), e),
    })?;
    parse_servers(&json)
}

pub fn find_server<'a>(servers: &'a [LogicalServer], name: &str) -> Option<&'a LogicalServer> {
    servers.iter().find(|s| s.name == name)
}

/// Secure Core servers exiting in `country_code`.
pub fn secure_core_pool<'a>(
    servers: &'a [LogicalServer],
    country_code: &str,
) -> Vec<&'a LogicalServer> {
    servers
        .iter()
        .filter(|s| s.is_secure_core() && s.exit_country.eq_ignore_ascii_case(country_code))
        .collect()
}

/// Picks a fast server from `pool`: the best score for small pools, a random
/// one among the best few for large pools.
pub fn fastest_server<'a, R: Rng + ?Sized>(
    pool: &[&'a LogicalServer],
    rng: &mut R,
) -> Option<&'a LogicalServer> {
    let mut sorted: Vec<&LogicalServer> = pool.to_vec();
    sorted.sort_by(|a, b| a.score.total_cmp(&b.score));
    let choices = if sorted.len() >= LARGE_POOL {
        LARGE_POOL_CHOICES
    } else {
        1
    };
    sorted.truncate(choices);
    sorted.choose(rng).copied()
}

/// Servers keyed by display country name, alphabetized.
pub fn group_by_country(servers: &[LogicalServer]) -> BTreeMap<String, Vec<&LogicalServer>> {
    let mut by_country: BTreeMap<String, Vec<&LogicalServer>> = BTreeMap::new();
    for server in servers {
        by_country
            .entry(server.country_name())
            .or_default()
            .push(server);
    }
    by_country
}

// ── Server tree ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct CountryNode {
    pub name: String,
    /// Lowercase country code, used for the flag badge.
    pub code: String,
    /// Distinct Tor/P2P badges found among the country's servers.
    pub features: Vec<Feature>,
    pub servers: Vec<ServerNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerNode {
    pub name: String,
    pub load: String,
    pub city: Option<String>,
    pub plus: bool,
    pub feature: Option<Feature>,
}

/// Builds the country/server tree for a user's tier.
///
/// In Secure Core mode only Secure Core servers are listed and the entry
/// countries are dropped; otherwise Secure Core servers are hidden.
pub fn build_server_tree(
    servers: &[LogicalServer],
    user_tier: u8,
    secure_core: bool,
) -> Vec<CountryNode> {
    let mut by_country = group_by_country(servers);

    if secure_core {
        for country in SECURE_CORE_ENTRY_COUNTRIES {
            by_country.remove(country);
        }
    }

    by_country
        .into_iter()
        .map(|(name, servers)| {
            let code = servers
                .first()
                .map(|s| s.exit_country.to_lowercase())
                .unwrap_or_default();

            let mut features = Vec::new();
            if !secure_core {
                for feature in servers.iter().filter_map(|s| s.feature()) {
                    if feature != Feature::SecureCore && !features.contains(&feature) {
                        features.push(feature);
                    }
                }
            }

            let servers = servers
                .into_iter()
                .filter(|s| s.tier <= user_tier)
                .filter(|s| s.is_secure_core() == secure_core)
                .map(|s| ServerNode {
                    name: s.name.clone(),
                    load: format!("{}%", s.load),
                    city: s.city.clone().filter(|c| !c.is_empty()),
                    plus: secure_core || s.tier == 2,
                    feature: if secure_core { None } else { s.feature() },
                })
                .collect();

            CountryNode {
                name,
                code,
                features,
                servers,
            }
        })
        .collect()
}
