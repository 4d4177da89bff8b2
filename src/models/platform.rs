use std::fmt;

use serde::{Deserialize, Serialize};

/// Upstream platform an event was collected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    CodeChef,
    Codeforces,
    Devfolio,
    Unstop,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::CodeChef,
        Platform::Codeforces,
        Platform::Devfolio,
        Platform::Unstop,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::CodeChef => "codechef",
            Platform::Codeforces => "codeforces",
            Platform::Devfolio => "devfolio",
            Platform::Unstop => "unstop",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Platform::CodeChef => "CodeChef",
            Platform::Codeforces => "Codeforces",
            Platform::Devfolio => "Devfolio",
            Platform::Unstop => "Unstop",
        }
    }

    /// Kind of listing the platform publishes.
    pub fn listing(self) -> Listing {
        match self {
            Platform::CodeChef | Platform::Codeforces => Listing::Contest,
            Platform::Devfolio | Platform::Unstop => Listing::Hackathon,
        }
    }

    /// Key holding the event array in the per-platform endpoint body,
    /// e.g. `codechef_contests`.
    pub fn collection_key(self) -> String {
        format!("{}_{}", self.as_str(), self.listing().plural())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a platform lists. Drives the wording of countdown labels and the
/// per-platform response keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Listing {
    Contest,
    Hackathon,
}

impl Listing {
    pub fn label(self) -> &'static str {
        match self {
            Listing::Contest => "Contest",
            Listing::Hackathon => "Hackathon",
        }
    }

    pub fn plural(self) -> &'static str {
        match self {
            Listing::Contest => "contests",
            Listing::Hackathon => "hackathons",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Location {
    Online,
    Offline,
}

impl Location {
    pub fn from_online_flag(is_online: bool) -> Self {
        if is_online {
            Location::Online
        } else {
            Location::Offline
        }
    }

    /// Derive the location from a free-text region. Only a region reading
    /// "online" (any case) is online; everything else, absent included, is offline.
    pub fn from_region(region: Option<&str>) -> Self {
        Self::from_online_flag(region.is_some_and(|r| r.trim().eq_ignore_ascii_case("online")))
    }
}
