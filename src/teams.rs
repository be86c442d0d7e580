use std::collections::HashMap;

// name, abbreviation, aliases
const LEAGUE_TEAMS: [(&str, &str, &[&str]); 18] = [
    ("Adelaide", "ADE", &["Adelaide Crows", "Crows"]),
    ("Brisbane Lions", "BRL", &["Brisbane", "BL", "Lions"]),
    ("Carlton", "CAR", &["Blues"]),
    ("Collingwood", "COL", &["Magpies", "Pies"]),
    ("Essendon", "ESS", &["Bombers"]),
    ("Fremantle", "FRE", &["Dockers"]),
    ("Geelong", "GEE", &["Geelong Cats", "Cats"]),
    ("Gold Coast", "GCS", &["Gold Coast Suns", "GC", "Suns"]),
    ("GWS Giants", "GWS", &["Greater Western Sydney", "Giants"]),
    ("Hawthorn", "HAW", &["Hawks"]),
    ("Melbourne", "MEL", &["Demons"]),
    ("North Melbourne", "NTH", &["NM", "Kangaroos"]),
    ("Port Adelaide", "PTA", &["PA", "Power"]),
    ("Richmond", "RIC", &["Tigers"]),
    ("St Kilda", "STK", &["Saints"]),
    ("Sydney", "SYD", &["Sydney Swans", "Swans"]),
    ("West Coast", "WCE", &["West Coast Eagles", "Eagles"]),
    ("Western Bulldogs", "WBD", &["Bulldogs", "WB"]),
];

#[derive(Debug, Clone)]
pub struct TeamIdentity {
    pub name: String,
    pub abbreviation: String,
    pub aliases: Vec<String>,
}

/// Case-insensitive team-name lookup in both directions. Anything the
/// directory does not know passes through unchanged.
#[derive(Debug, Clone, Default)]
pub struct TeamDirectory {
    identities: Vec<TeamIdentity>,
    by_key: HashMap<String, usize>,
}

impl TeamDirectory {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn league() -> Self {
        let mut dir = Self::empty();
        for (name, abbr, aliases) in LEAGUE_TEAMS {
            dir.insert(TeamIdentity {
                name: name.to_string(),
                abbreviation: abbr.to_string(),
                aliases: aliases.iter().map(|a| a.to_string()).collect(),
            });
        }
        dir
    }

    pub fn insert(&mut self, identity: TeamIdentity) {
        let idx = match self.by_key.get(&team_key(&identity.name)) {
            Some(&idx) => {
                self.by_key.retain(|_, slot| *slot != idx);
                self.identities[idx] = identity;
                idx
            }
            None => {
                self.identities.push(identity);
                self.identities.len() - 1
            }
        };
        let identity = &self.identities[idx];
        let keys: Vec<String> = std::iter::once(&identity.name)
            .chain(std::iter::once(&identity.abbreviation))
            .chain(identity.aliases.iter())
            .map(|s| team_key(s))
            .filter(|k| !k.is_empty())
            .collect();
        for key in keys {
            self.by_key.insert(key, idx);
        }
    }

    pub fn add_alias(&mut self, team: &str, alias: &str) -> bool {
        let Some(&idx) = self.by_key.get(&team_key(team)) else {
            return false;
        };
        let key = team_key(alias);
        if key.is_empty() {
            return false;
        }
        self.identities[idx].aliases.push(alias.trim().to_string());
        self.by_key.insert(key, idx);
        true
    }

    pub fn identity(&self, identifier: &str) -> Option<&TeamIdentity> {
        self.by_key
            .get(&team_key(identifier))
            .map(|&idx| &self.identities[idx])
    }

    pub fn resolve(&self, identifier: &str) -> String {
        match self.identity(identifier) {
            Some(identity) => identity.name.clone(),
            None => identifier.trim().to_string(),
        }
    }

    pub fn abbreviation(&self, identifier: &str) -> Option<&str> {
        self.identity(identifier).map(|i| i.abbreviation.as_str())
    }

    pub fn same_team(&self, a: &str, b: &str) -> bool {
        team_key(&self.resolve(a)) == team_key(&self.resolve(b))
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

fn team_key(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
