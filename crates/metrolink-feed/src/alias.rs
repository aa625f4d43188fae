use phf::phf_map;

/// Maps the handful of display names the upstream feed uses inconsistently
/// onto the canonical station names the rest of the system expects (spec
/// §4.D, step "apply station alias"). The upstream feed predates several
/// station renames and rebrands and never caught up.
pub trait AliasTable: Send + Sync {
    fn resolve<'a>(&'a self, name: &'a str) -> &'a str;
}

/// Seeded from the upstream project's own alias table; kept as a static
/// compile-time map the way `deutsche_bahn::STATION_TABLE` does it.
pub static STATION_ALIASES: phf::Map<&'static str, &'static str> = phf_map! {
    "Ashton-under-Lyne" => "Ashton-Under-Lyne",
    "Ashton" => "Ashton-Under-Lyne",
    "Deansgate Castlefield" => "Deansgate - Castlefield",
    "Deansgate" => "Deansgate - Castlefield",
    "MCUK" => "MediaCityUK",
    "Newton Heath" => "Newton Heath and Moston",
    "Victoria Millgate Siding" => "Victoria",
    "Rochdale Stn" => "Rochdale Railway Station",
    "Trafford Centre" => "The Trafford Centre",
    "intu Trafford Centre" => "The Trafford Centre",
    "Wythen. Town" => "Wythenshawe Town Centre",
};

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAliasTable;

impl AliasTable for DefaultAliasTable {
    fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        STATION_ALIASES.get(name).copied().unwrap_or(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_alias() {
        let table = DefaultAliasTable;
        assert_eq!(table.resolve("MCUK"), "MediaCityUK");
    }

    #[test]
    fn passes_through_unknown_names() {
        let table = DefaultAliasTable;
        assert_eq!(table.resolve("Bury"), "Bury");
    }
}
