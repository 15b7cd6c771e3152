use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{info, warn};

use crate::models::{Logo, NormalizedGame, TeamLine};

/// URL prefixes the dashboard serves the two logo directories under.
pub const DEFAULT_PREFIX: &str = "logos";
pub const CUSTOM_PREFIX: &str = "logos_custom";

type LogoSet = HashMap<String, HashSet<String>>;

/// Local team logo files per league directory, scanned once at startup.
#[derive(Debug, Clone, Default)]
pub struct LogoCatalog {
    default: LogoSet,
    custom: LogoSet,
}

impl LogoCatalog {
    pub fn scan(default_dir: impl AsRef<Path>, custom_dir: impl AsRef<Path>) -> Self {
        let catalog = LogoCatalog {
            default: scan_dir(default_dir.as_ref()),
            custom: scan_dir(custom_dir.as_ref()),
        };
        info!(
            "Local logos: {} default files, {} custom files",
            catalog.default.values().map(HashSet::len).sum::<usize>(),
            catalog.custom.values().map(HashSet::len).sum::<usize>()
        );
        catalog
    }

    /// Served path for a team's logo: custom before default, SVG before PNG.
    pub fn resolve(&self, league_dir: &str, code: &str) -> Option<String> {
        let candidates = [
            (&self.custom, CUSTOM_PREFIX, "svg"),
            (&self.custom, CUSTOM_PREFIX, "png"),
            (&self.default, DEFAULT_PREFIX, "svg"),
            (&self.default, DEFAULT_PREFIX, "png"),
        ];
        candidates.into_iter().find_map(|(set, prefix, ext)| {
            let file = format!("{code}.{ext}");
            set.get(league_dir)
                .is_some_and(|files| files.contains(&file))
                .then(|| format!("{prefix}/{league_dir}/{file}"))
        })
    }

    fn localize_team(&self, league_dir: &str, team: &mut TeamLine) {
        if let Some(path) = self.resolve(league_dir, &team.code) {
            team.logo = Logo::Local(path);
        }
    }

    /// Swap upstream logo URLs for local files where one exists.
    pub fn localize(&self, league_dir: &str, games: &mut [NormalizedGame]) {
        for game in games {
            self.localize_team(league_dir, &mut game.home);
            self.localize_team(league_dir, &mut game.away);
        }
    }
}

/// `<dir>/<league>/<file>.{svg,png}`; anything else is ignored.
fn scan_dir(dir: &Path) -> LogoSet {
    let mut set = LogoSet::new();
    let leagues = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Logo directory {} unavailable: {}", dir.display(), e);
            return set;
        }
    };
    for league in leagues.flatten() {
        let path = league.path();
        if !path.is_dir() {
            continue;
        }
        let Ok(files) = std::fs::read_dir(&path) else {
            continue;
        };
        let names: HashSet<String> = files
            .flatten()
            .filter_map(|f| f.file_name().into_string().ok())
            .filter(|name| name.ends_with(".svg") || name.ends_with(".png"))
            .collect();
        if !names.is_empty() {
            set.insert(league.file_name().to_string_lossy().into_owned(), names);
        }
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::game;
    use crate::models::GameState;

    fn catalog(default: LogoSet, custom: LogoSet) -> LogoCatalog {
        LogoCatalog { default, custom }
    }

    fn set(league: &str, files: &[&str]) -> LogoSet {
        HashMap::from([(
            league.to_string(),
            files.iter().map(|f| f.to_string()).collect(),
        )])
    }

    #[test]
    fn test_resolve_preference_order() {
        let catalog = catalog(
            set("NHL", &["TOR.svg", "TOR.png", "BOS.png", "MTL.png"]),
            set("NHL", &["BOS.png", "MTL.svg"]),
        );
        assert_eq!(
            catalog.resolve("NHL", "TOR").as_deref(),
            Some("logos/NHL/TOR.svg")
        );
        assert_eq!(
            catalog.resolve("NHL", "BOS").as_deref(),
            Some("logos_custom/NHL/BOS.png")
        );
        assert_eq!(
            catalog.resolve("NHL", "MTL").as_deref(),
            Some("logos_custom/NHL/MTL.svg")
        );
        assert_eq!(catalog.resolve("NHL", "NYR"), None);
        assert_eq!(catalog.resolve("NBA", "TOR"), None);
    }

    #[test]
    fn test_localize_keeps_remote_when_missing() {
        let catalog = catalog(set("NHL", &["TOR.svg"]), LogoSet::new());
        let mut games = vec![game("TOR", "BOS", 19, GameState::Scheduled)];
        games[0].away.logo = Logo::Remote("https://cdn/BOS.png".to_string());
        catalog.localize("NHL", &mut games);
        assert_eq!(games[0].home.logo, Logo::Local("logos/NHL/TOR.svg".to_string()));
        assert_eq!(
            games[0].away.logo,
            Logo::Remote("https://cdn/BOS.png".to_string())
        );
    }

    #[test]
    fn test_scan_reads_league_directories() {
        let root = std::env::temp_dir().join(format!("myscoreboard-logos-{}", std::process::id()));
        let nhl = root.join("NHL");
        std::fs::create_dir_all(&nhl).unwrap();
        std::fs::write(nhl.join("TOR.svg"), "<svg/>").unwrap();
        std::fs::write(nhl.join("notes.txt"), "x").unwrap();
        std::fs::write(root.join("stray.png"), "x").unwrap();

        let catalog = LogoCatalog::scan(&root, root.join("missing"));
        assert_eq!(
            catalog.resolve("NHL", "TOR").as_deref(),
            Some("logos/NHL/TOR.svg")
        );
        assert_eq!(catalog.resolve("NHL", "notes"), None);

        std::fs::remove_dir_all(&root).unwrap();
    }
}
