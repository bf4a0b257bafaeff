//! Built-in ROI tables for the supported reference resolutions.

use std::sync::OnceLock;

use super::profile::{ProfileBuilder, ProfileTemplate};

/// ROI path names.
pub mod roi {
    pub const MENU_TERMINAL: &str = "terminal";
    pub const MENU_SHELL: &str = "shell";

    pub const OFFSET_PAGE: &str = "offsets.page";
    pub const SCROLL_PAGE: &str = "scroll.page";
    pub const SCROLL_CHARACTERS: &str = "scroll.characters";

    pub const TAB_WEAPONS: &str = "scrapers.weapons";
    pub const TAB_ECHOES: &str = "scrapers.echoes";
    pub const TAB_DEV_ITEMS: &str = "scrapers.devItems";
    pub const TAB_RESOURCES: &str = "scrapers.resources";

    pub const ITEMS_START: &str = "items.start";
    pub const ITEMS_NAME: &str = "items.name";
    pub const ITEMS_VALUE: &str = "items.value";
    pub const ITEMS_DESCRIPTION: &str = "items.description";

    pub const WEAPONS_PAGE: &str = "weapons.page";
    pub const WEAPONS_NAME: &str = "weapons.name";
    pub const WEAPONS_VALUE: &str = "weapons.value";
    pub const WEAPONS_LEVEL: &str = "weapons.level";
    pub const WEAPONS_RANK: &str = "weapons.rank";

    pub const ECHOES_PAGE: &str = "echoes.page";
    pub const ECHOES_CARD: &str = "echoes.echoCard";
    pub const ECHOES_STATS_NAME: &str = "echoes.fullStatsName";
    pub const ECHOES_STATS_VALUE: &str = "echoes.fullStatsValue";

    pub const ACHIEVEMENTS_STATUS: &str = "achievements.status";
    pub const ACHIEVEMENTS_SEARCH_BAR: &str = "achievements.searchBar";
    pub const ACHIEVEMENTS_SEARCH_BUTTON: &str = "achievements.searchButton";
    pub const ACHIEVEMENTS_BUTTON: &str = "achievements.achievementsButton";
    pub const ACHIEVEMENTS_TAB: &str = "achievements.achievementsTab";

    pub const CHARACTERS_OFFSET_LEFT: &str = "characters.offsets.leftSide";
    pub const CHARACTERS_OFFSET_RIGHT: &str = "characters.offsets.rightSide";
    pub const CHARACTERS_OFFSET_SKILL: &str = "characters.offsets.skillPosition";
    pub const CHARACTERS_LEFT_SIDE: &str = "characters.leftSide";
    pub const CHARACTERS_RIGHT_SIDE: &str = "characters.rightSide";
    pub const CHARACTERS_NAME: &str = "characters.resonatorName";
    pub const CHARACTERS_LEVEL: &str = "characters.resonatorLevel";
    pub const CHARACTERS_WEAPON_NAME: &str = "characters.weaponName";
    pub const CHARACTERS_WEAPON_LEVEL: &str = "characters.weaponLevel";
    pub const CHARACTERS_WEAPON_RANK: &str = "characters.weaponRank";
    pub const CHARACTERS_SKILL_CLICK: &str = "characters.skillClick";
    pub const CHARACTERS_SKILL_LEVEL: &str = "characters.skillLevel";
    pub const CHARACTERS_SKILL_BUTTON: &str = "characters.skillButton";
    pub const CHARACTERS_CHAIN_CLICK: &str = "characters.chainClick";
    pub const CHARACTERS_CHAIN_BUTTON: &str = "characters.chainButton";
    pub const CHARACTERS_SKILL_POSITIONS: &str = "characters.skillPositions";
    pub const CHARACTERS_CHAIN_POSITIONS: &str = "characters.chainPositions";

    pub const SKILL_POSITION_COUNT: usize = 5;
    pub const CHAIN_POSITION_COUNT: usize = 6;
}

/// Paths every profile must define.
fn required_paths() -> Vec<String> {
    use roi::*;
    let mut paths: Vec<String> = [
        MENU_TERMINAL,
        MENU_SHELL,
        OFFSET_PAGE,
        SCROLL_PAGE,
        SCROLL_CHARACTERS,
        TAB_WEAPONS,
        TAB_ECHOES,
        TAB_DEV_ITEMS,
        TAB_RESOURCES,
        ITEMS_START,
        ITEMS_NAME,
        ITEMS_VALUE,
        ITEMS_DESCRIPTION,
        WEAPONS_PAGE,
        WEAPONS_NAME,
        WEAPONS_VALUE,
        WEAPONS_LEVEL,
        WEAPONS_RANK,
        ECHOES_PAGE,
        ECHOES_CARD,
        ECHOES_STATS_NAME,
        ECHOES_STATS_VALUE,
        ACHIEVEMENTS_STATUS,
        ACHIEVEMENTS_SEARCH_BAR,
        ACHIEVEMENTS_SEARCH_BUTTON,
        ACHIEVEMENTS_BUTTON,
        ACHIEVEMENTS_TAB,
        CHARACTERS_OFFSET_LEFT,
        CHARACTERS_OFFSET_RIGHT,
        CHARACTERS_OFFSET_SKILL,
        CHARACTERS_LEFT_SIDE,
        CHARACTERS_RIGHT_SIDE,
        CHARACTERS_NAME,
        CHARACTERS_LEVEL,
        CHARACTERS_WEAPON_NAME,
        CHARACTERS_WEAPON_LEVEL,
        CHARACTERS_WEAPON_RANK,
        CHARACTERS_SKILL_CLICK,
        CHARACTERS_SKILL_LEVEL,
        CHARACTERS_SKILL_BUTTON,
        CHARACTERS_CHAIN_CLICK,
        CHARACTERS_CHAIN_BUTTON,
    ]
    .iter()
    .map(|p| p.to_string())
    .collect();

    for i in 0..SKILL_POSITION_COUNT {
        paths.push(super::profile::indexed(CHARACTERS_SKILL_POSITIONS, i));
    }
    for i in 0..CHAIN_POSITION_COUNT {
        paths.push(super::profile::indexed(CHARACTERS_CHAIN_POSITIONS, i));
    }
    paths
}

fn wide_1920x1080() -> ProfileBuilder {
    use roi::*;
    ProfileBuilder::new(1920, 1080)
        .rect(MENU_TERMINAL, 140.0, 40.0, 150.0, 40.0)
        .rect(MENU_SHELL, 1255.0, 38.0, 165.0, 50.0)
        .offset(OFFSET_PAGE, 16.0, 24.0)
        .scalar(SCROLL_PAGE, -31.25)
        .scalar(SCROLL_CHARACTERS, -56.0)
        .point(TAB_WEAPONS, 81.5, 191.5)
        .point(TAB_ECHOES, 81.5, 326.5)
        .point(TAB_DEV_ITEMS, 81.5, 596.5)
        .point(TAB_RESOURCES, 81.5, 731.5)
        .rect(ITEMS_START, 205.0, 122.0, 151.0, 181.0)
        .rect(ITEMS_NAME, 1305.0, 116.0, 545.0, 55.0)
        .rect(ITEMS_VALUE, 1655.0, 320.0, 190.0, 40.0)
        .rect(ITEMS_DESCRIPTION, 1296.0, 114.0, 558.0, 820.0)
        .rect(WEAPONS_PAGE, 200.0, 50.0, 130.0, 40.0)
        .rect(WEAPONS_NAME, 1305.0, 116.0, 545.0, 55.0)
        .rect(WEAPONS_VALUE, 1655.0, 320.0, 190.0, 40.0)
        .rect(WEAPONS_LEVEL, 1660.0, 235.0, 180.0, 45.0)
        .rect(WEAPONS_RANK, 1300.0, 530.0, 115.0, 50.0)
        .rect(ECHOES_PAGE, 200.0, 50.0, 130.0, 40.0)
        .rect(ECHOES_CARD, 1296.0, 114.0, 558.0, 170.0)
        .rect(ECHOES_STATS_NAME, 1380.0, 430.0, 360.0, 380.0)
        .rect(ECHOES_STATS_VALUE, 1740.0, 430.0, 100.0, 380.0)
        .rect(ACHIEVEMENTS_STATUS, 1579.0, 230.0, 256.0, 65.0)
        .point(ACHIEVEMENTS_SEARCH_BAR, 388.0, 149.0)
        .point(ACHIEVEMENTS_SEARCH_BUTTON, 629.0, 149.0)
        .point(ACHIEVEMENTS_BUTTON, 1674.0, 790.0)
        .point(ACHIEVEMENTS_TAB, 835.0, 570.0)
        .offset(CHARACTERS_OFFSET_LEFT, 0.0, 136.0)
        .offset(CHARACTERS_OFFSET_RIGHT, 0.0, 106.0)
        .offset(CHARACTERS_OFFSET_SKILL, 0.0, 255.0)
        .point(CHARACTERS_LEFT_SIDE, 82.0, 191.0)
        .point(CHARACTERS_RIGHT_SIDE, 1814.0, 203.5)
        .rect(CHARACTERS_NAME, 250.0, 110.0, 280.0, 50.0)
        .rect(CHARACTERS_LEVEL, 180.0, 200.0, 135.0, 80.0)
        .rect(CHARACTERS_WEAPON_NAME, 257.0, 126.0, 273.0, 34.0)
        .rect(CHARACTERS_WEAPON_LEVEL, 255.0, 160.0, 110.0, 35.0)
        .rect(CHARACTERS_WEAPON_RANK, 175.0, 355.0, 95.0, 35.0)
        .point(CHARACTERS_SKILL_CLICK, 460.5, 903.0)
        .rect(CHARACTERS_SKILL_LEVEL, 390.0, 100.0, 70.0, 40.0)
        .rect(CHARACTERS_SKILL_BUTTON, 200.0, 980.0, 120.0, 35.0)
        .point(CHARACTERS_CHAIN_CLICK, 1265.0, 135.0)
        .rect(CHARACTERS_CHAIN_BUTTON, 342.0, 964.0, 110.0, 32.0)
        .points(
            CHARACTERS_SKILL_POSITIONS,
            &[
                (755.0, 905.0),
                (985.0, 765.0),
                (1260.0, 705.0),
                (1535.0, 765.0),
                (1760.0, 905.0),
            ],
        )
        .points(
            CHARACTERS_CHAIN_POSITIONS,
            &[
                (1395.0, 140.0),
                (1565.0, 305.0),
                (1640.0, 535.0),
                (1565.0, 765.0),
                (1400.0, 935.0),
                (1170.0, 995.0),
            ],
        )
}

fn wide_1680x1050() -> ProfileBuilder {
    use roi::*;
    ProfileBuilder::new(1680, 1050)
        .rect(MENU_TERMINAL, 125.0, 32.0, 150.0, 40.0)
        .rect(MENU_SHELL, 1100.0, 35.0, 145.0, 40.0)
        .offset(OFFSET_PAGE, 16.0, 24.0)
        .scalar(SCROLL_PAGE, -31.70)
        .scalar(SCROLL_CHARACTERS, -56.0)
        .point(TAB_WEAPONS, 71.5, 167.0)
        .point(TAB_ECHOES, 71.5, 285.0)
        .point(TAB_DEV_ITEMS, 71.5, 521.0)
        .point(TAB_RESOURCES, 71.5, 639.0)
        .rect(ITEMS_START, 180.0, 104.0, 130.0, 162.0)
        .rect(ITEMS_NAME, 1140.0, 152.0, 480.0, 50.0)
        .rect(ITEMS_VALUE, 1430.0, 330.0, 190.0, 40.0)
        .rect(ITEMS_DESCRIPTION, 1136.0, 154.0, 485.0, 715.0)
        .rect(WEAPONS_PAGE, 175.0, 40.0, 130.0, 40.0)
        .rect(WEAPONS_NAME, 1140.0, 152.0, 480.0, 50.0)
        .rect(WEAPONS_VALUE, 1430.0, 330.0, 190.0, 40.0)
        .rect(WEAPONS_LEVEL, 1435.0, 255.0, 180.0, 45.0)
        .rect(WEAPONS_RANK, 1135.0, 510.0, 100.0, 50.0)
        .rect(ECHOES_PAGE, 175.0, 40.0, 130.0, 40.0)
        .rect(ECHOES_CARD, 1136.0, 152.0, 486.0, 152.0)
        .rect(ECHOES_STATS_NAME, 1200.0, 420.0, 320.0, 380.0)
        .rect(ECHOES_STATS_VALUE, 1510.0, 420.0, 100.0, 380.0)
        // Horizontally rescaled from the 1920x1080 status box; the wider box
        // does not fit a 1680 px client.
        .rect(ACHIEVEMENTS_STATUS, 1381.0, 197.0, 224.0, 65.0)
        .point(ACHIEVEMENTS_SEARCH_BAR, 388.0, 129.0)
        .point(ACHIEVEMENTS_SEARCH_BUTTON, 550.0, 129.0)
        .point(ACHIEVEMENTS_BUTTON, 1465.0, 690.0)
        .point(ACHIEVEMENTS_TAB, 735.0, 570.0)
        .offset(CHARACTERS_OFFSET_LEFT, 0.0, 119.0)
        .offset(CHARACTERS_OFFSET_RIGHT, 0.0, 93.5)
        .offset(CHARACTERS_OFFSET_SKILL, 0.0, 220.0)
        .point(CHARACTERS_LEFT_SIDE, 68.0, 167.5)
        .point(CHARACTERS_RIGHT_SIDE, 1586.5, 177.5)
        .rect(CHARACTERS_NAME, 220.0, 102.0, 280.0, 50.0)
        .rect(CHARACTERS_LEVEL, 160.0, 180.0, 135.0, 80.0)
        .rect(CHARACTERS_WEAPON_NAME, 225.0, 118.0, 240.0, 34.0)
        .rect(CHARACTERS_WEAPON_LEVEL, 215.0, 150.0, 110.0, 35.0)
        .rect(CHARACTERS_WEAPON_RANK, 143.0, 320.0, 93.0, 35.0)
        .point(CHARACTERS_SKILL_CLICK, 403.0, 845.0)
        .rect(CHARACTERS_SKILL_LEVEL, 340.0, 95.0, 70.0, 40.0)
        .rect(CHARACTERS_SKILL_BUTTON, 170.0, 950.0, 120.0, 35.0)
        .point(CHARACTERS_CHAIN_CLICK, 1109.0, 174.0)
        .rect(CHARACTERS_CHAIN_BUTTON, 292.0, 936.0, 110.0, 32.0)
        .points(
            CHARACTERS_SKILL_POSITIONS,
            &[
                (660.0, 842.0),
                (864.0, 722.0),
                (1103.0, 667.0),
                (1342.0, 722.0),
                (1545.0, 842.0),
            ],
        )
        .points(
            CHARACTERS_CHAIN_POSITIONS,
            &[
                (1224.0, 176.0),
                (1369.0, 319.0),
                (1424.0, 519.0),
                (1369.0, 724.0),
                (1224.0, 864.0),
                (1024.0, 919.0),
            ],
        )
}

static TEMPLATES: OnceLock<Vec<ProfileTemplate>> = OnceLock::new();

/// All built-in profiles, validated once.
///
/// The tables are static data covered by tests, so a validation failure here
/// is a build defect and is reported by panicking with the offending path.
pub fn templates() -> &'static [ProfileTemplate] {
    TEMPLATES.get_or_init(|| {
        let required = required_paths();
        let required: Vec<&str> = required.iter().map(String::as_str).collect();
        [wide_1920x1080(), wide_1680x1050()]
            .into_iter()
            .map(|builder| match builder.build(&required) {
                Ok(template) => template,
                Err(e) => panic!("Invalid built-in profile: {}", e),
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_profiles_validate() {
        let templates = templates();
        assert_eq!(templates.len(), 2);
        assert_eq!(templates[0].ratio(), (16, 9));
        assert_eq!(templates[1].ratio(), (8, 5));
    }

    #[test]
    fn test_required_paths_cover_indexed_positions() {
        let paths = required_paths();
        assert!(paths.contains(&"characters.skillPositions[4]".to_string()));
        assert!(paths.contains(&"characters.chainPositions[5]".to_string()));
        assert!(!paths.contains(&"characters.chainPositions[6]".to_string()));
    }
}
