/// Level loader and builder.
///
/// ## Sources (priority order):
///   1. `levels/<name>/level.toml` manifests, sorted by directory name
///   2. Built-in embedded levels
///
/// ## Manifest format (`level.toml`):
///   ```toml
///   name = "Green Hills"
///   # legacy_map = "map.txt"
///
///   [layers]
///   terrain = "terrain.csv"
///   player = "player.csv"
///   grass = "grass.csv"
///   ```
///
/// Layer paths are relative to the manifest. `terrain` and `player` are
/// required; every other layer defaults to empty. When `legacy_map` is set the
/// `[layers]` table is ignored.
///
/// ## Layer grids (`.csv`):
///   One row per line, comma-separated tokens, `-1` = empty cell.
///   Whitespace around tokens and blank lines are ignored.
///
/// ## Token legend:
///   terrain, grass, back_decor, spikes  sheet index into `terrain/terrain`
///   background                          sheet index into `background`
///   arrows                              `0` = arrows, `1` = gold arrows
///   enemies, constraints                any index = one enemy / one box
///   player                              `0` = player spawn, `1` = goal
///
/// ## Legacy map (`.txt`):
///   'X' = Solid terrain block    'P' = Player spawn
///   ' ' or '.' = Empty           anything else is an error

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rand::Rng;
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::LevelConfig;
use crate::domain::assets::{require_frames, AssetSource, ImageId};
use crate::domain::entity::{DustKind, Enemy, Player, PlayerAnimations};
use crate::domain::geom::Point;
use crate::domain::tile::{Animation, Sprite, Visual, TILE_RATE};
use crate::error::LevelError;
use crate::sim::world::{DustFrames, Level, TileLayers};

const EMPTY: &str = "-1";
const MANIFEST: &str = "level.toml";
const GOAL_IMAGE: &str = "character/end";
const LEGACY_LAYER: &str = "legacy";

// ══════════════════════════════════════════════════════════════
// Layer table
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum LayerKind {
    Terrain,
    Background,
    Grass,
    BackDecor,
    Spikes,
    Arrows,
    Enemies,
    Constraints,
    Player,
}

/// How the cells of one layer turn into sprites.
enum LayerSource {
    /// Static tiles cut from a sheet; the token is the sheet index.
    Sheet(&'static str),
    /// Animated tiles; the token picks one of the animations.
    Animated(&'static [(&'static str, &'static str)]),
    /// Enemies spawned with a random patrol speed.
    Enemy(&'static str),
    /// Invisible boxes used for collision only.
    Hidden,
    /// Player spawn (`0`) and goal (`1`).
    Spawns,
}

impl LayerKind {
    pub const ALL: [LayerKind; 9] = [
        LayerKind::Terrain,
        LayerKind::Background,
        LayerKind::Grass,
        LayerKind::BackDecor,
        LayerKind::Spikes,
        LayerKind::Arrows,
        LayerKind::Enemies,
        LayerKind::Constraints,
        LayerKind::Player,
    ];

    /// Key in the manifest's `[layers]` table.
    pub fn name(self) -> &'static str {
        match self {
            LayerKind::Terrain => "terrain",
            LayerKind::Background => "background",
            LayerKind::Grass => "grass",
            LayerKind::BackDecor => "back_decor",
            LayerKind::Spikes => "spikes",
            LayerKind::Arrows => "arrows",
            LayerKind::Enemies => "enemies",
            LayerKind::Constraints => "constraints",
            LayerKind::Player => "player",
        }
    }

    fn required(self) -> bool {
        matches!(self, LayerKind::Terrain | LayerKind::Player)
    }

    fn source(self) -> LayerSource {
        match self {
            LayerKind::Terrain
            | LayerKind::Grass
            | LayerKind::BackDecor
            | LayerKind::Spikes => LayerSource::Sheet("terrain/terrain"),
            LayerKind::Background => LayerSource::Sheet("background"),
            LayerKind::Arrows => LayerSource::Animated(&[
                ("0", "items/arrows"),
                ("1", "items/arrows_gold"),
            ]),
            LayerKind::Enemies => LayerSource::Enemy("enemy/boar"),
            LayerKind::Constraints => LayerSource::Hidden,
            LayerKind::Player => LayerSource::Spawns,
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Layouts
// ══════════════════════════════════════════════════════════════

/// A rectangular grid of string tokens, addressed `[row][col]`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Grid {
    rows: Vec<Vec<String>>,
}

impl Grid {
    /// Rows must all have the width of the first one.
    pub fn from_rows(layer: &str, rows: Vec<Vec<String>>) -> Result<Self, LevelError> {
        if let Some(expected) = rows.first().map(Vec::len) {
            for (row, cells) in rows.iter().enumerate() {
                if cells.len() != expected {
                    return Err(LevelError::RaggedRow {
                        layer: layer.to_string(),
                        row,
                        expected,
                        actual: cells.len(),
                    });
                }
            }
        }
        Ok(Grid { rows })
    }

    pub fn parse_csv(layer: &str, text: &str) -> Result<Self, LevelError> {
        let rows = text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.split(',').map(|t| t.trim().to_string()).collect())
            .collect();
        Grid::from_rows(layer, rows)
    }

    /// Non-empty cells as `(row, col, token)`.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, &str)> + '_ {
        self.rows.iter().enumerate().flat_map(|(row, cells)| {
            cells.iter().enumerate()
                .filter(|(_, token)| token.as_str() != EMPTY)
                .map(move |(col, token)| (row, col, token.as_str()))
        })
    }
}

#[derive(Clone, Debug)]
pub enum LevelLayout {
    Layered(BTreeMap<LayerKind, Grid>),
    /// Single character grid: `X` terrain, `P` player.
    Legacy(Vec<String>),
}

/// A level as loaded, before any assets are resolved.
#[derive(Clone, Debug)]
pub struct LevelDef {
    pub name: String,
    pub layout: LevelLayout,
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Every level in `levels_dir`, or the embedded set when there are none.
pub fn load_levels(levels_dir: &Path) -> Result<Vec<LevelDef>, LevelError> {
    let levels = discover_levels(levels_dir)?;
    if !levels.is_empty() {
        info!(dir = %levels_dir.display(), count = levels.len(), "levels_discovered");
        return Ok(levels);
    }
    let levels = embedded_levels()?;
    info!(count = levels.len(), "using_embedded_levels");
    Ok(levels)
}

/// Subdirectories of `dir` holding a `level.toml`, sorted by directory name.
/// A missing `dir` yields no levels; a broken manifest is an error.
pub fn discover_levels(dir: &Path) -> Result<Vec<LevelDef>, LevelError> {
    if !dir.is_dir() {
        return Ok(vec![]);
    }
    let entries = std::fs::read_dir(dir).map_err(|source| LevelError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut manifests: Vec<PathBuf> = entries.flatten()
        .map(|entry| entry.path().join(MANIFEST))
        .filter(|path| path.is_file())
        .collect();
    manifests.sort();

    manifests.iter().map(|path| load_manifest(path)).collect()
}

/// Build a runnable level: resolve assets, place every layer, spawn actors.
pub fn build_level(
    def: &LevelDef,
    config: LevelConfig,
    assets: &dyn AssetSource,
    rng: &mut impl Rng,
) -> Result<Level, LevelError> {
    let mut builder = Builder::new(config.tile_size);
    match &def.layout {
        LevelLayout::Layered(layers) => {
            for (&kind, grid) in layers {
                builder.add_layer(kind, grid, assets, rng)?;
            }
        }
        LevelLayout::Legacy(rows) => builder.add_legacy(rows)?,
    }

    let spawn = builder.player.ok_or(LevelError::MissingPlayer)?;
    let player = Player::new(spawn, &config.physics, PlayerAnimations::load(assets)?);
    let dust = DustFrames {
        jump: require_frames(assets, DustKind::Jump.asset_key())?,
        land: require_frames(assets, DustKind::Land.asset_key())?,
    };

    info!(
        level = %def.name,
        terrain = builder.tiles.terrain.len(),
        enemies = builder.enemies.len(),
        goal = builder.goal.is_some(),
        "level_built"
    );
    Ok(Level::new(def.name.clone(), config, builder.tiles, builder.enemies, builder.goal, player, dust))
}

// ══════════════════════════════════════════════════════════════
// Builder
// ══════════════════════════════════════════════════════════════

struct Builder {
    tile_size: i32,
    tiles: TileLayers,
    enemies: Vec<Enemy>,
    goal: Option<Sprite>,
    player: Option<Point>,
}

impl Builder {
    fn new(tile_size: i32) -> Self {
        Builder {
            tile_size,
            tiles: TileLayers::default(),
            enemies: vec![],
            goal: None,
            player: None,
        }
    }

    fn pos(&self, row: usize, col: usize) -> Point {
        Point::new(col as i32 * self.tile_size, row as i32 * self.tile_size)
    }

    fn tiles_mut(&mut self, kind: LayerKind) -> &mut Vec<Sprite> {
        match kind {
            LayerKind::Background => &mut self.tiles.background,
            LayerKind::Grass => &mut self.tiles.grass,
            LayerKind::BackDecor => &mut self.tiles.decor,
            LayerKind::Spikes => &mut self.tiles.spikes,
            LayerKind::Arrows => &mut self.tiles.arrows,
            LayerKind::Constraints => &mut self.tiles.constraints,
            LayerKind::Terrain => &mut self.tiles.terrain,
            LayerKind::Enemies | LayerKind::Player => {
                unreachable!("{} is not a tile layer", kind.name())
            }
        }
    }

    fn place(&mut self, kind: LayerKind, row: usize, col: usize, visual: Visual) {
        let sprite = Sprite::new(self.pos(row, col), self.tile_size, visual);
        self.tiles_mut(kind).push(sprite);
    }

    fn add_layer(
        &mut self,
        kind: LayerKind,
        grid: &Grid,
        assets: &dyn AssetSource,
        rng: &mut impl Rng,
    ) -> Result<(), LevelError> {
        let layer = kind.name();
        match kind.source() {
            LayerSource::Sheet(key) => {
                let sheet = assets.sheet(key)?;
                for (row, col, token) in grid.cells() {
                    let image = sheet_image(layer, &sheet, row, col, token)?;
                    self.place(kind, row, col, Visual::Static(image));
                }
            }
            LayerSource::Animated(variants) => {
                let mut frames = Vec::with_capacity(variants.len());
                for (token, key) in variants {
                    frames.push((*token, require_frames(assets, key)?));
                }
                for (row, col, token) in grid.cells() {
                    let (_, variant) = frames.iter()
                        .find(|(t, _)| *t == token)
                        .ok_or_else(|| unknown(layer, row, col, token))?;
                    let anim = Animation::new(variant.clone(), TILE_RATE);
                    self.place(kind, row, col, Visual::Animated(anim));
                }
            }
            LayerSource::Enemy(key) => {
                let frames = require_frames(assets, key)?;
                for (row, col, token) in grid.cells() {
                    parse_index(layer, row, col, token)?;
                    let enemy = Enemy::spawn(self.pos(row, col), self.tile_size, frames.clone(), rng);
                    self.enemies.push(enemy);
                }
            }
            LayerSource::Hidden => {
                for (row, col, token) in grid.cells() {
                    parse_index(layer, row, col, token)?;
                    self.place(kind, row, col, Visual::Hidden);
                }
            }
            LayerSource::Spawns => {
                for (row, col, token) in grid.cells() {
                    match token {
                        "0" => self.spawn_player(row, col)?,
                        "1" => {
                            let image = assets.image(GOAL_IMAGE)?;
                            self.spawn_goal(row, col, image);
                        }
                        _ => return Err(unknown(layer, row, col, token)),
                    }
                }
            }
        }
        Ok(())
    }

    fn add_legacy(&mut self, rows: &[String]) -> Result<(), LevelError> {
        for (row, line) in rows.iter().enumerate() {
            for (col, ch) in line.chars().enumerate() {
                match ch {
                    'X' => self.place(LayerKind::Terrain, row, col, Visual::Block),
                    'P' => self.spawn_player(row, col)?,
                    ' ' | '.' => {}
                    _ => return Err(unknown(LEGACY_LAYER, row, col, &ch.to_string())),
                }
            }
        }
        Ok(())
    }

    fn spawn_player(&mut self, row: usize, col: usize) -> Result<(), LevelError> {
        if self.player.is_some() {
            return Err(LevelError::DuplicatePlayer { row, col });
        }
        self.player = Some(self.pos(row, col));
        Ok(())
    }

    /// Only one goal is kept; a later one replaces an earlier one.
    fn spawn_goal(&mut self, row: usize, col: usize, image: ImageId) {
        if self.goal.is_some() {
            warn!(row, col, "duplicate_goal; keeping the last one");
        }
        self.goal = Some(Sprite::new(self.pos(row, col), self.tile_size, Visual::Static(image)));
    }
}

fn unknown(layer: &str, row: usize, col: usize, token: &str) -> LevelError {
    LevelError::UnknownToken {
        layer: layer.to_string(),
        row,
        col,
        token: token.to_string(),
    }
}

fn parse_index(layer: &str, row: usize, col: usize, token: &str) -> Result<usize, LevelError> {
    token.parse::<usize>().map_err(|_| unknown(layer, row, col, token))
}

fn sheet_image(
    layer: &str,
    sheet: &[ImageId],
    row: usize,
    col: usize,
    token: &str,
) -> Result<ImageId, LevelError> {
    let index = parse_index(layer, row, col, token)?;
    sheet.get(index).copied().ok_or_else(|| LevelError::TokenOutOfRange {
        layer: layer.to_string(),
        row,
        col,
        index,
        len: sheet.len(),
    })
}

// ══════════════════════════════════════════════════════════════
// Manifest loading
// ══════════════════════════════════════════════════════════════

#[derive(Deserialize, Debug)]
struct Manifest {
    name: Option<String>,
    legacy_map: Option<PathBuf>,
    #[serde(default)]
    layers: BTreeMap<String, PathBuf>,
}

pub fn load_manifest(path: &Path) -> Result<LevelDef, LevelError> {
    let text = read(path)?;
    let manifest: Manifest = toml::from_str(&text).map_err(|source| LevelError::Manifest {
        path: path.to_path_buf(),
        source,
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    let name = manifest.name.unwrap_or_else(|| {
        base.file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    });

    let layout = match manifest.legacy_map {
        Some(map) => LevelLayout::Legacy(parse_legacy(&read(&base.join(map))?)),
        None => LevelLayout::Layered(load_layers(base, &manifest.layers)?),
    };

    info!(level = %name, path = %path.display(), "manifest_loaded");
    Ok(LevelDef { name, layout })
}

fn load_layers(
    base: &Path,
    paths: &BTreeMap<String, PathBuf>,
) -> Result<BTreeMap<LayerKind, Grid>, LevelError> {
    for key in paths.keys() {
        if !LayerKind::ALL.iter().any(|k| k.name() == key) {
            warn!(layer = %key, "unknown_layer_ignored");
        }
    }

    let mut layers = BTreeMap::new();
    for kind in LayerKind::ALL {
        match paths.get(kind.name()) {
            Some(rel) => {
                let grid = Grid::parse_csv(kind.name(), &read(&base.join(rel))?)?;
                layers.insert(kind, grid);
            }
            None if kind.required() => return Err(LevelError::MissingLayer(kind.name())),
            None => {}
        }
    }
    Ok(layers)
}

/// Legacy rows are padded to the widest row; trailing blank lines are dropped.
fn parse_legacy(text: &str) -> Vec<String> {
    let mut rows: Vec<String> = text.lines().map(|l| l.to_string()).collect();
    while rows.last().map_or(false, |r| r.trim().is_empty()) {
        rows.pop();
    }
    let max_width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
    for row in &mut rows {
        let width = row.chars().count();
        row.extend(std::iter::repeat(' ').take(max_width - width));
    }
    rows
}

fn read(path: &Path) -> Result<String, LevelError> {
    std::fs::read_to_string(path).map_err(|source| LevelError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ══════════════════════════════════════════════════════════════
// Embedded fallback levels
// ══════════════════════════════════════════════════════════════
//
// Character maps: '.' = empty, '0'..'9' 'a'..'f' = token 0..15.

struct Embedded {
    name: &'static str,
    layers: &'static [(LayerKind, &'static [&'static str])],
}

pub fn embedded_levels() -> Result<Vec<LevelDef>, LevelError> {
    EMBEDDED.iter().map(|level| {
        let mut layers = BTreeMap::new();
        for (kind, map) in level.layers {
            let rows = map.iter()
                .map(|line| line.chars().map(char_token).collect())
                .collect();
            layers.insert(*kind, Grid::from_rows(kind.name(), rows)?);
        }
        Ok(LevelDef { name: level.name.to_string(), layout: LevelLayout::Layered(layers) })
    }).collect()
}

fn char_token(ch: char) -> String {
    match ch.to_digit(16) {
        Some(index) => index.to_string(),
        None => EMPTY.to_string(),
    }
}

const EMBEDDED: &[Embedded] = &[
    Embedded {
        name: "Green Hills",
        layers: &[
            (LayerKind::Terrain, &[
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "..............................899a..............",
                "..........899a..................................",
                "................................................",
                "................................................",
                "01111111111111111112...0111111111111111111111112",
                "45555555555555555556...4555555555555555555555556",
            ]),
            (LayerKind::Background, &[
                "................................................",
                "....01.....................01...................",
                "...............0.........................0......",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
            ]),
            (LayerKind::BackDecor, &[
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                ".......d....................d.........d.........",
                ".......c....................c.........c.........",
                "................................................",
                "................................................",
            ]),
            (LayerKind::Grass, &[
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "..f..f...f....f..f.......f.........f....f...f...",
                "................................................",
                "................................................",
            ]),
            (LayerKind::Arrows, &[
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "...............................1................",
                "...........0....................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
            ]),
            (LayerKind::Enemies, &[
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "..........................0.....................",
                "................................................",
                "................................................",
            ]),
            (LayerKind::Constraints, &[
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "........................0......0................",
                "................................................",
                "................................................",
            ]),
            (LayerKind::Player, &[
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "...0............................................",
                ".............................................1..",
                "................................................",
                "................................................",
            ]),
        ],
    },
    Embedded {
        name: "Boar Ridge",
        layers: &[
            (LayerKind::Terrain, &[
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                ".................................89a............",
                "................................................",
                "..................8999a.................899a....",
                "................................................",
                "................................................",
                "01111111111201111111111112...0111111111111111112",
                "45555555555645555555555556...4555555555555555556",
            ]),
            (LayerKind::Background, &[
                "................................................",
                "......01.............................01.........",
                "......................0.........................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
            ]),
            (LayerKind::BackDecor, &[
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "...d.............................d..............",
                "...c.............................c..............",
                "................................................",
                "................................................",
            ]),
            (LayerKind::Grass, &[
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                ".f..f...f...........f..........f....f.........f.",
                "................................................",
                "................................................",
            ]),
            (LayerKind::Spikes, &[
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "..............eee...............................",
                "................................................",
                "................................................",
            ]),
            (LayerKind::Arrows, &[
                "................................................",
                "................................................",
                "................................................",
                "..................................1.............",
                "................................................",
                "...................0.0..........................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
            ]),
            (LayerKind::Enemies, &[
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                ".........................................0......",
                "................................................",
                "................................................",
                "......0...............................0.........",
                "................................................",
                "................................................",
            ]),
            (LayerKind::Constraints, &[
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                ".......................................0....0...",
                "................................................",
                "................................................",
                "....0......0..................0.............0...",
                "................................................",
                "................................................",
            ]),
            (LayerKind::Player, &[
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                "................................................",
                ".0..............................................",
                "..............................................1.",
                "................................................",
                "................................................",
            ]),
        ],
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::assets::stub::StubAssets;
    use crate::error::AssetError;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    fn grid(layer: LayerKind, csv: &str) -> Grid {
        Grid::parse_csv(layer.name(), csv).unwrap()
    }

    fn layered(layers: &[(LayerKind, &str)]) -> LevelDef {
        let layers = layers.iter().map(|(k, csv)| (*k, grid(*k, csv))).collect();
        LevelDef { name: "t".into(), layout: LevelLayout::Layered(layers) }
    }

    fn build(def: &LevelDef) -> Result<Level, LevelError> {
        build_level(def, LevelConfig::default(), &StubAssets::new(), &mut rng())
    }

    const PLAYER: (LayerKind, &str) = (LayerKind::Player, "-1,0\n-1,-1\n");

    // ── grids ──

    #[test]
    fn csv_trims_tokens_and_skips_blank_lines() {
        let g = grid(LayerKind::Terrain, " -1 , 3\n\n 4,-1 \n");
        assert_eq!(g, Grid::from_rows("terrain", vec![
            vec!["-1".into(), "3".into()],
            vec!["4".into(), "-1".into()],
        ]).unwrap());
        let cells: Vec<_> = g.cells().collect();
        assert_eq!(cells, vec![(0, 1, "3"), (1, 0, "4")]);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = Grid::parse_csv("grass", "1,2,3\n1,2\n").unwrap_err();
        assert!(matches!(
            err,
            LevelError::RaggedRow { ref layer, row: 1, expected: 3, actual: 2 } if layer == "grass"
        ));
    }

    // ── building ──

    #[test]
    fn tiles_are_placed_on_the_pixel_grid() {
        let def = layered(&[(LayerKind::Terrain, "-1,-1\n-1,5\n-1,-1\n"), PLAYER]);
        let level = build(&def).unwrap();
        assert_eq!(level.tiles.terrain.len(), 1);
        let tile = &level.tiles.terrain[0];
        assert_eq!((tile.rect.x, tile.rect.y, tile.rect.w), (64, 64, 64));
        assert_eq!(tile.image(), Some(ImageId(5)));
        assert_eq!((level.player.rect.x, level.player.rect.y), (64, 0));
    }

    #[test]
    fn sheet_tokens_must_be_in_range() {
        let def = layered(&[(LayerKind::Spikes, "16\n"), (LayerKind::Terrain, "-1\n"), PLAYER]);
        assert!(matches!(
            build(&def),
            Err(LevelError::TokenOutOfRange { index: 16, len: 16, .. })
        ));

        let def = layered(&[(LayerKind::Terrain, "x\n"), PLAYER]);
        assert!(matches!(
            build(&def),
            Err(LevelError::UnknownToken { ref token, .. }) if token == "x"
        ));
    }

    #[test]
    fn arrows_pick_variant_by_token() {
        let def = layered(&[(LayerKind::Terrain, "-1\n"), (LayerKind::Arrows, "0,1\n"), PLAYER]);
        let level = build(&def).unwrap();
        assert_eq!(level.tiles.arrows.len(), 2);
        assert!(level.tiles.arrows.iter().all(|s| matches!(s.visual, Visual::Animated(_))));

        let def = layered(&[(LayerKind::Terrain, "-1\n"), (LayerKind::Arrows, "2\n"), PLAYER]);
        assert!(matches!(build(&def), Err(LevelError::UnknownToken { row: 0, col: 0, .. })));
    }

    #[test]
    fn enemies_and_constraints() {
        let def = layered(&[
            (LayerKind::Terrain, "-1\n"),
            (LayerKind::Enemies, "0,-1,0,0\n"),
            (LayerKind::Constraints, "-1,0,-1,-1\n"),
            PLAYER,
        ]);
        let level = build(&def).unwrap();
        assert_eq!(level.enemies.len(), 3);
        assert!(level.enemies.iter().all(|e| e.speed == 1 || e.speed == 2));
        assert_eq!(level.enemies[1].rect().x, 128);
        assert_eq!(level.tiles.constraints.len(), 1);
        assert!(matches!(level.tiles.constraints[0].visual, Visual::Hidden));
    }

    #[test]
    fn player_layer_spawns_player_and_goal() {
        let def = layered(&[(LayerKind::Terrain, "-1\n"), (LayerKind::Player, "0,-1,1\n")]);
        let level = build(&def).unwrap();
        let goal = level.goal.as_ref().unwrap();
        assert_eq!(goal.rect.x, 128);
        assert_eq!(goal.image(), Some(ImageId(999)));
    }

    #[test]
    fn exactly_one_player_required() {
        let def = layered(&[(LayerKind::Terrain, "-1\n"), (LayerKind::Player, "-1,1\n")]);
        assert!(matches!(build(&def), Err(LevelError::MissingPlayer)));

        let def = layered(&[(LayerKind::Terrain, "-1\n"), (LayerKind::Player, "0,-1\n-1,0\n")]);
        assert!(matches!(build(&def), Err(LevelError::DuplicatePlayer { row: 1, col: 1 })));

        let def = layered(&[(LayerKind::Terrain, "-1\n"), (LayerKind::Player, "0,2\n")]);
        assert!(matches!(build(&def), Err(LevelError::UnknownToken { col: 1, .. })));
    }

    #[test]
    fn later_goal_replaces_earlier() {
        let def = layered(&[(LayerKind::Terrain, "-1\n"), (LayerKind::Player, "1,0,1\n")]);
        let level = build(&def).unwrap();
        assert_eq!(level.goal.unwrap().rect.x, 128);
    }

    #[test]
    fn missing_asset_is_fatal() {
        let def = layered(&[(LayerKind::Terrain, "1\n"), PLAYER]);
        let assets = StubAssets { missing: vec!["terrain/terrain"], ..StubAssets::new() };
        let err = build_level(&def, LevelConfig::default(), &assets, &mut rng()).unwrap_err();
        assert!(matches!(err, LevelError::Asset(AssetError::NotFound { .. })));
    }

    #[test]
    fn legacy_map_builds_blocks_and_player() {
        let rows = parse_legacy("   \n P\nXXXX\n\n");
        assert_eq!(rows, vec!["    ", " P  ", "XXXX"]);
        let def = LevelDef { name: "old".into(), layout: LevelLayout::Legacy(rows) };
        let level = build(&def).unwrap();
        assert_eq!(level.tiles.terrain.len(), 4);
        assert!(matches!(level.tiles.terrain[0].visual, Visual::Block));
        assert_eq!(level.tiles.terrain[3].rect.y, 128);
        assert_eq!((level.player.rect.x, level.player.rect.y), (64, 64));
        assert!(level.goal.is_none());
    }

    #[test]
    fn legacy_map_rejects_stray_characters() {
        let rows = parse_legacy(" P\nxxx\n");
        let def = LevelDef { name: "typo".into(), layout: LevelLayout::Legacy(rows) };
        assert!(matches!(
            build(&def),
            Err(LevelError::UnknownToken { ref layer, ref token, row: 1, col: 0 })
                if layer == "legacy" && token == "x"
        ));

        let rows = parse_legacy("..P.\nXXXX\n");
        let def = LevelDef { name: "dots".into(), layout: LevelLayout::Legacy(rows) };
        assert_eq!(build(&def).unwrap().tiles.terrain.len(), 4);
    }

    #[test]
    fn empty_animations_are_rejected() {
        let def = layered(&[(LayerKind::Terrain, "-1\n"), PLAYER]);
        let assets = StubAssets { frame_count: 0, ..StubAssets::new() };
        let err = build_level(&def, LevelConfig::default(), &assets, &mut rng()).unwrap_err();
        assert!(matches!(err, LevelError::Asset(AssetError::Empty { .. })));
    }

    #[test]
    #[should_panic(expected = "enemies is not a tile layer")]
    fn only_tile_layers_take_sprites() {
        Builder::new(64).place(LayerKind::Enemies, 0, 0, Visual::Hidden);
    }

    #[test]
    fn enemies_and_spawns_stay_out_of_terrain() {
        let def = layered(&[
            (LayerKind::Terrain, "-1,-1\n"),
            (LayerKind::Enemies, "0,0\n"),
            (LayerKind::Player, "0,1\n"),
        ]);
        let level = build(&def).unwrap();
        assert!(level.tiles.terrain.is_empty());
        assert_eq!(level.enemies.len(), 2);
    }

    #[test]
    fn embedded_levels_all_build() {
        let levels = embedded_levels().unwrap();
        assert!(levels.len() >= 2);
        for def in &levels {
            let level = build(def).unwrap();
            assert!(!level.tiles.terrain.is_empty());
            assert!(level.goal.is_some(), "{} has no goal", def.name);
        }
    }

    // ── manifests ──

    fn write(dir: &Path, name: &str, text: &str) {
        std::fs::write(dir.join(name), text).unwrap();
    }

    #[test]
    fn manifest_loads_layers_relative_to_itself() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("01-first");
        std::fs::create_dir(&dir).unwrap();
        write(&dir, "level.toml", "name = \"First\"\n[layers]\nterrain = \"t.csv\"\nplayer = \"p.csv\"\ngrass = \"g.csv\"\n");
        write(&dir, "t.csv", "-1,-1\n0,1\n");
        write(&dir, "p.csv", "0,-1\n-1,-1\n");
        write(&dir, "g.csv", "3,-1\n-1,-1\n");

        let def = load_manifest(&dir.join("level.toml")).unwrap();
        assert_eq!(def.name, "First");
        let level = build(&def).unwrap();
        assert_eq!(level.tiles.terrain.len(), 2);
        assert_eq!(level.tiles.grass.len(), 1);
        assert!(level.tiles.spikes.is_empty());
    }

    #[test]
    fn manifest_requires_terrain_and_player() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "level.toml", "[layers]\nplayer = \"p.csv\"\n");
        write(tmp.path(), "p.csv", "0\n");
        assert!(matches!(
            load_manifest(&tmp.path().join("level.toml")),
            Err(LevelError::MissingLayer("terrain"))
        ));
    }

    #[test]
    fn manifest_errors_name_the_file() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "level.toml", "name = [\n");
        assert!(matches!(
            load_manifest(&tmp.path().join("level.toml")),
            Err(LevelError::Manifest { .. })
        ));

        write(tmp.path(), "level.toml", "[layers]\nterrain = \"nope.csv\"\nplayer = \"p.csv\"\n");
        let err = load_manifest(&tmp.path().join("level.toml")).unwrap_err();
        assert!(matches!(err, LevelError::Io { ref path, .. } if path.ends_with("nope.csv")));
    }

    #[test]
    fn legacy_manifest_and_default_name() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("classic");
        std::fs::create_dir(&dir).unwrap();
        write(&dir, "level.toml", "legacy_map = \"map.txt\"\n");
        write(&dir, "map.txt", " P\nXXX\n");

        let def = load_manifest(&dir.join("level.toml")).unwrap();
        assert_eq!(def.name, "classic");
        assert!(matches!(def.layout, LevelLayout::Legacy(ref rows) if rows.len() == 2));
    }

    #[test]
    fn discovery_sorts_by_directory_and_falls_back_to_embedded() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(discover_levels(&tmp.path().join("missing")).unwrap().is_empty());
        let embedded = embedded_levels().unwrap().len();
        assert_eq!(load_levels(tmp.path()).unwrap().len(), embedded);

        for (dir, name) in [("b", "Second"), ("a", "First")] {
            let dir = tmp.path().join(dir);
            std::fs::create_dir(&dir).unwrap();
            write(&dir, "level.toml", &format!("name = \"{name}\"\nlegacy_map = \"m.txt\"\n"));
            write(&dir, "m.txt", "P\n");
        }
        std::fs::create_dir(tmp.path().join("not-a-level")).unwrap();

        let names: Vec<_> = load_levels(tmp.path()).unwrap().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["First", "Second"]);
    }
}
