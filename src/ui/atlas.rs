/// Glyph atlas: the terminal's stand-in for decoded images.
///
/// Every `ImageId` handed out is an index into a table of two-column glyphs.
/// Asset keys resolve to sheets (indexed by tile token), animations, or
/// single images, exactly as a pixel asset loader would.

use std::collections::HashMap;

use crossterm::style::Color;

use crate::domain::assets::{AssetSource, ImageId};
use crate::error::AssetError;

/// One tile as two terminal columns. `bg: None` keeps whatever is underneath.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Glyph {
    pub chars: [char; 2],
    pub fg: Color,
    pub bg: Option<Color>,
}

impl Glyph {
    const fn new(s: [char; 2], fg: Color, bg: Option<Color>) -> Self {
        Glyph { chars: s, fg, bg }
    }

    /// Mirror horizontally: swap the columns and turn directional characters.
    pub fn flipped(self) -> Self {
        let [a, b] = self.chars;
        Glyph { chars: [mirror(b), mirror(a)], ..self }
    }
}

fn mirror(c: char) -> char {
    match c {
        '<' => '>',
        '>' => '<',
        '«' => '»',
        '»' => '«',
        '(' => ')',
        ')' => '(',
        '/' => '\\',
        '\\' => '/',
        '▌' => '▐',
        '▐' => '▌',
        '▛' => '▜',
        '▜' => '▛',
        other => other,
    }
}

#[derive(Clone, Debug)]
enum Entry {
    Sheet(Vec<ImageId>),
    Frames(Vec<ImageId>),
    Image(ImageId),
}

#[derive(Clone, Debug)]
pub struct GlyphAtlas {
    glyphs: Vec<Glyph>,
    entries: HashMap<&'static str, Entry>,
}

// ── Palette ──

const GRASS: Color = Color::Rgb { r: 92, g: 184, b: 72 };
const SOIL: Color = Color::Rgb { r: 120, g: 78, b: 44 };
const SOIL_DARK: Color = Color::Rgb { r: 84, g: 54, b: 30 };
const STONE: Color = Color::Rgb { r: 128, g: 128, b: 140 };
const WOOD: Color = Color::Rgb { r: 150, g: 100, b: 56 };
const LEAF: Color = Color::Rgb { r: 46, g: 130, b: 60 };
const CLOUD: Color = Color::Rgb { r: 235, g: 240, b: 250 };
const GOLD: Color = Color::Rgb { r: 240, g: 196, b: 40 };
const DUST: Color = Color::Rgb { r: 200, g: 190, b: 170 };

impl GlyphAtlas {
    pub fn new() -> Self {
        let mut atlas = GlyphAtlas { glyphs: Vec::new(), entries: HashMap::new() };
        let g = Glyph::new;

        atlas.add_sheet("terrain/terrain", &[
            g(['▛', '▀'], GRASS, Some(SOIL)),        // 0  surface, left end
            g(['▀', '▀'], GRASS, Some(SOIL)),        // 1  surface
            g(['▀', '▜'], GRASS, Some(SOIL)),        // 2  surface, right end
            g(['▀', '▀'], GRASS, Some(SOIL_DARK)),   // 3
            g(['▌', '░'], SOIL_DARK, Some(SOIL)),    // 4  soil, left edge
            g(['░', '░'], SOIL_DARK, Some(SOIL)),    // 5  soil
            g(['░', '▐'], SOIL_DARK, Some(SOIL)),    // 6  soil, right edge
            g(['▓', '▓'], STONE, Some(SOIL_DARK)),   // 7  stone
            g(['▛', '▀'], GRASS, Some(WOOD)),        // 8  ledge, left end
            g(['▀', '▀'], GRASS, Some(WOOD)),        // 9  ledge
            g(['▀', '▜'], GRASS, Some(WOOD)),        // 10 ledge, right end
            g(['▒', '▒'], STONE, None),              // 11 rubble
            g(['▐', '▌'], WOOD, None),               // 12 trunk
            g(['♣', '♣'], LEAF, None),               // 13 canopy
            g(['▲', '▲'], STONE, None),              // 14 spikes
            g(['"', '"'], GRASS, None),              // 15 tuft
        ]);
        atlas.add_sheet("background", &[
            g(['░', '░'], CLOUD, None),
            g(['▒', '░'], CLOUD, None),
            g(['·', ' '], CLOUD, None),
            g([' ', '·'], CLOUD, None),
        ]);
        atlas.add_frames("items/arrows", &[
            g(['↑', ' '], Color::White, None),
            g([' ', '↑'], Color::White, None),
        ]);
        atlas.add_frames("items/arrows_gold", &[
            g(['↑', ' '], GOLD, None),
            g([' ', '↑'], GOLD, None),
        ]);
        // Boars face left; the runtime flips them while walking right.
        atlas.add_frames("enemy/boar", &[
            g(['<', 'B'], Color::Red, None),
            g(['<', 'b'], Color::Red, None),
        ]);
        // The player faces right; flipped when facing left.
        atlas.add_frames("character/idle", &[
            g(['@', ' '], Color::Cyan, None),
            g(['@', '.'], Color::Cyan, None),
        ]);
        atlas.add_frames("character/run", &[
            g(['@', '>'], Color::Cyan, None),
            g(['@', '»'], Color::Cyan, None),
        ]);
        atlas.add_frames("character/jump", &[g(['@', '^'], Color::Cyan, None)]);
        atlas.add_frames("character/fall", &[g(['@', 'v'], Color::Cyan, None)]);
        atlas.add_image("character/end", g(['|', '>'], GOLD, None));
        atlas.add_frames("dust/jump", &[
            g(['°', '°'], DUST, None),
            g(['·', '·'], DUST, None),
            g(['.', ' '], DUST, None),
        ]);
        atlas.add_frames("dust/land", &[
            g(['~', '~'], DUST, None),
            g(['-', '-'], DUST, None),
            g(['.', '.'], DUST, None),
        ]);

        atlas
    }

    fn push(&mut self, glyphs: &[Glyph]) -> Vec<ImageId> {
        glyphs.iter().map(|glyph| {
            self.glyphs.push(*glyph);
            ImageId(self.glyphs.len() as u32 - 1)
        }).collect()
    }

    fn add_sheet(&mut self, key: &'static str, glyphs: &[Glyph]) {
        let ids = self.push(glyphs);
        self.entries.insert(key, Entry::Sheet(ids));
    }

    fn add_frames(&mut self, key: &'static str, glyphs: &[Glyph]) {
        let ids = self.push(glyphs);
        self.entries.insert(key, Entry::Frames(ids));
    }

    fn add_image(&mut self, key: &'static str, glyph: Glyph) {
        let ids = self.push(&[glyph]);
        self.entries.insert(key, Entry::Image(ids[0]));
    }

    pub fn glyph(&self, id: ImageId) -> Option<Glyph> {
        self.glyphs.get(id.0 as usize).copied()
    }

    fn entry(&self, key: &str) -> Result<&Entry, AssetError> {
        self.entries.get(key).ok_or_else(|| AssetError::NotFound { key: key.to_string() })
    }
}

impl AssetSource for GlyphAtlas {
    fn sheet(&self, key: &str) -> Result<Vec<ImageId>, AssetError> {
        match self.entry(key)? {
            Entry::Sheet(ids) => Ok(ids.clone()),
            _ => Err(AssetError::NotFound { key: key.to_string() }),
        }
    }

    fn frames(&self, key: &str) -> Result<Vec<ImageId>, AssetError> {
        let ids = match self.entry(key)? {
            Entry::Frames(ids) => ids.clone(),
            Entry::Image(id) => vec![*id],
            Entry::Sheet(_) => return Err(AssetError::NotFound { key: key.to_string() }),
        };
        if ids.is_empty() {
            return Err(AssetError::Empty { key: key.to_string() });
        }
        Ok(ids)
    }

    fn image(&self, key: &str) -> Result<ImageId, AssetError> {
        match self.entry(key)? {
            Entry::Image(id) => Ok(*id),
            Entry::Frames(ids) | Entry::Sheet(ids) => ids.first()
                .copied()
                .ok_or_else(|| AssetError::Empty { key: key.to_string() }),
        }
    }
}
