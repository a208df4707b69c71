/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How a frame is produced:
///   1. `begin_frame` clears the `front` buffer to the sky colour
///   2. The level draws itself through the `Surface` impl (painter's order)
///   3. `finish_frame` adds the HUD and help rows, then emits only the
///      cells that differ from `back` (the previous frame), batched with
///      `queue!` and flushed once
///   4. Swap front/back
///
/// Pixel space maps onto the terminal at one tile = 2 columns × 1 row.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::config::LevelConfig;
use crate::domain::assets::{ImageId, Surface};
use crate::domain::entity::Bounds;
use crate::domain::geom::Rect;
use super::atlas::{Glyph, GlyphAtlas};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Every cell carries an explicit background so terminals never show
    /// their own default between rows.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };
    const SKY: Color = Color::Rgb { r: 70, g: 120, b: 190 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Differs from any real cell; forces a full repaint.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell { ch: ' ', fg: Color::White, bg });
        }
    }

    /// One column per char.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            self.set(x + i, y, Cell { ch, fg, bg });
        }
    }
}

// ── HUD ──

/// What the status rows show besides the level itself.
pub struct Hud<'a> {
    pub level_name: &'a str,
    pub level_index: usize,
    pub level_count: usize,
    pub bounds: Bounds,
    pub paused: bool,
    pub message: &'a str,
}

// ── Renderer ──

const CELL_W: i32 = 2;
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;
const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const BLOCK_FG: Color = Color::Rgb { r: 150, g: 150, b: 150 };
const BLOCK_BG: Color = Color::Rgb { r: 90, g: 90, b: 90 };

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    atlas: GlyphAtlas,
    tile_size: i32,
    /// Playfield size in terminal cells, before clipping to the terminal.
    view_cols: usize,
    view_rows: usize,
    /// Set once the terminal accepted key release reporting.
    enhanced: bool,
}

impl Renderer {
    pub fn new(atlas: GlyphAtlas, level: &LevelConfig) -> Self {
        let tile = level.tile_size.max(1);
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            atlas,
            tile_size: tile,
            view_cols: (level.screen_width * CELL_W / tile).max(0) as usize,
            view_rows: (level.screen_height / tile).max(0) as usize,
            enhanced: false,
        }
    }

    pub fn atlas(&self) -> &GlyphAtlas {
        &self.atlas
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;
        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            let flags = KeyboardEnhancementFlags::REPORT_EVENT_TYPES;
            self.enhanced = execute!(self.writer, PushKeyboardEnhancementFlags(flags)).is_ok();
        }
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.enhanced {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    /// Does the terminal report key releases?
    pub fn reports_releases(&self) -> bool {
        self.enhanced
    }

    /// Start a frame sized to the current terminal.
    pub fn begin_frame(&mut self) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if self.prepare(tw as usize, th as usize) {
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }
        Ok(())
    }

    /// Resize and clear the front buffer. Returns true when the size changed.
    fn prepare(&mut self, term_w: usize, term_h: usize) -> bool {
        let resized = self.front.width != term_w || self.front.height != term_h;
        if resized {
            self.front.resize(term_w, term_h);
            self.back.resize(term_w, term_h);
            self.back.cells.fill(Cell::INVALID);
        }
        self.front.cells.fill(Cell::BLANK);
        for row in 0..self.view_rows {
            for col in 0..self.view_cols {
                self.front.set(col, MAP_ROW + row, Cell { ch: ' ', fg: Color::White, bg: Cell::SKY });
            }
        }
        resized
    }

    pub fn finish_frame(&mut self, hud: &Hud) -> io::Result<()> {
        self.compose_hud(hud);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    /// Re-present the previous frame with a fresh HUD (used while paused).
    pub fn hold_frame(&mut self, hud: &Hud) -> io::Result<()> {
        self.front.cells.clone_from(&self.back.cells);
        self.compose_hud(hud);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Compose ──

    /// Top-left terminal cell of a pixel rect, relative to the playfield.
    fn cell_of(&self, rect: Rect) -> (i32, i32) {
        (
            (rect.x * CELL_W).div_euclid(self.tile_size),
            rect.y.div_euclid(self.tile_size),
        )
    }

    /// Playfield cell → buffer position, or None when clipped.
    fn to_buffer(&self, col: i32, row: i32) -> Option<(usize, usize)> {
        if col < 0 || row < 0 || col as usize >= self.view_cols || row as usize >= self.view_rows {
            return None;
        }
        Some((col as usize, MAP_ROW + row as usize))
    }

    fn put_glyph(&mut self, rect: Rect, glyph: Glyph) {
        let (col, row) = self.cell_of(rect);
        for (i, ch) in glyph.chars.into_iter().enumerate() {
            let Some((x, y)) = self.to_buffer(col + i as i32, row) else { continue };
            let under = self.front.get(x, y);
            // A transparent space leaves the cell untouched.
            if ch == ' ' && glyph.bg.is_none() {
                continue;
            }
            self.front.set(x, y, Cell { ch, fg: glyph.fg, bg: glyph.bg.unwrap_or(under.bg) });
        }
    }

    fn compose_hud(&mut self, hud: &Hud) {
        self.front.fill_row(HUD_ROW, HUD_BG);
        let flag = |on: bool, c: char| if on { c } else { '·' };
        let b = hud.bounds;
        let title = format!(
            " {} ({}/{})   [{}{}{}{}] ",
            hud.level_name,
            hud.level_index + 1,
            hud.level_count,
            flag(b.on_left, 'L'),
            flag(b.on_ground, 'G'),
            flag(b.on_ceiling, 'C'),
            flag(b.on_right, 'R'),
        );
        self.front.put_str(0, HUD_ROW, &title, Color::White, HUD_BG);

        let status_row = MAP_ROW + self.view_rows + 1;
        let status = if hud.paused { "PAUSED  [F1/P] Resume" } else { hud.message };
        if !status.is_empty() {
            self.front.put_str(1, status_row, status, Color::Rgb { r: 255, g: 220, b: 50 }, Cell::BASE_BG);
        }

        let help = " ←/A →/D: Walk   Space/W/↑: Jump   F1/P: Pause   R: Restart   Esc/Q: Quit";
        self.front.put_str(0, status_row + 1, help, Color::DarkGrey, Cell::BASE_BG);
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }
                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }
}

impl Surface for Renderer {
    fn draw(&mut self, rect: Rect, image: ImageId, flip_x: bool) {
        let Some(glyph) = self.atlas.glyph(image) else { return };
        let glyph = if flip_x { glyph.flipped() } else { glyph };
        self.put_glyph(rect, glyph);
    }

    fn fill(&mut self, rect: Rect) {
        self.put_glyph(rect, Glyph { chars: ['█', '▉'], fg: BLOCK_FG, bg: Some(BLOCK_BG) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::assets::AssetSource;

    fn renderer() -> Renderer {
        let mut r = Renderer::new(GlyphAtlas::new(), &LevelConfig::default());
        r.prepare(80, 24);
        r
    }

    fn row_text(r: &Renderer, y: usize, from: usize, len: usize) -> String {
        (from..from + len).map(|x| r.front.get(x, y).ch).collect()
    }

    #[test]
    fn playfield_matches_screen_in_cells() {
        let r = renderer();
        // 1200px / 64px = 18.75 tiles → 37 columns, 704px → 11 rows
        assert_eq!((r.view_cols, r.view_rows), (37, 11));
        assert_eq!(r.front.get(0, MAP_ROW).bg, Cell::SKY);
        assert_eq!(r.front.get(37, MAP_ROW).bg, Cell::BASE_BG);
    }

    #[test]
    fn tiles_land_two_columns_per_tile() {
        let mut r = renderer();
        let boar = r.atlas().frames("enemy/boar").unwrap()[0];
        r.draw(Rect::new(128, 64, 64, 64), boar, false);
        assert_eq!(row_text(&r, MAP_ROW + 1, 4, 2), "<B");

        r.draw(Rect::new(128, 64, 64, 64), boar, true);
        assert_eq!(row_text(&r, MAP_ROW + 1, 4, 2), "B>");
    }

    #[test]
    fn offscreen_and_partial_sprites_are_clipped() {
        let mut r = renderer();
        r.fill(Rect::new(-32, 0, 64, 64));
        assert_eq!(r.front.get(0, MAP_ROW).ch, '▉');

        r.fill(Rect::new(5000, 0, 64, 64));
        r.fill(Rect::new(0, -64, 64, 64));
        assert_eq!(r.front.get(37, MAP_ROW).ch, ' ');
        assert_eq!(r.front.get(0, MAP_ROW - 1).ch, ' ');
    }

    #[test]
    fn transparent_glyph_keeps_background() {
        let mut r = renderer();
        let idle = r.atlas().frames("character/idle").unwrap()[0];
        r.draw(Rect::new(0, 0, 50, 64), idle, false);
        let cell = r.front.get(0, MAP_ROW);
        assert_eq!((cell.ch, cell.bg), ('@', Cell::SKY));
        assert_eq!(r.front.get(1, MAP_ROW).ch, ' ');
    }

    #[test]
    fn hud_shows_name_and_flags() {
        let mut r = renderer();
        let hud = Hud {
            level_name: "Green Hills",
            level_index: 0,
            level_count: 2,
            bounds: Bounds { on_ground: true, ..Bounds::default() },
            paused: false,
            message: "",
        };
        r.compose_hud(&hud);
        let line = row_text(&r, HUD_ROW, 0, 30);
        assert!(line.contains("Green Hills (1/2)"));
        assert!(line.contains("[·G··]"));
    }
}
