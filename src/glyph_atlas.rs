//! Built-in 5x7 bitmap glyphs for the brightness ramp and the ASCII surface
//! painter.

use tiny_skia::{Pixmap, PremultipliedColorU8};

use crate::error::{GlyphcamError, GlyphcamResult};
use crate::glyph::{GlyphGrid, CELL_HEIGHT, CELL_WIDTH};

pub const GLYPH_WIDTH: u32 = 5;
pub const GLYPH_HEIGHT: u32 = 7;

/// Glyph origin inside its 6x10 cell.
const GLYPH_OFFSET_X: u32 = 0;
const GLYPH_OFFSET_Y: u32 = 2;

type GlyphRows = [&'static str; GLYPH_HEIGHT as usize];

const GLYPHS: [(u8, GlyphRows); 11] = [
    (
        b'@',
        [".###.", "#...#", "#.###", "#.#.#", "#.###", "#....", ".###."],
    ),
    (
        b'#',
        [".#.#.", ".#.#.", "#####", ".#.#.", "#####", ".#.#.", ".#.#."],
    ),
    (
        b'S',
        [".####", "#....", "#....", ".###.", "....#", "....#", "####."],
    ),
    (
        b'%',
        ["##..#", "##..#", "...#.", "..#..", ".#...", "#..##", "#..##"],
    ),
    (
        b'?',
        [".###.", "#...#", "....#", "...#.", "..#..", ".....", "..#.."],
    ),
    (
        b'*',
        [".....", "..#..", "#.#.#", ".###.", "#.#.#", "..#..", "....."],
    ),
    (
        b'+',
        [".....", "..#..", "..#..", "#####", "..#..", "..#..", "....."],
    ),
    (
        b';',
        [".....", "..##.", "..##.", ".....", "..##.", "...#.", "..#.."],
    ),
    (
        b':',
        [".....", "..##.", "..##.", ".....", "..##.", "..##.", "....."],
    ),
    (
        b',',
        [".....", ".....", ".....", ".....", "..##.", "...#.", "..#.."],
    ),
    (
        b'.',
        [".....", ".....", ".....", ".....", ".....", "..##.", "..##."],
    ),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct RampAtlas;

impl RampAtlas {
    pub fn glyph_width(&self) -> u32 {
        GLYPH_WIDTH
    }

    pub fn glyph_height(&self) -> u32 {
        GLYPH_HEIGHT
    }

    pub fn contains(&self, character: u8) -> bool {
        glyph_rows(character).is_some()
    }

    /// `false` outside the glyph box and for characters with no bitmap.
    pub fn sample(&self, character: u8, x: u32, y: u32) -> bool {
        if x >= GLYPH_WIDTH || y >= GLYPH_HEIGHT {
            return false;
        }
        glyph_rows(character)
            .map(|rows| rows[y as usize].as_bytes()[x as usize] == b'#')
            .unwrap_or(false)
    }

    pub fn coverage(&self, character: u8) -> u32 {
        let mut count = 0;
        for y in 0..GLYPH_HEIGHT {
            for x in 0..GLYPH_WIDTH {
                if self.sample(character, x, y) {
                    count += 1;
                }
            }
        }
        count
    }

    /// Paint `grid` at the fixed cell pitch onto a transparent surface.
    pub fn render_grid(&self, grid: &GlyphGrid, color: [u8; 4]) -> GlyphcamResult<Pixmap> {
        let width = grid.width() as u32 * CELL_WIDTH;
        let height = grid.height() as u32 * CELL_HEIGHT;
        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            GlyphcamError::encode(format!("failed to allocate ascii surface {width}x{height}"))
        })?;
        let ink = PremultipliedColorU8::from_rgba(
            mul_div_255(color[0], color[3]),
            mul_div_255(color[1], color[3]),
            mul_div_255(color[2], color[3]),
            color[3],
        )
        .ok_or_else(|| GlyphcamError::encode("glyph color is not premultiplied"))?;

        for (row, cells) in grid.rows().enumerate() {
            for (column, &character) in cells.iter().enumerate() {
                let origin_x = column as u32 * CELL_WIDTH + GLYPH_OFFSET_X;
                let origin_y = row as u32 * CELL_HEIGHT + GLYPH_OFFSET_Y;
                self.paint_glyph(&mut pixmap, origin_x, origin_y, character, ink);
            }
        }

        Ok(pixmap)
    }

    fn paint_glyph(
        &self,
        pixmap: &mut Pixmap,
        origin_x: u32,
        origin_y: u32,
        character: u8,
        ink: PremultipliedColorU8,
    ) {
        let Some(rows) = glyph_rows(character) else {
            return;
        };
        let surface_width = pixmap.width();
        let surface_height = pixmap.height();
        let pixels = pixmap.pixels_mut();

        for (y, row) in rows.iter().enumerate() {
            let py = origin_y + y as u32;
            if py >= surface_height {
                break;
            }
            for (x, mark) in row.bytes().enumerate() {
                let px = origin_x + x as u32;
                if mark != b'#' || px >= surface_width {
                    continue;
                }
                if let Some(pixel) = pixels.get_mut((py * surface_width + px) as usize) {
                    *pixel = ink;
                }
            }
        }
    }
}

fn glyph_rows(character: u8) -> Option<&'static GlyphRows> {
    GLYPHS
        .iter()
        .find(|(glyph, _)| *glyph == character)
        .map(|(_, rows)| rows)
}

fn mul_div_255(channel: u8, alpha: u8) -> u8 {
    ((u16::from(channel) * u16::from(alpha) + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::GLYPH_RAMP;

    #[test]
    fn every_ramp_character_has_a_bitmap() {
        let atlas = RampAtlas;
        for &character in GLYPH_RAMP {
            assert!(atlas.contains(character), "missing {}", char::from(character));
            assert!(atlas.coverage(character) > 0);
        }
        assert!(!atlas.contains(b'A'));
    }

    #[test]
    fn ramp_ends_are_densest_and_sparsest() {
        let atlas = RampAtlas;
        let dense = atlas.coverage(b'@').max(atlas.coverage(b'#'));
        let sparse = atlas.coverage(b'.');
        assert!(dense > sparse);
        assert!(GLYPH_RAMP.iter().all(|&c| atlas.coverage(c) >= sparse));
    }

    #[test]
    fn rendered_grid_uses_cell_pitch() {
        let grid = GlyphGrid::from_frame(&crate::raster::RasterFrame::solid(
            2,
            1,
            [255, 255, 255, 255],
        ));
        let pixmap = RampAtlas
            .render_grid(&grid, [255, 255, 255, 255])
            .expect("surface should render");
        assert_eq!(pixmap.width(), 12);
        assert_eq!(pixmap.height(), 10);

        // '.' lights columns 2..4 of rows 5..7 in each cell.
        let lit = |x: u32, y: u32| pixmap.pixels()[(y * 12 + x) as usize].alpha() == 255;
        assert!(lit(2, 7) && lit(3, 8));
        assert!(lit(8, 7) && lit(9, 8));
        assert!(!lit(0, 0) && !lit(6, 2));
    }
}
