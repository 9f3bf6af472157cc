use glyphcam::compositor::PIXEL_SURFACE_SIZE;
use glyphcam::filter::PixelFilter;
use glyphcam::glyph::{ASCII_GRID_COLUMNS, ASCII_GRID_ROWS};
use glyphcam::palette::{extract_palette, PALETTE_SIZE};
use glyphcam::pipeline::{AsciiPipeline, PixelPipeline, PixelSettings};
use glyphcam::source::StillSource;
use image::{Rgba, RgbaImage};

fn solid(width: u32, height: u32, rgba: [u8; 4]) -> StillSource {
    StillSource::new(RgbaImage::from_pixel(width, height, Rgba(rgba)))
}

#[test]
fn invert_on_white_gives_black_raster_and_surface() {
    let mut source = solid(640, 480, [255, 255, 255, 255]);
    let mut pipeline = PixelPipeline::new(Some(1)).expect("pipeline");
    let settings = PixelSettings {
        filter: PixelFilter::Invert,
        resolution: 4,
    };

    let frame = pipeline
        .filtered_frame(&mut source, settings)
        .expect("filtered frame");
    assert_eq!(frame.pixel_count(), 16);
    assert!(frame.pixels().all(|px| px == [0, 0, 0, 255]));

    let surface = pipeline.tick(&mut source, settings).expect("tick");
    assert_eq!(surface.width(), PIXEL_SURFACE_SIZE);
    assert_eq!(surface.height(), PIXEL_SURFACE_SIZE);
    for (x, y) in [(0, 0), (250, 250), (499, 499)] {
        let px = surface.pixel(x, y).expect("in bounds");
        assert_eq!((px.red(), px.green(), px.blue(), px.alpha()), (0, 0, 0, 255));
    }
}

#[test]
fn black_frame_maps_every_cell_to_densest_glyph() {
    let mut source = solid(100, 75, [0, 0, 0, 255]);
    let mut pipeline = AsciiPipeline::new();
    pipeline.tick(&mut source).expect("tick");

    let grid = pipeline.last_grid().expect("grid");
    assert_eq!(grid.width(), ASCII_GRID_COLUMNS as usize);
    assert_eq!(grid.height(), ASCII_GRID_ROWS as usize);
    assert!(grid.cells().iter().all(|&glyph| glyph == b'@'));

    let text = grid.to_text();
    assert_eq!(text.lines().count(), ASCII_GRID_ROWS as usize);
    assert!(text.lines().all(|line| line.len() == ASCII_GRID_COLUMNS as usize));
}

#[test]
fn palette_always_has_twelve_entries() {
    for (width, height) in [(10, 10), (1920, 1080), (300, 300)] {
        let image = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 40, 255])
        });
        let palette = extract_palette(&image);
        assert_eq!(palette.colors().len(), PALETTE_SIZE);
        assert_eq!(palette.to_hex_strings().len(), PALETTE_SIZE);
    }
}

#[test]
fn solid_image_palette_repeats_one_color() {
    let image = RgbaImage::from_pixel(300, 300, Rgba([12, 200, 99, 255]));
    let palette = extract_palette(&image);
    assert!(palette.to_hex_strings().iter().all(|hex| hex == "#0cc863"));
}

#[test]
fn previous_frame_tracks_every_filter_and_feeds_motion_trail() {
    let mut pipeline = PixelPipeline::new(Some(3)).expect("pipeline");
    let mut red = solid(16, 16, [255, 0, 0, 255]);

    let grayscale = PixelSettings {
        filter: PixelFilter::Grayscale,
        resolution: 2,
    };
    pipeline.tick(&mut red, grayscale).expect("tick");
    let previous = pipeline.previous_frame().expect("previous frame");
    assert_eq!(previous.pixel(0, 0), Some([85, 85, 85, 255]));

    // A fully transparent current frame leaves only the trail visible.
    let mut clear = solid(16, 16, [0, 0, 0, 0]);
    let trail = PixelSettings {
        filter: PixelFilter::MotionTrail,
        resolution: 2,
    };
    let surface = pipeline.tick(&mut clear, trail).expect("tick");
    let px = surface.pixel(100, 100).expect("in bounds").demultiply();
    assert!((49..=53).contains(&px.alpha()), "alpha {}", px.alpha());
    assert!((83..=87).contains(&px.red()), "red {}", px.red());

    assert_eq!(
        pipeline.previous_frame().and_then(|frame| frame.pixel(0, 0)),
        Some([0, 0, 0, 0])
    );
}

#[test]
fn non_trail_filters_never_show_previous_frame() {
    let mut pipeline = PixelPipeline::new(Some(3)).expect("pipeline");
    let settings = PixelSettings {
        filter: PixelFilter::None,
        resolution: 2,
    };
    pipeline
        .tick(&mut solid(8, 8, [255, 255, 255, 255]), settings)
        .expect("tick");
    let surface = pipeline
        .tick(&mut solid(8, 8, [0, 0, 0, 0]), settings)
        .expect("tick");
    assert_eq!(surface.pixel(10, 10).expect("in bounds").alpha(), 0);
}
