//! Shelf packing of charts into the atlas.

use glam::Vec2;

use super::charts::Chart;
use super::PackOptions;
use crate::util::{Error, Result};

/// Share of the atlas the charts are expected to cover.
const FILL_RATIO: f64 = 0.75;

/// Atlas width used when neither resolution nor texel density is given.
const DEFAULT_RESOLUTION: u32 = 1024;

/// Largest atlas side, in pixels.
pub const MAX_ATLAS_SIZE: u32 = 16384;

pub(crate) struct Layout {
    pub width: u32,
    pub height: u32,
    pub texels_per_unit: f32,
    /// Pixel origin of each chart's interior (past the padding).
    pub offsets: Vec<Vec2>,
}

/// Pixel density. A derived density is clamped so the largest chart
/// still fits in [`MAX_ATLAS_SIZE`]; an explicit one is used as given.
fn texels_per_unit(charts: &[Chart], options: &PackOptions) -> f64 {
    if options.texels_per_unit > 0.0 {
        return options.texels_per_unit as f64;
    }
    let area: f64 = charts.iter().map(|c| c.area as f64).sum();
    if area <= f32::EPSILON as f64 {
        return 1.0;
    }
    let target = if options.resolution > 0 { options.resolution } else { DEFAULT_RESOLUTION };
    let tpu = target as f64 * (FILL_RATIO / area).sqrt();

    let largest = charts
        .iter()
        .map(|c| c.extent.x.max(c.extent.y) as f64)
        .fold(0.0, f64::max);
    // One pixel of slack for the ceil below.
    let room = MAX_ATLAS_SIZE as f64 - 2.0 * options.padding as f64 - 1.0;
    if largest > 0.0 && room > 0.0 {
        tpu.min(room / largest)
    } else {
        tpu
    }
}

fn too_large(width: f64, height: f64) -> Error {
    Error::AtlasTooLarge {
        width: width.min(u64::MAX as f64) as u64,
        height: height.min(u64::MAX as f64) as u64,
        max: MAX_ATLAS_SIZE,
    }
}

pub(crate) fn pack(charts: &[Chart], options: &PackOptions) -> Result<Layout> {
    let tpu = texels_per_unit(charts, options);
    let padding = options.padding as u64;
    let max = MAX_ATLAS_SIZE as u64;

    // Padded chart sizes in whole pixels.
    let mut sizes: Vec<(u64, u64)> = Vec::with_capacity(charts.len());
    for c in charts {
        let w = (c.extent.x as f64 * tpu).ceil().max(1.0) + 2.0 * padding as f64;
        let h = (c.extent.y as f64 * tpu).ceil().max(1.0) + 2.0 * padding as f64;
        // NaN fails this test too.
        if !(w <= max as f64 && h <= max as f64) {
            return Err(too_large(w, h));
        }
        sizes.push((w as u64, h as u64));
    }

    let widest = sizes.iter().map(|s| s.0).max().unwrap_or(1);
    let shelf_limit = if options.resolution > 0 {
        (options.resolution as u64).max(widest)
    } else {
        let total: u64 = sizes.iter().map(|&(w, h)| w * h).sum();
        ((total as f64).sqrt().ceil() as u64).max(widest)
    };

    // Tallest first; ties keep chart order.
    let mut order: Vec<usize> = (0..charts.len()).collect();
    order.sort_by(|&a, &b| sizes[b].1.cmp(&sizes[a].1));

    let mut offsets = vec![Vec2::ZERO; charts.len()];
    let (mut x, mut y, mut shelf_height, mut width) = (0u64, 0u64, 0u64, 0u64);
    for index in order {
        let (w, h) = sizes[index];
        if x > 0 && x + w > shelf_limit {
            y += shelf_height;
            x = 0;
            shelf_height = 0;
        }
        offsets[index] = Vec2::new((x + padding) as f32, (y + padding) as f32);
        x += w;
        width = width.max(x);
        shelf_height = shelf_height.max(h);
    }

    let height = y + shelf_height;
    if width > max || height > max {
        return Err(too_large(width as f64, height as f64));
    }
    Ok(Layout {
        width: width.max(1) as u32,
        height: height.max(1) as u32,
        texels_per_unit: tpu as f32,
        offsets,
    })
}
