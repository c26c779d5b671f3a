use std::path::Path;

use anyhow::Context;
use image::{DynamicImage, GenericImageView};
use log::debug;

use crate::grid::{Cell, GridMap};

/// Dark pixels become blocked cells, pixel (x, y) maps to location (x, y)
pub fn parse_img(img: &DynamicImage) -> Result<GridMap, anyhow::Error> {
    let width = img.width() as usize;
    let height = img.height() as usize;

    let mut cells = vec![vec![Cell::Blocked; width]; height];

    for (row, cells_row) in cells.iter_mut().enumerate() {
        for (col, cell) in cells_row.iter_mut().enumerate() {
            let p = img.get_pixel(col as u32, row as u32);

            *cell = if p.0[0] < 128 {
                Cell::Blocked
            } else {
                Cell::Walkable
            }
        }
    }

    Ok(GridMap {
        rows: height,
        columns: width,
        cells,
    })
}

/// Load a map from a `.txt` file in the text format of [`GridMap`], or from any image format
/// supported by the `image` crate
pub fn load_map(path: impl AsRef<Path>) -> Result<GridMap, anyhow::Error> {
    let path = path.as_ref();
    let map = if path.extension().is_some_and(|ext| ext == "txt") {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("could not read map {}", path.display()))?;
        text.parse()?
    } else {
        let img = image::open(path)
            .with_context(|| format!("could not open image {}", path.display()))?;
        parse_img(&img)?
    };
    debug!(
        "loaded {}x{} map from {}",
        map.columns,
        map.rows,
        path.display()
    );
    Ok(map)
}
