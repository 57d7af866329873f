use std::collections::BTreeMap;

use layout_core::prelude::*;

const SYMBOLS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Occupancy map of the grid's bounds, one symbol per building type and `.`
/// for free tiles, followed by a legend.
pub fn render_ascii(grid: &Grid) -> String {
    let mut legend: BTreeMap<u8, (char, String, usize)> = BTreeMap::new();
    for building in grid.buildings() {
        let building_type = building.building_type();
        legend
            .entry(building_type.code())
            .or_insert_with(|| (' ', building_type.key().clone(), 0))
            .2 += 1;
    }
    for (i, entry) in legend.values_mut().enumerate() {
        entry.0 = SYMBOLS.get(i).map(|symbol| *symbol as char).unwrap_or('?');
    }

    let bounds = grid.bounds();
    let mut map = String::new();
    if !bounds.is_empty() {
        for row in bounds.nw().row..=bounds.se().row {
            for col in bounds.nw().col..=bounds.se().col {
                let symbol = grid
                    .building_at(TileCoords::new(row, col))
                    .and_then(|building| legend.get(&building.type_code()))
                    .map(|(symbol, _, _)| *symbol)
                    .unwrap_or('.');
                map.push(symbol);
            }
            map.push('\n');
        }
    }
    for (code, (symbol, key, count)) in legend.iter() {
        map.push_str(&format!("{}  {} ({}) x{}\n", symbol, key, code, count));
    }
    map
}

pub fn describe_contour(contour: &Contour) -> String {
    let segments: Vec<String> = contour
        .segments
        .iter()
        .map(|segment| {
            let direction = match segment.step {
                Step::East => 'E',
                Step::South => 'S',
                Step::West => 'W',
                Step::North => 'N',
            };
            format!("{}{}", direction, segment.length)
        })
        .collect();
    format!("from {}: {}", contour.start, segments.join(" "))
}
