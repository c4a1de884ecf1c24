//! Tile Collision Engine
//!
//! Finds the tiles an AABB overlaps in two steps:
//! 1. Broadphase: turn the box into a range of grid cells and visit only those
//! 2. Narrowphase: test the tile's own collision box, and for slope tiles
//!    sample the slope line with a stair-step probe
//!
//! Tiles without registered properties are solid: if the broadphase picked
//! them, they collide. Cost is O(cells overlapped), never O(all tiles).

use macroquad::math::{Rect, Vec2};
use crate::collision::{Aabb, Segment, segment_intersects_rect};
use super::{Tile, TileSource, TileType};

/// Parameters for a tile collision query.
#[derive(Debug, Clone, Copy)]
pub struct TileQuery<'a> {
    pub aabb: &'a Aabb,
    /// Informational only: copied onto each result, never used to sweep
    pub velocity: Vec2,
    /// Scene size in pixels; cells past it are never visited
    pub scene_size: Vec2,
    pub layers: &'a [&'a str],
    /// Grid coordinates to skip
    pub ignore: &'a [(i32, i32)],
    pub ignore_slope: bool,
}

impl<'a> TileQuery<'a> {
    pub fn new(aabb: &'a Aabb, scene_size: Vec2, layers: &'a [&'a str]) -> Self {
        Self {
            aabb,
            velocity: Vec2::ZERO,
            scene_size,
            layers,
            ignore: &[],
            ignore_slope: false,
        }
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_ignore(mut self, ignore: &'a [(i32, i32)]) -> Self {
        self.ignore = ignore;
        self
    }

    pub fn with_ignore_slope(mut self, ignore_slope: bool) -> Self {
        self.ignore_slope = ignore_slope;
        self
    }
}

/// One colliding tile.
#[derive(Debug, Clone, PartialEq)]
pub struct TileCollision {
    pub tile: Tile,
    /// Velocity of the query that produced this hit
    pub velocity: Vec2,
    /// Slope sample points that overlapped the query box.
    /// `None` for non-slope tiles and for slopes with no overlapping samples.
    pub overlaps: Option<Vec<Vec2>>,
}

/// Resolved slope of a tile, in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slope {
    pub tile: Tile,
    pub line: Segment,
    pub stepw: f32,
    pub steph: f32,
}

/// Snap a pixel position to the top-left of its tile cell.
///
/// With `floor == false` the coordinate is ceiled first, so a box whose
/// inclusive edge ends on x.3 still lands in cell x, but one ending exactly
/// on a grid line does not reach into the next cell.
pub fn tile_position(x: f32, y: f32, floor: bool, tile_size: f32) -> Vec2 {
    if floor {
        Vec2::new(
            (x / tile_size).floor() * tile_size,
            (y / tile_size).floor() * tile_size,
        )
    } else {
        Vec2::new(
            (x.ceil() / tile_size).floor() * tile_size,
            (y.ceil() / tile_size).floor() * tile_size,
        )
    }
}

/// All tiles on `query.layers` whose collision box overlaps `query.aabb`.
///
/// Results are in discovery order: layer by layer, row-major within a layer.
pub fn get_tile_collisions<S: TileSource + ?Sized>(source: &S, query: &TileQuery<'_>) -> Vec<TileCollision> {
    let mut hits = Vec::new();
    if query.layers.is_empty() {
        return hits;
    }

    let size = source.tile_size();
    let aabb = query.aabb;
    // Grid cells are integer aligned, entity bounds may not be
    let rounded = aabb.rounded();

    let limit_x = (query.scene_size.x / size).floor() * size;
    let limit_y = (query.scene_size.y / size).floor() * size;

    for layer in query.layers {
        let start = tile_position(aabb.x, aabb.y, true, size);
        let end = tile_position(aabb.right, aabb.bottom, false, size);

        let start_x = start.x.max(0.0);
        let start_y = start.y.max(0.0);
        let end_x = end.x.min(limit_x);
        let end_y = end.y.min(limit_y);

        let (gx0, gy0) = ((start_x / size).round() as i32, (start_y / size).round() as i32);
        let (gx1, gy1) = ((end_x / size).round() as i32, (end_y / size).round() as i32);

        for gy in gy0..=gy1 {
            for gx in gx0..=gx1 {
                let (px, py) = (gx as f32 * size, gy as f32 * size);
                if px >= limit_x || py >= limit_y {
                    continue;
                }

                let Some(tile) = source.tile_at_position(px, py, layer) else { continue };
                if tile.is_empty() || query.ignore.contains(&tile.grid()) {
                    continue;
                }

                let collides = match source.properties(tile.index) {
                    None => true,
                    Some(_) => tile_aabb(source, &tile).is_collide(&rounded),
                };
                if !collides {
                    continue;
                }

                let overlaps = if query.ignore_slope {
                    None
                } else {
                    slope(source, &tile).and_then(|s| sample_slope(&s, &rounded))
                };

                hits.push(TileCollision {
                    tile,
                    velocity: query.velocity,
                    overlaps,
                });
            }
        }
    }

    hits
}

/// March a `stepw × 1` probe up the slope line, one step at a time,
/// recording every step that touches the (rounded) query box.
///
/// Only ground slopes rising left to right (`stepw > 0`) are sampled.
fn sample_slope(slope: &Slope, rounded: &Aabb) -> Option<Vec<Vec2>> {
    if slope.stepw <= 0.0 {
        return None;
    }

    let mut pos = slope.line.start;
    let mut probe = Aabb::create(pos, Vec2::ZERO, slope.stepw, 1.0);
    let mut overlaps = Vec::new();

    while pos.x <= slope.line.end.x {
        if probe.is_collide(rounded) {
            overlaps.push(pos);
        }
        pos.x += slope.stepw;
        pos.y -= 1.0;
        probe.update(pos);
    }

    if overlaps.is_empty() {
        None
    } else {
        Some(overlaps)
    }
}

/// True if the box touches any tile. Slope sampling is skipped: only the
/// hit/no-hit answer matters here.
pub fn collide<S: TileSource + ?Sized>(
    source: &S,
    aabb: &Aabb,
    velocity: Vec2,
    scene_size: Vec2,
    layers: &[&str],
) -> bool {
    let query = TileQuery::new(aabb, scene_size, layers)
        .with_velocity(velocity)
        .with_ignore_slope(true);
    !get_tile_collisions(source, &query).is_empty()
}

/// Tile collisions filtered by classification. `None` keeps every hit.
pub fn get_overlaps<S: TileSource + ?Sized>(
    source: &S,
    aabb: &Aabb,
    velocity: Vec2,
    scene_size: Vec2,
    layers: &[&str],
    tile_type: Option<TileType>,
) -> Vec<TileCollision> {
    let query = TileQuery::new(aabb, scene_size, layers).with_velocity(velocity);
    let hits = get_tile_collisions(source, &query);
    match tile_type {
        None => hits,
        Some(TileType::Slope) => hits.into_iter().filter(|h| is_slope(source, &h.tile)).collect(),
        Some(TileType::Solid) => hits.into_iter().filter(|h| !is_slope(source, &h.tile)).collect(),
    }
}

/// True if `line` crosses the full cell rectangle of any tile the area touches.
/// Stops at the first hit.
pub fn get_line_intersect_tiles<S: TileSource + ?Sized>(
    source: &S,
    area: &Aabb,
    line: &Segment,
    scene_size: Vec2,
    layers: &[&str],
) -> bool {
    let size = source.tile_size();
    let query = TileQuery::new(area, scene_size, layers);
    get_tile_collisions(source, &query).iter().any(|hit| {
        let rect = Rect::new(hit.tile.x as f32 * size, hit.tile.y as f32 * size, size, size);
        segment_intersects_rect(line, &rect)
    })
}

/// World-space collision box of a tile: the registered footprint, or the full cell.
pub fn tile_aabb<S: TileSource + ?Sized>(source: &S, tile: &Tile) -> Aabb {
    let size = source.tile_size();
    match source.properties(tile.index) {
        Some(props) => {
            let width = if props.width > 0.0 { props.width } else { size };
            let height = if props.height > 0.0 { props.height } else { size };
            Aabb::create(
                Vec2::new(tile.pixel_x + props.left, tile.pixel_y + props.top),
                Vec2::ZERO,
                width,
                height,
            )
        }
        None => Aabb::create(Vec2::new(tile.pixel_x, tile.pixel_y), Vec2::ZERO, size, size),
    }
}

pub fn is_slope<S: TileSource + ?Sized>(source: &S, tile: &Tile) -> bool {
    !tile.is_empty()
        && source
            .properties(tile.index)
            .map(|p| p.slope.is_some())
            .unwrap_or(false)
}

/// Slope anchor line translated into world space.
pub fn tile_line_segment<S: TileSource + ?Sized>(source: &S, tile: &Tile) -> Option<Segment> {
    if tile.is_empty() {
        return None;
    }
    let slope = source.properties(tile.index)?.slope?;
    Some(Segment::new(
        Vec2::new(tile.pixel_x + slope.x1, tile.pixel_y + slope.y1),
        Vec2::new(tile.pixel_x + slope.x2, tile.pixel_y + slope.y2),
    ))
}

pub fn slope<S: TileSource + ?Sized>(source: &S, tile: &Tile) -> Option<Slope> {
    if tile.is_empty() {
        return None;
    }
    let props = source.properties(tile.index)?.slope?;
    Some(Slope {
        tile: *tile,
        line: tile_line_segment(source, tile)?,
        stepw: props.stepw,
        steph: props.steph,
    })
}

/// Neighbouring tile at a -1/0/1 grid offset. Empty neighbours are `None`.
///
/// # Panics
/// Offsets outside -1..=1 are a caller bug.
pub fn next_tile<S: TileSource + ?Sized>(source: &S, tile: &Tile, dx: i32, dy: i32, layer: &str) -> Option<Tile> {
    assert!(
        (-1..=1).contains(&dx) && (-1..=1).contains(&dy),
        "next_tile: offset value must be -1, 0, or 1 (got {}, {})",
        dx,
        dy
    );
    if dx == 0 && dy == 0 {
        return None;
    }
    source
        .tile_at(tile.x + dx, tile.y + dy, layer)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::{TileMap, TileProperties, SlopeProperties, layer};

    const SCENE: Vec2 = Vec2::new(160.0, 160.0);
    const LAYERS: &[&str] = &[layer::COLLISION];

    fn solid_map() -> TileMap {
        let mut map = TileMap::new(16.0);
        map.add_empty_layer(layer::COLLISION, 10, 10);
        for y in 0..10 {
            for x in 0..10 {
                map.set_tile(layer::COLLISION, x, y, 1);
            }
        }
        map
    }

    fn slope_props(top: f32, height: f32, y1: f32, y2: f32) -> TileProperties {
        TileProperties {
            top,
            height,
            slope: Some(SlopeProperties { stepw: 4.0, steph: 1.0, x1: 0.0, y1, x2: 15.0, y2 }),
            ..Default::default()
        }
    }

    #[test]
    fn test_box_inside_one_cell_hits_only_that_cell() {
        let map = solid_map();
        let aabb = Aabb::create(Vec2::new(34.0, 50.0), Vec2::ZERO, 8.0, 8.0);
        let hits = get_tile_collisions(&map, &TileQuery::new(&aabb, SCENE, LAYERS));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].tile.grid(), (2, 3));
        assert!(hits[0].overlaps.is_none());
    }

    #[test]
    fn test_box_ending_on_grid_line_stays_in_cell() {
        let map = solid_map();
        // covers pixels 16..=31: right edge sits exactly on the next grid line - 1
        let aabb = Aabb::create(Vec2::new(16.0, 16.0), Vec2::ZERO, 16.0, 16.0);
        let hits = get_tile_collisions(&map, &TileQuery::new(&aabb, SCENE, LAYERS));
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_fractional_box_spans_neighbours_row_major() {
        let map = solid_map();
        let aabb = Aabb::create(Vec2::new(10.0, 10.0), Vec2::ZERO, 8.0, 8.0);
        let hits = get_tile_collisions(&map, &TileQuery::new(&aabb, SCENE, LAYERS));
        let grids: Vec<_> = hits.iter().map(|h| h.tile.grid()).collect();
        assert_eq!(grids, vec![(0, 0), (1, 0), (0, 1), (1, 1)]);
    }

    #[test]
    fn test_range_clamped_to_scene() {
        let map = solid_map();
        let aabb = Aabb::create(Vec2::new(-20.0, 150.0), Vec2::ZERO, 30.0, 30.0);
        let scene = Vec2::new(160.0, 160.0);
        let hits = get_tile_collisions(&map, &TileQuery::new(&aabb, scene, LAYERS));
        let grids: Vec<_> = hits.iter().map(|h| h.tile.grid()).collect();
        assert_eq!(grids, vec![(0, 9)]);
    }

    #[test]
    fn test_ignore_list_matches_grid_coordinates() {
        let map = solid_map();
        let aabb = Aabb::create(Vec2::new(10.0, 4.0), Vec2::ZERO, 8.0, 4.0);
        let ignore = [(0, 0)];
        let query = TileQuery::new(&aabb, SCENE, LAYERS).with_ignore(&ignore);
        let hits = get_tile_collisions(&map, &query);
        let grids: Vec<_> = hits.iter().map(|h| h.tile.grid()).collect();
        assert_eq!(grids, vec![(1, 0)]);
    }

    #[test]
    fn test_empty_cells_and_layers() {
        let mut map = TileMap::new(16.0);
        map.add_empty_layer(layer::COLLISION, 4, 4);
        let aabb = Aabb::create(Vec2::new(4.0, 4.0), Vec2::ZERO, 8.0, 8.0);
        assert!(get_tile_collisions(&map, &TileQuery::new(&aabb, SCENE, LAYERS)).is_empty());
        assert!(get_tile_collisions(&map, &TileQuery::new(&aabb, SCENE, &[])).is_empty());
    }

    #[test]
    fn test_registered_footprint_must_overlap() {
        let mut map = TileMap::new(16.0);
        map.add_empty_layer(layer::COLLISION, 4, 4);
        map.set_tile(layer::COLLISION, 0, 0, 2);
        // lower half only
        map.set_properties(2, TileProperties { top: 8.0, height: 8.0, ..Default::default() });

        let above = Aabb::create(Vec2::new(2.0, 1.0), Vec2::ZERO, 4.0, 4.0);
        let inside = Aabb::create(Vec2::new(2.0, 9.0), Vec2::ZERO, 4.0, 4.0);
        assert!(get_tile_collisions(&map, &TileQuery::new(&above, SCENE, LAYERS)).is_empty());
        assert_eq!(get_tile_collisions(&map, &TileQuery::new(&inside, SCENE, LAYERS)).len(), 1);
    }

    #[test]
    fn test_layers_in_order() {
        let mut map = solid_map();
        map.add_empty_layer(layer::GROUND, 10, 10);
        map.set_tile(layer::GROUND, 0, 0, 3);
        let aabb = Aabb::create(Vec2::new(2.0, 2.0), Vec2::ZERO, 4.0, 4.0);
        let layers = [layer::GROUND, layer::COLLISION];
        let hits = get_tile_collisions(&map, &TileQuery::new(&aabb, SCENE, &layers));
        let indices: Vec<_> = hits.iter().map(|h| h.tile.index).collect();
        assert_eq!(indices, vec![3, 1]);
    }

    #[test]
    fn test_slope_upper_left_corner_has_samples() {
        let mut map = TileMap::new(16.0);
        map.add_empty_layer(layer::COLLISION, 4, 4);
        map.set_tile(layer::COLLISION, 1, 1, 5);
        // line hugs the top of the cell: (16,19) -> (31,16)
        map.set_properties(5, slope_props(0.0, 0.0, 3.0, 0.0));

        let corner = Aabb::create(Vec2::new(16.0, 16.0), Vec2::ZERO, 4.0, 4.0);
        let hits = get_tile_collisions(&map, &TileQuery::new(&corner, SCENE, LAYERS));
        assert_eq!(hits.len(), 1);
        let overlaps = hits[0].overlaps.as_ref().expect("slope samples");
        assert!(!overlaps.is_empty());
        assert_eq!(overlaps[0], Vec2::new(16.0, 19.0));
    }

    #[test]
    fn test_slope_samples_step_up_the_line() {
        let mut map = TileMap::new(16.0);
        map.add_empty_layer(layer::COLLISION, 4, 4);
        map.set_tile(layer::COLLISION, 0, 0, 5);
        map.set_properties(5, slope_props(0.0, 0.0, 15.0, 12.0));

        // covers the whole cell: every one of the four steps overlaps
        let all = Aabb::create(Vec2::ZERO, Vec2::ZERO, 16.0, 16.0);
        let hits = get_tile_collisions(&map, &TileQuery::new(&all, SCENE, LAYERS));
        let overlaps = hits[0].overlaps.clone().unwrap();
        assert_eq!(
            overlaps,
            vec![
                Vec2::new(0.0, 15.0),
                Vec2::new(4.0, 14.0),
                Vec2::new(8.0, 13.0),
                Vec2::new(12.0, 12.0),
            ]
        );
    }

    #[test]
    fn test_query_above_slope_line_reports_nothing() {
        let mut map = TileMap::new(16.0);
        map.add_empty_layer(layer::COLLISION, 4, 4);
        map.set_tile(layer::COLLISION, 0, 0, 5);
        // footprint is the lower half, slope line runs along it
        map.set_properties(5, slope_props(8.0, 8.0, 15.0, 12.0));

        let above = Aabb::create(Vec2::new(4.0, 0.0), Vec2::ZERO, 6.0, 4.0);
        assert!(get_tile_collisions(&map, &TileQuery::new(&above, SCENE, LAYERS)).is_empty());
    }

    #[test]
    fn test_slope_broadphase_hit_without_samples() {
        let mut map = TileMap::new(16.0);
        map.add_empty_layer(layer::COLLISION, 4, 4);
        map.set_tile(layer::COLLISION, 0, 0, 5);
        map.set_properties(5, slope_props(0.0, 0.0, 15.0, 12.0));

        // inside the footprint but well above the line
        let high = Aabb::create(Vec2::new(2.0, 1.0), Vec2::ZERO, 3.0, 3.0);
        let hits = get_tile_collisions(&map, &TileQuery::new(&high, SCENE, LAYERS));
        assert_eq!(hits.len(), 1);
        assert!(hits[0].overlaps.is_none());

        let whole = Aabb::create(Vec2::ZERO, Vec2::ZERO, 16.0, 16.0);
        let ignoring = TileQuery::new(&whole, SCENE, LAYERS).with_ignore_slope(true);
        assert!(get_tile_collisions(&map, &ignoring)[0].overlaps.is_none());
    }

    #[test]
    fn test_velocity_tags_results() {
        let map = solid_map();
        let aabb = Aabb::create(Vec2::new(2.0, 2.0), Vec2::ZERO, 4.0, 4.0);
        let v = Vec2::new(3.0, -1.0);
        let hits = get_tile_collisions(&map, &TileQuery::new(&aabb, SCENE, LAYERS).with_velocity(v));
        assert_eq!(hits[0].velocity, v);
    }

    #[test]
    fn test_collide_and_overlaps_filter() {
        let mut map = TileMap::new(16.0);
        map.add_empty_layer(layer::COLLISION, 4, 4);
        map.set_tile(layer::COLLISION, 0, 0, 1);
        map.set_tile(layer::COLLISION, 1, 0, 5);
        map.set_properties(5, slope_props(0.0, 0.0, 15.0, 12.0));

        let aabb = Aabb::create(Vec2::new(8.0, 8.0), Vec2::ZERO, 16.0, 4.0);
        assert!(collide(&map, &aabb, Vec2::ZERO, SCENE, LAYERS));

        let all = get_overlaps(&map, &aabb, Vec2::ZERO, SCENE, LAYERS, None);
        let slopes = get_overlaps(&map, &aabb, Vec2::ZERO, SCENE, LAYERS, Some(TileType::Slope));
        let solids = get_overlaps(&map, &aabb, Vec2::ZERO, SCENE, LAYERS, Some(TileType::Solid));
        assert_eq!(all.len(), 2);
        assert_eq!(slopes.len(), 1);
        assert_eq!(slopes[0].tile.index, 5);
        assert_eq!(solids.len(), 1);
        assert_eq!(solids[0].tile.index, 1);

        let away = Aabb::create(Vec2::new(40.0, 40.0), Vec2::ZERO, 4.0, 4.0);
        assert!(!collide(&map, &away, Vec2::ZERO, SCENE, LAYERS));
    }

    #[test]
    fn test_line_intersect_tiles() {
        let mut map = TileMap::new(16.0);
        map.add_empty_layer(layer::COLLISION, 4, 4);
        map.set_tile(layer::COLLISION, 1, 1, 1);

        let area = Aabb::create(Vec2::ZERO, Vec2::ZERO, 48.0, 48.0);
        let crossing = Segment::new(Vec2::new(0.0, 24.0), Vec2::new(47.0, 24.0));
        let missing = Segment::new(Vec2::new(0.0, 4.0), Vec2::new(47.0, 4.0));
        assert!(get_line_intersect_tiles(&map, &area, &crossing, SCENE, LAYERS));
        assert!(!get_line_intersect_tiles(&map, &area, &missing, SCENE, LAYERS));
    }

    #[test]
    fn test_tile_helpers() {
        let mut map = TileMap::new(16.0);
        map.add_empty_layer(layer::COLLISION, 4, 4);
        map.set_tile(layer::COLLISION, 1, 1, 5);
        map.set_tile(layer::COLLISION, 2, 1, 1);
        map.set_properties(5, slope_props(0.0, 0.0, 15.0, 12.0));

        let tile = map.tile_at(1, 1, layer::COLLISION).unwrap();
        assert!(is_slope(&map, &tile));
        let line = tile_line_segment(&map, &tile).unwrap();
        assert_eq!(line.start, Vec2::new(16.0, 31.0));
        assert_eq!(line.end, Vec2::new(31.0, 28.0));

        let right = next_tile(&map, &tile, 1, 0, layer::COLLISION).unwrap();
        assert_eq!(right.index, 1);
        assert!(!is_slope(&map, &right));
        assert!(next_tile(&map, &tile, -1, 0, layer::COLLISION).is_none());
        assert!(next_tile(&map, &tile, 0, 0, layer::COLLISION).is_none());

        let full = tile_aabb(&map, &right);
        assert_eq!((full.left, full.top, full.right, full.bottom), (32.0, 16.0, 47.0, 31.0));

        assert_eq!(tile_position(17.5, 33.0, true, 16.0), Vec2::new(16.0, 32.0));
        assert_eq!(tile_position(31.2, 15.0, false, 16.0), Vec2::new(32.0, 0.0));
    }

    #[test]
    #[should_panic(expected = "offset value")]
    fn test_next_tile_rejects_large_offsets() {
        let map = solid_map();
        let tile = map.tile_at(1, 1, layer::COLLISION).unwrap();
        next_tile(&map, &tile, 2, 0, layer::COLLISION);
    }
}
