//! Ring assembly for untrusted way segments.

use geo::{Area, Contains, Coord, LineString, MultiPolygon, Polygon};
use log::debug;

/// Segments joined end-to-end.
#[derive(Debug, Default)]
pub(crate) struct Assembled {
    /// Closed chains that form valid rings.
    pub(crate) rings: Vec<LineString>,
    /// Chains that never closed, or closed without enclosing any area.
    pub(crate) open: Vec<LineString>,
}

/// Whether `ring` has at least four coordinates, is closed and encloses area.
pub(crate) fn is_valid_ring(ring: &LineString) -> bool {
    ring.0.len() >= 4
        && ring.is_closed()
        && Polygon::new(ring.clone(), Vec::new()).unsigned_area() > 0.0
}

#[derive(Debug, Clone, Copy)]
enum Join {
    /// Segment start meets chain end.
    Append,
    /// Segment end meets chain end.
    AppendReversed,
    /// Segment end meets chain start.
    Prepend,
    /// Segment start meets chain start.
    PrependReversed,
}

fn find_join(pool: &[Vec<Coord>], start: Coord, end: Coord) -> Option<(usize, Join)> {
    pool.iter().enumerate().find_map(|(index, segment)| {
        let (first, last) = (*segment.first()?, *segment.last()?);
        let join = if first == end {
            Join::Append
        } else if last == end {
            Join::AppendReversed
        } else if last == start {
            Join::Prepend
        } else if first == start {
            Join::PrependReversed
        } else {
            return None;
        };
        Some((index, join))
    })
}

fn is_closed_chain(chain: &[Coord]) -> bool {
    chain.len() >= 2 && chain.first() == chain.last()
}

fn grow(chain: &mut Vec<Coord>, pool: &mut Vec<Vec<Coord>>) -> bool {
    let (Some(&start), Some(&end)) = (chain.first(), chain.last()) else {
        return false;
    };
    let Some((index, join)) = find_join(pool, start, end) else {
        return false;
    };
    let mut segment = pool.remove(index);
    match join {
        Join::Append => chain.extend(segment.into_iter().skip(1)),
        Join::AppendReversed => chain.extend(segment.into_iter().rev().skip(1)),
        Join::Prepend => {
            segment.pop();
            segment.append(chain);
            *chain = segment;
        }
        Join::PrependReversed => {
            segment.reverse();
            segment.pop();
            segment.append(chain);
            *chain = segment;
        }
    }
    true
}

/// Join `segments` into closed rings where their endpoints meet.
///
/// Segments may appear in any order and orientation. Segments with fewer than
/// two coordinates are ignored.
pub(crate) fn assemble(segments: &[LineString]) -> Assembled {
    let mut pool: Vec<Vec<Coord>> = segments
        .iter()
        .filter(|segment| segment.0.len() >= 2)
        .map(|segment| segment.0.clone())
        .collect();
    pool.reverse();

    let mut assembled = Assembled::default();
    while let Some(mut chain) = pool.pop() {
        while !is_closed_chain(&chain) && grow(&mut chain, &mut pool) {}
        let line = LineString::new(chain);
        if is_valid_ring(&line) {
            assembled.rings.push(line);
        } else {
            assembled.open.push(line);
        }
    }
    assembled
}

/// Build polygons from outer and inner segments.
///
/// Each valid inner ring is attached to the first outer ring containing it;
/// inner rings without a containing outer ring are discarded.
pub(crate) fn build_polygons(outer: &[LineString], inner: &[LineString]) -> MultiPolygon {
    let outers = assemble(outer).rings;
    let mut holes: Vec<Vec<LineString>> = vec![Vec::new(); outers.len()];
    let shells: Vec<Polygon> = outers
        .iter()
        .map(|ring| Polygon::new(ring.clone(), Vec::new()))
        .collect();

    let mut orphans = 0_usize;
    for ring in assemble(inner).rings {
        match shells.iter().position(|shell| shell.contains(&ring)) {
            Some(index) => {
                if let Some(slot) = holes.get_mut(index) {
                    slot.push(ring);
                }
            }
            None => orphans += 1,
        }
    }
    if orphans > 0 {
        debug!("discarded {orphans} inner ring(s) outside every outer ring");
    }

    MultiPolygon::new(
        outers
            .into_iter()
            .zip(holes)
            .map(|(exterior, interiors)| Polygon::new(exterior, interiors))
            .collect(),
    )
}
