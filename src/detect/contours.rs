//! Connected foreground components.
//!
//! A flood-fill labelling pass over the binary mask: each 8-connected
//! foreground component yields its bounding rectangle and pixel area, which
//! is all the callers consume.

use crate::frame::Region;

use super::morph::Mask;

/// One connected foreground component.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Component {
    pub bounds: Region,
    /// Foreground pixel count.
    pub area: u32,
}

/// Extract all 8-connected foreground components of a mask.
///
/// An empty mask yields an empty list, never an error.
pub fn find_components(mask: &Mask) -> Vec<Component> {
    let width = mask.width() as usize;
    let height = mask.height() as usize;
    let mut visited = vec![false; width * height];
    let mut components = Vec::new();
    let mut stack = Vec::new();

    for start_y in 0..height {
        for start_x in 0..width {
            let idx = start_y * width + start_x;
            if visited[idx] || mask.data()[idx] == 0 {
                continue;
            }

            visited[idx] = true;
            stack.push((start_x, start_y));
            let (mut min_x, mut min_y) = (start_x, start_y);
            let (mut max_x, mut max_y) = (start_x, start_y);
            let mut area = 0u32;

            while let Some((x, y)) = stack.pop() {
                area += 1;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);

                for dy in -1i64..=1 {
                    for dx in -1i64..=1 {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let nx = x as i64 + dx;
                        let ny = y as i64 + dy;
                        if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                            continue;
                        }
                        let nidx = (ny as usize) * width + nx as usize;
                        if !visited[nidx] && mask.data()[nidx] != 0 {
                            visited[nidx] = true;
                            stack.push((nx as usize, ny as usize));
                        }
                    }
                }
            }

            components.push(Component {
                bounds: Region {
                    min_x: min_x as u32,
                    min_y: min_y as u32,
                    // Exclusive max edges, matching x + w of a bounding rect.
                    max_x: (max_x + 1) as u32,
                    max_y: (max_y + 1) as u32,
                },
                area,
            });
        }
    }

    components
}

/// Union bounding rectangle across all components: minimum of all left/top
/// edges, maximum of all right/bottom edges. `None` when nothing was found.
pub fn union_bounds(components: &[Component]) -> Option<Region> {
    components
        .iter()
        .map(|c| c.bounds)
        .reduce(|acc, b| acc.union(&b))
}

/// Bounding rectangle of the single largest component by area.
pub fn largest_bounds(components: &[Component]) -> Option<Region> {
    components.iter().max_by_key(|c| c.area).map(|c| c.bounds)
}
