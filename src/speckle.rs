use crate::contours::{Contour, GridPoint, Polarity};

/// Drops contours enclosing `turdsize` pixels or fewer, plus every hole whose
/// owning outer boundary did not survive.
pub fn filter_speckles(contours: Vec<Contour>, turdsize: u32) -> Vec<Contour> {
    let limit = turdsize as u64;
    let keep_outer: Vec<bool> = contours
        .iter()
        .map(|c| c.polarity == Polarity::Outer && c.abs_area() > limit)
        .collect();

    let bounds: Vec<(GridPoint, GridPoint)> = contours.iter().map(Contour::bounds).collect();

    let keep: Vec<bool> = contours
        .iter()
        .enumerate()
        .map(|(idx, contour)| match contour.polarity {
            Polarity::Outer => keep_outer[idx],
            Polarity::Hole => {
                if contour.abs_area() <= limit {
                    return false;
                }
                match owning_outer(&contours, &bounds, idx) {
                    Some(owner) => keep_outer[owner],
                    None => {
                        log::warn!("Dropping hole with no enclosing outer boundary");
                        false
                    }
                }
            }
        })
        .collect();

    let before = contours.len();
    let kept: Vec<Contour> = contours
        .into_iter()
        .zip(keep)
        .filter_map(|(contour, keep)| keep.then_some(contour))
        .collect();

    log::debug!(
        "Speckle filter kept {} of {} contours (turdsize {})",
        kept.len(),
        before,
        turdsize
    );
    kept
}

/// Innermost outer boundary containing the hole's adjacent foreground pixel.
///
/// `bounds[i]` is `contours[i].bounds()`. Outers whose box misses the sample
/// are skipped without walking their edges.
pub(crate) fn owning_outer(
    contours: &[Contour],
    bounds: &[(GridPoint, GridPoint)],
    hole: usize,
) -> Option<usize> {
    let (sx, sy) = contours[hole].interior_sample();
    contours
        .iter()
        .zip(bounds)
        .enumerate()
        .filter(|(_, (c, _))| c.polarity == Polarity::Outer)
        .filter(|(_, (_, (lo, hi)))| box_contains(*lo, *hi, sx, sy))
        .filter(|(_, (c, _))| c.contains(sx, sy))
        .min_by_key(|(_, (c, _))| c.abs_area())
        .map(|(idx, _)| idx)
}

fn box_contains(lo: GridPoint, hi: GridPoint, x: f64, y: f64) -> bool {
    x > lo.x as f64 && x < hi.x as f64 && y > lo.y as f64 && y < hi.y as f64
}
