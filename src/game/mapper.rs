use crate::models::{Direction, GridLine, Placement};

/// Converts between word placements and the grid lines drawn by the player.
///
/// Both directions are pure coordinate transforms: `to_geometry` and
/// `to_placement` are exact inverses for every straight line spanning at
/// least two cells.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreakLineMapper;

impl StreakLineMapper {
    pub fn to_geometry(&self, placement: &Placement) -> Option<GridLine> {
        Some(GridLine::new(placement.start, placement.end()?))
    }

    /// `None` for single-cell lines and lines that are neither horizontal,
    /// vertical nor a 45 degree diagonal
    pub fn to_placement(&self, line: &GridLine) -> Option<Placement> {
        let dr = line.end.row as isize - line.start.row as isize;
        let dc = line.end.col as isize - line.start.col as isize;

        if dr == 0 && dc == 0 {
            return None;
        }
        if dr != 0 && dc != 0 && dr.abs() != dc.abs() {
            return None;
        }

        let direction = Direction::from_delta(dr.signum(), dc.signum())?;
        let length = dr.unsigned_abs().max(dc.unsigned_abs()) + 1;
        Some(Placement::new(line.start, direction, length))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Position;

    const MAPPER: StreakLineMapper = StreakLineMapper;

    #[test]
    fn test_straight_lines_round_trip() {
        let size = 6;
        for start_row in 0..size {
            for start_col in 0..size {
                for end_row in 0..size {
                    for end_col in 0..size {
                        let line = GridLine::new(
                            Position::new(start_row, start_col),
                            Position::new(end_row, end_col),
                        );
                        if let Some(placement) = MAPPER.to_placement(&line) {
                            assert_eq!(MAPPER.to_geometry(&placement), Some(line));
                            assert!(placement.fits(size, size));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_placements_round_trip() {
        for direction in Direction::ALL {
            let placement = Placement::new(Position::new(4, 4), direction, 4);
            let line = MAPPER.to_geometry(&placement).unwrap();
            assert_eq!(MAPPER.to_placement(&line), Some(placement));
        }
    }

    #[test]
    fn test_bent_and_degenerate_lines_rejected() {
        let bent = GridLine::new(Position::new(0, 0), Position::new(1, 3));
        let single = GridLine::new(Position::new(2, 2), Position::new(2, 2));
        assert_eq!(MAPPER.to_placement(&bent), None);
        assert_eq!(MAPPER.to_placement(&single), None);
    }

    #[test]
    fn test_reverse_drag_maps_to_reversed_placement() {
        let placement = Placement::new(Position::new(0, 0), Direction::East, 3);
        let line = MAPPER.to_geometry(&placement).unwrap().reversed();
        assert_eq!(MAPPER.to_placement(&line), placement.reversed());
    }
}
