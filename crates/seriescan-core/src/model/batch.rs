//! Ordered point runs and the direction-aware batch assembler.

use crate::model::value::{DataType, FieldValue, TimeValuePair};
use crate::order::Direction;

/// An ordered run of points with a declared type and read direction.
///
/// Points are stored in emission order: ascending timestamps under
/// [`Direction::Asc`], descending under [`Direction::Desc`]. The batch
/// carries a cursor so callers can peek ([`Batch::current`]) before
/// consuming ([`Batch::advance`]); the [`Iterator`] impl consumes from
/// the same cursor.
#[derive(Debug, Clone)]
pub struct Batch {
    data_type: DataType,
    direction: Direction,
    points: Vec<TimeValuePair>,
    cursor: usize,
}

impl Batch {
    /// A batch over pre-ordered points. The caller guarantees the
    /// points are monotone in `direction`.
    pub fn new(data_type: DataType, direction: Direction, points: Vec<TimeValuePair>) -> Self {
        debug_assert!(
            points
                .windows(2)
                .all(|w| !direction.compare_times(w[0].timestamp, w[1].timestamp).is_gt()),
            "batch points must be monotone in the read direction"
        );
        Batch {
            data_type,
            direction,
            points,
            cursor: 0,
        }
    }

    /// An empty batch.
    pub fn empty(data_type: DataType, direction: Direction) -> Self {
        Batch::new(data_type, direction, Vec::new())
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Total number of points, consumed or not.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether the cursor still has a point to read.
    pub fn has_current(&self) -> bool {
        self.cursor < self.points.len()
    }

    /// Peek the point under the cursor without consuming it.
    pub fn current(&self) -> Option<&TimeValuePair> {
        self.points.get(self.cursor)
    }

    /// Consume the point under the cursor.
    pub fn advance(&mut self) -> Option<TimeValuePair> {
        let pair = self.points.get(self.cursor).cloned()?;
        self.cursor += 1;
        Some(pair)
    }
}

impl Iterator for Batch {
    type Item = TimeValuePair;

    fn next(&mut self) -> Option<TimeValuePair> {
        self.advance()
    }
}

/// Assembles a [`Batch`] from points consumed in direction order.
///
/// Used by the overlap merge path, which appends the surviving point of
/// every merged timestamp; value-filter rejection happens before
/// [`BatchBuilder::append`] is called.
#[derive(Debug)]
pub struct BatchBuilder {
    data_type: DataType,
    direction: Direction,
    points: Vec<TimeValuePair>,
}

impl BatchBuilder {
    pub fn new(data_type: DataType, direction: Direction) -> Self {
        BatchBuilder {
            data_type,
            direction,
            points: Vec::new(),
        }
    }

    /// Append the next surviving point. Appends must be monotone in the
    /// builder's direction.
    pub fn append(&mut self, timestamp: i64, value: FieldValue) {
        debug_assert!(
            self.points
                .last()
                .map_or(true, |p| !self.direction.compare_times(p.timestamp, timestamp).is_gt()),
            "appended timestamps must be monotone in the read direction"
        );
        self.points.push(TimeValuePair::new(timestamp, value));
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn build(self) -> Batch {
        Batch::new(self.data_type, self.direction, self.points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn double(v: f64) -> FieldValue {
        FieldValue::Double(v)
    }

    #[test]
    fn cursor_peeks_then_consumes() {
        let mut batch = Batch::new(
            DataType::Double,
            Direction::Asc,
            vec![
                TimeValuePair::new(1, double(1.0)),
                TimeValuePair::new(2, double(2.0)),
            ],
        );

        assert!(batch.has_current());
        assert_eq!(batch.current().map(|p| p.timestamp), Some(1));
        assert_eq!(batch.advance().map(|p| p.timestamp), Some(1));
        assert_eq!(batch.current().map(|p| p.timestamp), Some(2));
        assert_eq!(batch.advance().map(|p| p.timestamp), Some(2));
        assert!(!batch.has_current());
        assert_eq!(batch.advance(), None);
    }

    #[test]
    fn builder_keeps_descending_order() {
        let mut builder = BatchBuilder::new(DataType::Int32, Direction::Desc);
        builder.append(30, FieldValue::Int32(3));
        builder.append(20, FieldValue::Int32(2));
        builder.append(10, FieldValue::Int32(1));

        let times: Vec<i64> = builder.build().map(|p| p.timestamp).collect();
        assert_eq!(times, vec![30, 20, 10]);
    }

    #[test]
    fn empty_batch_has_no_current() {
        let batch = Batch::empty(DataType::Text, Direction::Asc);
        assert!(batch.is_empty());
        assert!(!batch.has_current());
    }
}
