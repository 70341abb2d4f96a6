use crate::error::{ProtocolError, Result};

/// Position of the next value in a row-major ingest stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnCursor {
    columns: usize,
    expected: u64,
    sent: u64,
}

impl ColumnCursor {
    pub fn new(columns: usize, rows: usize) -> Self {
        Self {
            columns,
            expected: columns as u64 * rows as u64,
            sent: 0,
        }
    }

    /// Column the next value belongs to, or an error once the stream is full.
    pub fn active(&self) -> Result<usize> {
        if self.sent >= self.expected {
            return Err(ProtocolError::TooManyValues {
                expected: self.expected,
            });
        }
        Ok((self.sent % self.columns as u64) as usize)
    }

    /// Row the next value belongs to.
    pub fn row(&self) -> u64 {
        if self.columns == 0 {
            return 0;
        }
        self.sent / self.columns as u64
    }

    pub fn advance(&mut self) {
        self.sent += 1;
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn expected(&self) -> u64 {
        self.expected
    }

    pub fn is_complete(&self) -> bool {
        self.sent == self.expected
    }

    /// Error unless exactly the declared number of values was sent.
    pub fn ensure_complete(&self) -> Result<()> {
        if self.is_complete() {
            Ok(())
        } else {
            Err(ProtocolError::IncompleteSession {
                expected: self.expected,
                sent: self.sent,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_row_major() {
        let mut cursor = ColumnCursor::new(3, 2);
        let mut seen = Vec::new();
        while !cursor.is_complete() {
            seen.push((cursor.row(), cursor.active().expect("cursor should have room")));
            cursor.advance();
        }
        assert_eq!(seen, vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]);
        assert!(matches!(
            cursor.active(),
            Err(ProtocolError::TooManyValues { expected: 6 })
        ));
    }

    #[test]
    fn incomplete_until_all_sent() {
        let mut cursor = ColumnCursor::new(2, 1);
        cursor.advance();
        assert!(matches!(
            cursor.ensure_complete(),
            Err(ProtocolError::IncompleteSession {
                expected: 2,
                sent: 1
            })
        ));
        cursor.advance();
        cursor.ensure_complete().expect("cursor should be complete");
    }

    #[test]
    fn zero_rows_is_complete_immediately() {
        let cursor = ColumnCursor::new(4, 0);
        assert!(cursor.is_complete());
        assert!(cursor.active().is_err());
    }
}
