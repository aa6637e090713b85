use crate::error::ImageError;

/// The row range assigned to one worker or rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct RowPartition {
    /// Index of the first row of the partition.
    pub offset: usize,
    /// Number of rows in the partition.
    pub count: usize,
}

impl RowPartition {
    /// One past the last row of the partition.
    pub fn end(&self) -> usize {
        self.offset + self.count
    }

    /// Whether the partition holds no rows.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Split `rows` into `num_parts` contiguous, near-equal row ranges.
///
/// Every part receives `rows / num_parts` rows and the first `rows % num_parts` parts receive one
/// extra row. The result is the same on every caller given the same arguments, which is what makes
/// it safe to compute independently on each worker.
///
/// # Arguments
///
/// * `rows` - The number of image rows to split.
/// * `num_parts` - The number of workers or ranks.
///
/// # Returns
///
/// One [`RowPartition`] per part, ordered by offset. Parts may be empty when `num_parts > rows`.
///
/// # Errors
///
/// Returns an error if `num_parts` is zero.
///
/// # Example
///
/// ```
/// use histeq_image::partition::{partition_rows, RowPartition};
///
/// let parts = partition_rows(10, 4).unwrap();
/// assert_eq!(parts[0], RowPartition { offset: 0, count: 3 });
/// assert_eq!(parts[1], RowPartition { offset: 3, count: 3 });
/// assert_eq!(parts[2], RowPartition { offset: 6, count: 2 });
/// assert_eq!(parts[3], RowPartition { offset: 8, count: 2 });
/// ```
pub fn partition_rows(rows: usize, num_parts: usize) -> Result<Vec<RowPartition>, ImageError> {
    if num_parts == 0 {
        return Err(ImageError::InvalidPartitionCount(num_parts));
    }

    let base = rows / num_parts;
    let remainder = rows % num_parts;

    let mut offset = 0;
    let parts = (0..num_parts)
        .map(|rank| {
            let count = if rank < remainder { base + 1 } else { base };
            let part = RowPartition { offset, count };
            offset += count;
            part
        })
        .collect();

    Ok(parts)
}

/// Check that `parts` tile `[0, rows)` in order without gaps or overlaps.
pub fn validate_partitions(parts: &[RowPartition], rows: usize) -> Result<(), ImageError> {
    let mut expected = 0;
    for part in parts {
        if part.offset != expected {
            return Err(ImageError::PartitionMismatch(rows));
        }
        expected = part.end();
    }

    if expected != rows {
        return Err(ImageError::PartitionMismatch(rows));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_even() -> Result<(), ImageError> {
        let parts = partition_rows(8, 4)?;
        assert!(parts.iter().all(|p| p.count == 2));
        assert_eq!(parts[3].offset, 6);
        Ok(())
    }

    #[test]
    fn partition_more_parts_than_rows() -> Result<(), ImageError> {
        let parts = partition_rows(2, 5)?;
        let counts = parts.iter().map(|p| p.count).collect::<Vec<_>>();
        assert_eq!(counts, vec![1, 1, 0, 0, 0]);
        assert_eq!(parts[4].offset, 2);
        validate_partitions(&parts, 2)?;
        Ok(())
    }

    #[test]
    fn partition_zero_rows() -> Result<(), ImageError> {
        let parts = partition_rows(0, 3)?;
        assert!(parts.iter().all(RowPartition::is_empty));
        validate_partitions(&parts, 0)?;
        Ok(())
    }

    #[test]
    fn partition_zero_parts() {
        assert_eq!(
            partition_rows(10, 0),
            Err(ImageError::InvalidPartitionCount(0))
        );
    }

    #[test]
    fn partition_completeness() -> Result<(), ImageError> {
        for rows in 0..64 {
            for num_parts in 1..17 {
                let parts = partition_rows(rows, num_parts)?;
                assert_eq!(parts.len(), num_parts);
                validate_partitions(&parts, rows)?;

                let max = parts.iter().map(|p| p.count).max().unwrap_or(0);
                let min = parts.iter().map(|p| p.count).min().unwrap_or(0);
                assert!(max - min <= 1, "rows={rows} parts={num_parts}");

                // larger parts come first
                assert!(parts.windows(2).all(|w| w[0].count >= w[1].count));
            }
        }
        Ok(())
    }

    #[test]
    fn validate_rejects_gaps() {
        let parts = [
            RowPartition { offset: 0, count: 2 },
            RowPartition { offset: 3, count: 1 },
        ];
        assert_eq!(
            validate_partitions(&parts, 4),
            Err(ImageError::PartitionMismatch(4))
        );
        assert_eq!(
            validate_partitions(&parts[..1], 3),
            Err(ImageError::PartitionMismatch(3))
        );
    }
}
