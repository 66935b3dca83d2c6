use persuasion_core::{AnalysisConfig, CoreError, MethodBlock, RatingTable, Result};

/// Cuts a ratings table into fixed-size, per-method blocks of rows.
#[derive(Debug, Clone)]
pub struct BlockPartitioner {
    block_size: usize,
    start_row: usize,
    validate_labels: bool,
}

impl BlockPartitioner {
    pub fn new(block_size: usize, start_row: usize) -> Self {
        Self {
            block_size,
            start_row,
            validate_labels: true,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.block_size, config.start_row).with_label_validation(config.validate_labels)
    }

    pub fn with_label_validation(mut self, enabled: bool) -> Self {
        self.validate_labels = enabled;
        self
    }

    /// Block `i` covers rows `[start + i * size, start + (i + 1) * size)` and belongs to
    /// `methods[i]`.
    ///
    /// Fails when a block runs past the end of the table or, with label validation on,
    /// when a row's forward-filled method label differs from the block's method.
    pub fn partition(&self, table: &RatingTable, methods: &[String]) -> Result<Vec<MethodBlock>> {
        if self.block_size == 0 {
            return Err(CoreError::Validation("block size must be at least 1".to_string()));
        }
        if methods.is_empty() {
            return Err(CoreError::Partition("no method labels".to_string()));
        }

        let labels = if self.validate_labels {
            Some(table.forward_filled_labels())
        } else {
            None
        };

        if self.start_row > 0 {
            tracing::warn!(
                skipped = self.start_row.min(table.len()),
                "rows before the first block are not assigned to any method"
            );
        }

        let mut blocks = Vec::with_capacity(methods.len());

        for (index, method) in methods.iter().enumerate() {
            let start = self.start_row + index * self.block_size;
            let end = start + self.block_size;

            if end > table.len() {
                return Err(CoreError::Partition(format!(
                    "block {} for method '{}' needs rows {}..{} but the table has {} rows",
                    index,
                    method,
                    start,
                    end,
                    table.len()
                )));
            }

            if let Some(labels) = &labels {
                for (row, label) in labels.iter().enumerate().take(end).skip(start) {
                    if label.as_deref() != Some(method.as_str()) {
                        return Err(CoreError::Partition(format!(
                            "block {} expects method '{}' but sheet row {} belongs to {}",
                            index,
                            method,
                            table.sheet_row(row),
                            label
                                .as_deref()
                                .map_or_else(|| "no method".to_string(), |l| format!("'{}'", l))
                        )));
                    }
                }
            }

            let columns = (0..table.principles().len())
                .map(|j| table.rows()[start..end].iter().map(|r| r.scores[j]).collect())
                .collect();

            blocks.push(MethodBlock {
                index,
                method: method.clone(),
                start_row: start,
                sheet_rows: (table.sheet_row(start), table.sheet_row(end - 1)),
                principles: table.principles().to_vec(),
                columns,
            });
        }

        let covered = self.start_row + methods.len() * self.block_size;
        if covered < table.len() {
            tracing::warn!(
                uncovered = table.len() - covered,
                "rows after the last block are not assigned to any method"
            );
        }

        tracing::info!(blocks = blocks.len(), block_size = self.block_size, "partitioned table");
        Ok(blocks)
    }
}
