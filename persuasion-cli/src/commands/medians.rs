//! `medians` command

use anyhow::{Context as _, Result};
use clap::Args;
use comfy_table::{Cell, CellAlignment};
use serde::Serialize;

use crate::cli::InputArgs;
use crate::context::Context;
use crate::output::{format_number, TableDisplay};

#[derive(Debug, Args)]
pub struct MediansArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Debug, Serialize)]
struct PrincipleMedianCell {
    principle: String,
    median: f64,
}

/// One row of the method × principle median matrix.
#[derive(Debug, Serialize)]
struct MedianRow {
    method: String,
    medians: Vec<PrincipleMedianCell>,
}

impl TableDisplay for MedianRow {
    fn to_row(&self) -> Vec<Cell> {
        std::iter::once(Cell::new(&self.method))
            .chain(
                self.medians
                    .iter()
                    .map(|m| Cell::new(format_number(m.median)).set_alignment(CellAlignment::Right)),
            )
            .collect()
    }

    fn display_single(&self) {
        println!("{}", self.method);
        for m in &self.medians {
            crate::output::print_field(&m.principle, &format_number(m.median));
        }
    }

    fn display_compact(&self) {
        let values: Vec<String> = self.medians.iter().map(|m| format_number(m.median)).collect();
        println!("{}\t{}", self.method, values.join("\t"));
    }
}

pub fn execute(ctx: &Context, args: MediansArgs) -> Result<()> {
    let (_, pipeline, table) = ctx.prepare(&args.input)?;

    let (_, matrix) = pipeline.run_blocks(&table).context("Block analysis failed")?;

    let rows: Vec<MedianRow> = matrix
        .methods()
        .iter()
        .zip(matrix.rows())
        .map(|(method, values)| MedianRow {
            method: method.clone(),
            medians: matrix
                .principles()
                .iter()
                .zip(values)
                .map(|(principle, &median)| PrincipleMedianCell {
                    principle: principle.clone(),
                    median,
                })
                .collect(),
        })
        .collect();

    let headers: Vec<&str> = std::iter::once("Method")
        .chain(matrix.principles().iter().map(String::as_str))
        .collect();
    ctx.output.write_list(&rows, &headers)
}
