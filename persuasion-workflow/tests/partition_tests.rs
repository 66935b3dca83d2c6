mod common;

use common::survey_table;
use persuasion_core::{AnalysisConfig, CoreError, RatingRow, RatingTable};
use persuasion_workflow::partition::BlockPartitioner;
use pretty_assertions::assert_eq;
use rstest::rstest;

fn methods(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_partition_default_layout() {
    let table = survey_table(&["Spear Phishing", "Vishing", "Baiting"], 30);
    let partitioner = BlockPartitioner::from_config(&AnalysisConfig::default());

    let blocks = partitioner.partition(&table, &table.method_labels()).unwrap();

    assert_eq!(blocks.len(), 3);
    for (i, block) in blocks.iter().enumerate() {
        assert_eq!(block.index, i);
        assert_eq!(block.len(), 30);
        assert_eq!(block.start_row, i * 30);
        assert_eq!(block.columns.len(), 6);
    }
    assert_eq!(blocks[1].method, "Vishing");
    assert_eq!(blocks[1].sheet_rows, (32, 61));
    assert_eq!(blocks[2].column(3), table.column(3)[60..90].to_vec().as_slice());
}

#[test]
fn test_partition_block_past_end() {
    let table = survey_table(&["a", "b"], 10);
    let partitioner = BlockPartitioner::new(12, 0).with_label_validation(false);

    let err = partitioner.partition(&table, &methods(&["a", "b"])).unwrap_err();
    assert!(matches!(err, CoreError::Partition(_)));
}

#[test]
fn test_partition_detects_label_misalignment() {
    let table = survey_table(&["a", "b"], 10);
    let partitioner = BlockPartitioner::new(8, 0);

    let err = partitioner.partition(&table, &table.method_labels()).unwrap_err();
    match err {
        CoreError::Partition(msg) => {
            assert!(msg.contains("'b'"), "{}", msg);
            assert!(msg.contains("row 10"), "{}", msg);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_partition_positional_mode_accepts_misalignment() {
    let table = survey_table(&["a", "b"], 10);
    let partitioner = BlockPartitioner::new(8, 0).with_label_validation(false);

    let blocks = partitioner.partition(&table, &table.method_labels()).unwrap();
    assert_eq!(blocks[1].start_row, 8);
}

#[rstest]
#[case(0)]
#[case(3)]
fn test_partition_rows_before_first_label(#[case] start_row: usize) {
    let mut rows: Vec<RatingRow> = (0..start_row).map(|_| RatingRow::new(vec![1.0, 2.0])).collect();
    rows.push(RatingRow::new(vec![1.0, 2.0]).with_method("m"));
    rows.push(RatingRow::new(vec![3.0, 0.0]));
    let table = RatingTable::new(vec!["x".to_string(), "y".to_string()], rows).unwrap();

    let blocks = BlockPartitioner::new(2, start_row)
        .partition(&table, &table.method_labels())
        .unwrap();

    assert_eq!(blocks[0].columns, vec![vec![1.0, 3.0], vec![2.0, 0.0]]);
}

#[test]
fn test_partition_without_methods() {
    let table = RatingTable::new(vec!["x".to_string()], vec![RatingRow::new(vec![1.0])]).unwrap();

    let err = BlockPartitioner::new(1, 0).partition(&table, &[]).unwrap_err();
    assert_eq!(err, CoreError::Partition("no method labels".to_string()));
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    const NAMES: [&str; 4] = ["m0", "m1", "m2", "m3"];

    proptest! {
        #[test]
        fn blocks_tile_the_table(n_methods in 1usize..=4, block_size in 2usize..12) {
            let table = survey_table(&NAMES[..n_methods], block_size);
            let blocks = BlockPartitioner::new(block_size, 0)
                .partition(&table, &table.method_labels())
                .unwrap();

            prop_assert_eq!(blocks.len(), n_methods);
            for (i, block) in blocks.iter().enumerate() {
                prop_assert_eq!(block.start_row, i * block_size);
                prop_assert_eq!(block.len(), block_size);
                prop_assert_eq!(block.columns.len(), table.principles().len());
                for (j, column) in block.columns.iter().enumerate() {
                    prop_assert_eq!(column.as_slice(), &table.column(j)[i * block_size..(i + 1) * block_size]);
                }
            }
        }
    }
}
