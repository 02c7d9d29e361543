use crate::cli::SpecCommands;
use crate::support::{fail, print_json};
use codemap_kernel::{RowIndex, RowSpecCodec};
use serde_json::json;
use std::collections::BTreeSet;

pub fn run(command: SpecCommands) {
    match command {
        SpecCommands::Normalize { spec, limit, json } => run_normalize(spec, limit, json),
        SpecCommands::Subtract {
            spec,
            limit,
            remove,
            json,
        } => run_subtract(spec, limit, remove, json),
    }
}

fn run_normalize(spec: String, limit: u64, json_output: bool) {
    let codec = RowSpecCodec::new(limit);
    let set = codec.normalize_set(&spec).unwrap_or_else(|e| fail(e));
    let specification = codec.specification(&set);
    let serialized = codec.serialize(&set);

    if json_output {
        print_json(&json!({
            "action": "spec.normalize",
            "input": spec,
            "limit": limit,
            "specification": specification,
            "serialized": serialized,
        }));
    } else {
        println!(
            "codemap spec normalize\n  Specification: {}\n  Serialized: {}\n  Rows: {}",
            specification.text, serialized, specification.count
        );
    }
}

fn run_subtract(spec: String, limit: u64, remove: Vec<String>, json_output: bool) {
    let codec = RowSpecCodec::new(limit);
    let removals: Vec<BTreeSet<RowIndex>> = remove
        .iter()
        .map(|text| {
            let set = codec.parse(text).unwrap_or_else(|e| fail(e));
            set.clip(limit).iter(limit).collect()
        })
        .collect();
    let borrowed: Vec<&BTreeSet<RowIndex>> = removals.iter().collect();
    let remaining = codec
        .subtract(&spec, &borrowed)
        .unwrap_or_else(|e| fail(e));

    if json_output {
        print_json(&json!({
            "action": "spec.subtract",
            "input": spec,
            "limit": limit,
            "removed": remove,
            "specification": remaining,
        }));
    } else {
        match remaining {
            Some(remaining) => println!(
                "codemap spec subtract\n  Specification: {}\n  Rows: {}",
                remaining.text, remaining.count
            ),
            None => println!("codemap spec subtract\n  Specification: (none)\n  Rows: 0"),
        }
    }
}
