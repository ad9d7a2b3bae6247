use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;

use chain_hash::HashTable;
use chain_hash::hash_table::Entry;
use clap::Parser;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "capacity", default_value_t = 16)]
    capacity: usize,

    #[arg(short = 'l', long = "load_factor", default_value_t = 0.75)]
    load_factor: f32,

    #[arg(short = 'n', long = "count", default_value_t = 1000)]
    count: u64,

    /// Remove every other value after filling, to show free-slot accounting.
    #[arg(long = "churn")]
    churn: bool,
}

fn hash_u64(value: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn main() {
    let args = Args::parse();

    let mut table: HashTable<u64> =
        match HashTable::with_capacity_and_load_factor(args.capacity, args.load_factor) {
            Ok(table) => table,
            Err(err) => {
                eprintln!("invalid table configuration: {err}");
                std::process::exit(2);
            }
        };

    println!(
        "Created HashTable with {} buckets, load factor {:.2}",
        table.capacity(),
        table.load_factor()
    );
    println!("Filling table with {} u64 values...", args.count);

    let mut resizes = 0;
    for value in 0..args.count {
        let before = table.capacity();
        match table.entry(hash_u64(value), |&v| v == value) {
            Entry::Vacant(entry) => {
                entry.insert(value);
            }
            Entry::Occupied(_) => {
                panic!("Value already exists in table: {}", value);
            }
        }
        if table.capacity() != before {
            resizes += 1;
        }
    }

    if args.churn {
        for value in (0..args.count).step_by(2) {
            table.remove(hash_u64(value), |&v| v == value);
        }
        println!("Removed every other value, {} remain", table.len());
    }

    println!(
        "Inserted {} values, {} resizes, final capacity {}",
        args.count,
        resizes,
        table.capacity()
    );

    table.chain_histogram().print();
    table.debug_stats().print();
}
