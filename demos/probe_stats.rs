use std::collections::BTreeSet;

use clap::Parser;
use probe_hash::LazyProbeTable;
use probe_hash::ProbeTable;
use probe_hash::RobinHoodTable;
use probe_hash::ShiftProbeTable;
use probe_hash::TableConfig;
use probe_hash::TableError;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "capacity", default_value_t = 10_000)]
    capacity: usize,

    #[arg(short = 't', long = "threshold", default_value_t = 0.98)]
    threshold: f32,

    #[arg(short = 'k', long = "key_range", default_value_t = 100_000)]
    key_range: u32,

    #[arg(short = 's', long = "seed")]
    seed: Option<u64>,

    #[arg(long = "histogram")]
    histogram: bool,
}

fn report<T: ProbeTable<u32, u32>>(name: &str, table: &T, histogram: bool) {
    println!(
        "{name}: len={} capacity={} load={:.2}%",
        table.len(),
        table.capacity(),
        table.load_factor() * 100.0
    );
    table.probe_stats().print(name);
    if histogram {
        table.probe_histogram().print();
    }
}

fn verify_present<T: ProbeTable<u32, u32>>(name: &str, table: &T, keys: &[u32]) {
    for key in keys {
        assert_eq!(table.get(key), Ok(key), "{name}: key {key} missing");
    }
}

fn verify_absent<T: ProbeTable<u32, u32>>(name: &str, table: &T, keys: &[u32]) {
    for key in keys {
        assert_eq!(
            table.get(key),
            Err(TableError::NotFound),
            "{name}: key {key} survived removal"
        );
    }
}

fn main() {
    let args = Args::parse();
    let config = TableConfig::new(args.capacity, args.threshold);
    if let Err(err) = config.validate() {
        eprintln!("{err}");
        std::process::exit(2);
    }

    let mut rng = match args.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_os_rng(),
    };

    let max_entries = (args.capacity as f64 * args.threshold as f64) as usize;
    let inserts: Vec<u32> = (0..max_entries)
        .map(|_| rng.random_range(0..=args.key_range))
        .collect();
    let deletes: Vec<u32> = (0..max_entries / 2)
        .map(|_| rng.random_range(0..=args.key_range))
        .collect();

    let deleted: BTreeSet<u32> = deletes.iter().copied().collect();
    let survivors: Vec<u32> = inserts
        .iter()
        .copied()
        .collect::<BTreeSet<u32>>()
        .difference(&deleted)
        .copied()
        .collect();

    let mut lazy: LazyProbeTable<u32, u32> =
        LazyProbeTable::with_config(config).expect("validated config");
    let mut shift: ShiftProbeTable<u32, u32> =
        ShiftProbeTable::with_config(config).expect("validated config");
    let mut robin_hood: RobinHoodTable<u32, u32> =
        RobinHoodTable::with_config(config).expect("validated config");

    println!(
        "Inserting {} random keys from 0..={} (capacity {}, threshold {})",
        inserts.len(),
        args.key_range,
        args.capacity,
        args.threshold
    );
    for &key in &inserts {
        lazy.put(key, key);
        shift.put(key, key);
        robin_hood.put(key, key);
    }

    verify_present("lazy", &lazy, &inserts);
    verify_present("shift", &shift, &inserts);
    verify_present("robin_hood", &robin_hood, &inserts);

    println!("\nAfter insertion:");
    report("lazy", &lazy, args.histogram);
    report("shift", &shift, args.histogram);
    report("robin_hood", &robin_hood, args.histogram);

    println!("\nRemoving {} random keys", deletes.len());
    for key in &deletes {
        lazy.remove(key);
        shift.remove(key);
        robin_hood.remove(key);
    }

    verify_absent("lazy", &lazy, &deletes);
    verify_absent("shift", &shift, &deletes);
    verify_absent("robin_hood", &robin_hood, &deletes);

    println!("\nAfter removal:");
    report("lazy", &lazy, args.histogram);
    println!("lazy: tombstones={}", lazy.tombstones());
    report("shift", &shift, args.histogram);
    report("robin_hood", &robin_hood, args.histogram);

    verify_present("lazy", &lazy, &survivors);
    verify_present("shift", &shift, &survivors);
    verify_present("robin_hood", &robin_hood, &survivors);

    println!("\nAll {} surviving keys verified", survivors.len());
}
