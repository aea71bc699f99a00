//! brief example how Ring behaves under node churn:
//! - how keys distribute across weighted nodes
//! - how small the remapped share of the key space is when one node leaves

extern crate hashring_continuum;

use hashring_continuum::{Ring, RingConfig};
use rand::{Rng, distr::Alphanumeric};
use std::collections::HashMap;

fn main() {
    let nodes = vec![
        ("10.0.0.1:11211".to_string(), 1),
        ("10.0.0.2:11211".to_string(), 1),
        ("10.0.0.3:11211".to_string(), 2),
        ("10.0.0.4:11211".to_string(), 2),
    ];

    let mut ring = Ring::with_weighted_nodes(RingConfig::new(), nodes).unwrap();

    // route some random keys and remember their owners
    let keys: Vec<String> = (0..10_000).map(|_| format!("key_{}", random_string())).collect();
    let mut owners = HashMap::new();
    for key in &keys {
        owners.insert(key.clone(), ring.lookup(key).unwrap().clone());
    }

    println!("# distribution of {} keys across the weighted cluster", keys.len());
    print_utilization(&owners);

    // drop one node: only its share of the keys should move
    let leaving = "10.0.0.3:11211".to_string();
    ring.remove_node(&leaving).unwrap();

    let mut remapped = 0;
    for key in &keys {
        if ring.lookup(key).unwrap() != &owners[key] {
            remapped += 1;
        }
    }

    println!("\n# after removing {leaving}");
    println!(
        "remapped {remapped} of {} keys ({:.1}%)",
        keys.len(),
        100.0 * remapped as f64 / keys.len() as f64
    );

    let mut owners_after = HashMap::new();
    for key in &keys {
        owners_after.insert(key.clone(), ring.lookup(key).unwrap().clone());
    }
    print_utilization(&owners_after);
}

fn print_utilization(owners: &HashMap<String, String>) {
    let mut counts: HashMap<&String, usize> = HashMap::new();
    for owner in owners.values() {
        *counts.entry(owner).or_default() += 1;
    }

    let mut counts: Vec<_> = counts.into_iter().collect();
    counts.sort();
    for (node, count) in counts {
        println!("{node}: {count} keys");
    }
}

/// generate a random String so every run routes a fresh key sample
fn random_string() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(7)
        .map(char::from)
        .collect()
}
