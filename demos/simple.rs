//! basic example to showcase the main functions of Ring

extern crate hashring_continuum;
use hashring_continuum::{Ring, RingConfig};
use std::net::SocketAddr;
use std::str::FromStr;

fn main() {
    // two cache servers, the second one twice as powerful
    let nodes = vec![
        (SocketAddr::from_str("10.0.0.1:11211").unwrap(), 1),
        (SocketAddr::from_str("10.0.0.2:11211").unwrap(), 2),
    ];

    let mut ring = Ring::with_weighted_nodes(RingConfig::new(), nodes).unwrap();

    // return the node that owns the key 'user:42'
    println!("owner of key user:42: {:?}", ring.lookup("user:42"));

    // walk the ring from the key's position: primary first, then the next
    // distinct node as a fallback/replication target
    println!(
        "targets for key user:42: {:?}",
        ring.iter_distinct("user:42").collect::<Vec<_>>()
    );

    // drop the primary; only its share of the key space is remapped
    let primary = ring.lookup("user:42").unwrap().clone();
    ring.remove_node(&primary).unwrap();
    println!("owner of key user:42 after removal: {:?}", ring.lookup("user:42"));
}
