//! Property tests for the route table invariants.

use std::collections::HashMap;
use std::net::SocketAddr;

use mojito_routing::{
    AddOutcome, Contact, ContactPolicy, Kuid, PurgeMode, RouteTable, RouteTableConfig,
    SelectMode, Timestamp,
};
use proptest::prelude::*;

fn now() -> Timestamp {
    Timestamp::from_secs(10_000)
}

fn contact(id: [u8; 20], net: [u8; 2]) -> Contact {
    let addr = SocketAddr::from(([10, net[0], net[1], 1], 4000));
    Contact::live(Kuid::new(id), addr, None, now())
}

fn table(local: [u8; 20], k: usize, ratio: f32) -> RouteTable {
    let config = RouteTableConfig {
        k,
        max_cache_size: 3,
        max_network_class_ratio: ratio,
        ..RouteTableConfig::for_testing()
    };
    RouteTable::new(
        Kuid::new(local),
        "10.255.0.1:4000".parse().unwrap(),
        config,
        ContactPolicy::for_testing(),
    )
}

fn assert_structure(table: &RouteTable) -> Result<(), TestCaseError> {
    prop_assert!(table.check_partition().is_ok());
    let mut seen = HashMap::new();
    for bucket in table.buckets() {
        prop_assert!(bucket.active_size() <= bucket.max_active_size());
        prop_assert!(bucket.cache_size() <= bucket.max_cache_size());
        for c in bucket.active_contacts().iter().chain(bucket.cached_contacts()) {
            prop_assert!(bucket.contains(c.node_id()));
            prop_assert!(seen.insert(*c.node_id(), ()).is_none(), "duplicate {}", c.node_id());
        }
    }
    prop_assert!(table.get(table.local_id()).is_some_and(|c| c.is_local()));
    Ok(())
}

proptest! {
    #[test]
    fn test_partition_and_capacity_hold(
        local in any::<[u8; 20]>(),
        k in 2usize..8,
        ops in prop::collection::vec((any::<[u8; 20]>(), any::<[u8; 2]>(), 0u8..10), 1..150),
    ) {
        let mut table = table(local, k, 1.0);
        for (id, net, op) in ops {
            match op {
                0 => {
                    let addr = SocketAddr::from(([10, net[0], net[1], 1], 4000));
                    table.handle_failure(&Kuid::new(id), addr, now());
                }
                1 => table.purge(&[PurgeMode::PurgeContacts, PurgeMode::MergeBuckets], now()),
                _ => {
                    table.add(contact(id, net), now());
                }
            }
            assert_structure(&table)?;
        }
    }

    #[test]
    fn test_select_is_sorted_and_exact(
        local in any::<[u8; 20]>(),
        ids in prop::collection::vec((any::<[u8; 20]>(), any::<[u8; 2]>()), 1..120),
        target in any::<[u8; 20]>(),
        count in 1usize..30,
    ) {
        let mut table = table(local, 4, 1.0);
        for (id, net) in ids {
            table.add(contact(id, net), now());
        }
        let target = Kuid::new(target);

        let selected = table.select(&target, count, SelectMode::All);
        let distances: Vec<Kuid> = selected.iter().map(|c| c.node_id().xor(&target)).collect();
        prop_assert!(distances.windows(2).all(|w| w[0] <= w[1]));

        let mut expected: Vec<Kuid> = table
            .active_contacts()
            .iter()
            .map(|c| c.node_id().xor(&target))
            .collect();
        expected.sort();
        expected.truncate(count);
        prop_assert_eq!(distances, expected);
    }

    #[test]
    fn test_network_class_ratio_is_never_exceeded(
        local in any::<[u8; 20]>(),
        ratio_tenths in 1u8..10,
        ops in prop::collection::vec((any::<[u8; 20]>(), any::<u8>(), 0u8..10), 1..120),
    ) {
        let ratio = f32::from(ratio_tenths) / 10.0;
        let k = 10;
        let mut table = table(local, k, ratio);
        for (id, host, op) in ops {
            // Every remote contact comes from 10.7.7.0/24 or 10.8.8.0/24.
            let net = if host % 3 == 0 { [8, 8] } else { [7, 7] };
            let addr = SocketAddr::from(([10, net[0], net[1], host], 4000));
            match op {
                0 => table.purge(&[PurgeMode::PurgeContacts], now()),
                1 => {
                    table.handle_failure(&Kuid::new(id), addr, now());
                }
                2 | 3 => {
                    table.add(Contact::unknown(Kuid::new(id), addr), now());
                }
                _ => {
                    table.add(Contact::live(Kuid::new(id), addr, None, now()), now());
                }
            }
            // Fail a known contact now and then so purges find dead entries.
            if op == 1 {
                if let Some(victim) = table.contacts().into_iter().find(|c| !c.is_local()) {
                    for _ in 0..4 {
                        table.handle_failure(victim.node_id(), victim.contact_address(), now());
                    }
                }
            }

            let limit = usize::from(ratio_tenths);
            for bucket in table.buckets() {
                for net in [[8u8, 8u8], [7, 7]] {
                    let same_net = bucket
                        .active_contacts()
                        .iter()
                        .filter(|c| !c.is_local())
                        .filter(|c| match c.contact_address().ip() {
                            std::net::IpAddr::V4(v4) => v4.octets()[1..3] == net,
                            std::net::IpAddr::V6(_) => false,
                        })
                        .count();
                    prop_assert!(same_net <= limit, "{} > {}", same_net, limit);
                }
            }
        }
    }

    #[test]
    fn test_readding_known_contacts_never_grows_the_table(
        local in any::<[u8; 20]>(),
        ids in prop::collection::vec((any::<[u8; 20]>(), any::<[u8; 2]>()), 1..60),
    ) {
        let mut table = table(local, 4, 1.0);
        for (id, net) in &ids {
            table.add(contact(*id, *net), now());
        }

        for (id, net) in &ids {
            if table.get(&Kuid::new(*id)).is_none() {
                continue;
            }
            let size = table.size();
            let outcome = table.add(contact(*id, *net), now());
            prop_assert!(
                matches!(outcome, AddOutcome::Updated | AddOutcome::Unchanged),
                "{:?}",
                outcome
            );
            prop_assert_eq!(table.size(), size);
        }
    }
}
