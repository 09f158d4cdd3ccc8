//! Property tests for lease and listener accounting.
//!
//! Arbitrary interleavings of mount/unmount must leave the shared context
//! exactly where it started: zero listeners, zero leases, no live socket.

use gigchat_app::{ConnectionManager, RuntimeConfig};
use gigchat_harness::{SimBroker, SimConnector};
use gigchat_proto::Namespace;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Acquire,
    Release,
    Subscribe,
    Unsubscribe,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![Just(Op::Acquire), Just(Op::Release), Just(Op::Subscribe), Just(Op::Unsubscribe)]
}

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread().enable_time().start_paused(true).build().unwrap()
}

proptest! {
    /// INVARIANT: lease count equals leases held; listener count equals
    /// subscriptions held; dropping everything nets to zero.
    #[test]
    fn mount_unmount_nets_to_zero(ops in prop::collection::vec(op(), 0..60)) {
        paused_runtime().block_on(async {
            let broker = SimBroker::new();
            let manager = ConnectionManager::new(
                SimConnector::new(broker.clone()),
                "me",
                RuntimeConfig::default(),
            );

            let mut leases = Vec::new();
            // Each subscription tagged with the connection it was taken on.
            let mut subscriptions = Vec::new();
            let mut connection = 0usize;

            for op in ops {
                match op {
                    Op::Acquire => {
                        if leases.is_empty() {
                            connection += 1;
                        }
                        leases.push(manager.acquire(Namespace::Chat, "abc").unwrap());
                    },
                    Op::Release => {
                        leases.pop();
                    },
                    Op::Subscribe => {
                        if let Some(lease) = leases.last() {
                            subscriptions.push((connection, lease.subscribe()));
                        }
                    },
                    Op::Unsubscribe => {
                        subscriptions.pop();
                    },
                }

                assert_eq!(manager.lease_count(Namespace::Chat), leases.len());
                if let Some(lease) = leases.last() {
                    let live = subscriptions.iter().filter(|(c, _)| *c == connection).count();
                    assert_eq!(lease.listener_count(), live);
                }
            }

            subscriptions.clear();
            if let Some(lease) = leases.last() {
                assert_eq!(lease.listener_count(), 0);
            }

            leases.clear();
            assert_eq!(manager.lease_count(Namespace::Chat), 0);
            assert!(!manager.is_live(Namespace::Chat));
        });
    }
}
