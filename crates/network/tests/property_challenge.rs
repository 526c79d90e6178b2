//! Property tests for the stateless, address-bound challenge token (spec
//! §8: mint/verify windowing and address binding).

use std::{net::SocketAddr, sync::Arc, time::Duration};

use hyquery_core::StaticClock;
use hyquery_cryptography::HmacKey;
use hyquery_network::{challenge::WINDOW_SECS, ChallengeService};
use proptest::prelude::*;

fn addr_from(octets: [u8; 4], port: u16) -> SocketAddr {
    SocketAddr::from((octets, port))
}

proptest! {
    /// A token minted for `addr` verifies immediately, still verifies after
    /// `windows_back - 1` full windows have elapsed (the last window the
    /// configured validity accepts), and no longer verifies once a full
    /// `windows_back` windows have elapsed. The clock starts aligned to a
    /// window boundary so window-crossing counts are exact, not approximate.
    #[test]
    fn mint_then_verify_holds_for_the_configured_validity(
        a in any::<[u8; 4]>(),
        port in 1u16..=u16::MAX,
        validity_seconds in 1u64..600,
    ) {
        let clock = Arc::new(StaticClock::at(1_700_000_010_000));
        let service = ChallengeService::new(HmacKey::new(b"probe-secret"), clock.clone(), validity_seconds);
        let addr = addr_from(a, port);

        let token = service.mint(addr);
        prop_assert!(service.verify(&token, addr));

        let windows_back = validity_seconds.div_ceil(WINDOW_SECS as u64).max(1);

        // Still valid through the last accepted window.
        clock.advance(Duration::from_secs((windows_back - 1) * WINDOW_SECS as u64));
        prop_assert!(service.verify(&token, addr));

        // No longer valid once a full `windows_back` windows have elapsed.
        clock.advance(Duration::from_secs(WINDOW_SECS as u64));
        prop_assert!(!service.verify(&token, addr));
    }

    /// A token minted for one address never verifies for a different one,
    /// regardless of how the two addresses differ.
    #[test]
    fn tokens_never_verify_for_a_different_address(
        a in any::<[u8; 4]>(),
        b in any::<[u8; 4]>(),
        port in 1u16..=u16::MAX,
    ) {
        prop_assume!(a != b);
        let clock = Arc::new(StaticClock::at(1_700_000_000_000));
        let service = ChallengeService::new(HmacKey::new(b"probe-secret"), clock, 30);

        let token = service.mint(addr_from(a, port));
        prop_assert!(!service.verify(&token, addr_from(b, port)));
    }
}
