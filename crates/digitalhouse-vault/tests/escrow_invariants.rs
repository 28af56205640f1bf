//! Randomized operation sequences against a single vault.
//!
//! Thousands of seeded runs throw valid and invalid calls from random accounts
//! at random times. After every call, successful or not, the vault must hold
//! exactly the active stake plus the active bids, and the value it took in
//! must equal what it holds plus what it paid out.

use chrono::{DateTime, Duration, Utc};
use digitalhouse_types::*;
use digitalhouse_vault::{SettlementPolicy, Vault, VaultSetup};
use rand::{Rng, SeedableRng, rngs::StdRng};

const RUNS: u64 = 300;
const STEPS: usize = 60;

fn new_vault(t0: DateTime<Utc>, treasury: AccountId) -> Vault {
    Vault::new(VaultSetup {
        id: "FUZZ".into(),
        address: VaultAddress::derive(&AccountId::random(), 0, "FUZZ"),
        property_details: "fuzz".into(),
        base_price: 1_000,
        created_at: t0,
        treasury,
        policy: SettlementPolicy::default(),
        issuer: CredentialIssuer::from_seed(&[3u8; 32]),
    })
    .unwrap()
}

fn assert_invariants(vault: &Vault, seed: u64, step: usize) {
    vault
        .verify_ledger()
        .unwrap_or_else(|e| panic!("seed={seed} step={step}: {e}"));

    let expected_held: u64 = vault.active_reservation().map_or(0, |r| r.stake_amount)
        + vault
            .bids()
            .iter()
            .filter(|b| b.is_active)
            .map(|b| b.amount)
            .sum::<u64>();
    assert_eq!(vault.escrowed(), expected_held, "seed={seed} step={step}");

    let paid: u128 = vault.transfers().iter().map(|t| u128::from(t.amount)).sum();
    let ledger = vault.ledger();
    assert_eq!(
        u128::from(ledger.total_deposited()),
        u128::from(ledger.held()) + paid,
        "seed={seed} step={step}"
    );

    assert!(
        vault.bids().iter().filter(|b| b.is_active).count() <= 1,
        "at most one active bid, seed={seed} step={step}"
    );
    for bid in vault.bids() {
        assert_eq!(bid.is_active, bid.closure.is_none(), "seed={seed}");
    }
    if vault.state().holds_reservation() {
        assert!(vault.active_reservation().is_some(), "seed={seed}");
    } else {
        assert!(vault.active_reservation().is_none(), "seed={seed}");
    }
}

#[test]
fn random_sequences_preserve_escrow() {
    for seed in 0..RUNS {
        let mut rng = StdRng::seed_from_u64(seed);
        let t0 = Utc::now();
        let treasury = AccountId::random();
        let mut vault = new_vault(t0, treasury);
        let accounts: Vec<AccountId> = (0..5).map(|_| AccountId::random()).collect();
        let mut clock = t0;

        for step in 0..STEPS {
            clock += Duration::hours(rng.gen_range(0..12));
            let caller = accounts[rng.gen_range(0..accounts.len())];
            let ctx = CallContext::new(caller, clock);
            let before_nonce = vault.current_nonce();
            let before_state = vault.state();

            let booker_nonce = vault.active_reservation().map_or(0, |r| r.nonce);
            let nonce = if rng.gen_bool(0.9) {
                booker_nonce
            } else {
                rng.gen_range(0..8)
            };

            let result = match rng.gen_range(0..7) {
                0 => {
                    let check_in = clock + Duration::hours(rng.gen_range(-2..48));
                    let check_out = check_in + Duration::hours(rng.gen_range(-2..96));
                    vault
                        .reserve(&ctx, rng.gen_range(500..3_000), check_in, check_out)
                        .map(|_| ())
                }
                1 | 2 => {
                    let floor = vault.leading_bid().map_or(1_000, |b| b.amount);
                    vault
                        .place_bid(&ctx, floor + rng.gen_range(0..500))
                        .map(|_| ())
                }
                3 => {
                    let booker = vault.active_reservation().map_or(caller, |r| r.booker);
                    vault
                        .decide(&ctx.as_caller(booker), nonce, rng.gen_bool(0.3))
                        .map(|_| ())
                }
                4 => {
                    let booker = vault.active_reservation().map_or(caller, |r| r.booker);
                    vault.check_in(&ctx.as_caller(booker), nonce).map(|_| ())
                }
                5 => {
                    let booker = vault.active_reservation().map_or(caller, |r| r.booker);
                    vault.check_out(&ctx.as_caller(booker), nonce).map(|_| ())
                }
                _ => vault.expire(&ctx).map(|_| ()),
            };

            match result {
                Ok(()) => assert_eq!(vault.current_nonce(), before_nonce + 1, "seed={seed}"),
                Err(err) => {
                    assert!(
                        !err.is_invariant_violation(),
                        "seed={seed} step={step}: {err}"
                    );
                    assert_eq!(vault.current_nonce(), before_nonce, "seed={seed}");
                    assert_eq!(vault.state(), before_state, "seed={seed}");
                }
            }
            assert_invariants(&vault, seed, step);
        }
    }
}

#[test]
fn protocol_fees_match_cessions() {
    let mut rng = StdRng::seed_from_u64(0xFEE);
    let t0 = Utc::now();
    let treasury = AccountId::random();
    let mut vault = new_vault(t0, treasury);
    let check_in = t0 + Duration::days(30);
    let check_out = check_in + Duration::days(3);

    let mut booker = AccountId::random();
    vault
        .reserve(&CallContext::new(booker, t0), 1_000, check_in, check_out)
        .unwrap();

    let mut clock = t0;
    for _ in 0..50 {
        clock += Duration::hours(1);
        let bidder = AccountId::random();
        let floor = vault
            .leading_bid()
            .map_or(1_000, |b| b.amount)
            .max(vault.active_reservation().unwrap().stake_amount);
        vault
            .place_bid(&CallContext::new(bidder, clock), floor + rng.gen_range(1..10_000))
            .unwrap();

        if rng.gen_bool(0.5) {
            let nonce = vault.active_reservation().unwrap().nonce;
            vault
                .decide(&CallContext::new(booker, clock), nonce, false)
                .unwrap();
            booker = bidder;
        }
    }

    let fees: Amount = vault
        .transfers()
        .iter()
        .filter(|t| t.reason == TransferReason::ProtocolFee)
        .map(|t| t.amount)
        .sum();
    let recorded: Amount = vault.cessions().iter().map(|c| c.protocol_fee).sum();
    assert_eq!(fees, recorded);
    assert!(vault.transfers().iter().all(|t| t.reason != TransferReason::ProtocolFee
        || t.recipient == treasury));
    for record in vault.cessions() {
        assert_eq!(record.booker_payout + record.protocol_fee, record.lead);
    }
    assert_eq!(vault.closed_reservations().len(), vault.cessions().len());
    assert_eq!(vault.active_reservation().unwrap().booker, booker);
    vault.verify_ledger().unwrap();
}
