//! Property-based tests for ledger invariants
//!
//! - Granule conservation across arbitrary transfer/rebase sequences
//! - Exact `+1` rebases at every supply magnitude
//! - Fee arithmetic: `fee + net == amount`
//! - Supply stays within `[MIN_SUPPLY, MAX_SUPPLY]`

use proptest::prelude::*;
use rebase_ledger::{
    Address, Amount, Capabilities, Config, Error, RebaseLedger, SupplyDelta, MAX_SUPPLY,
    MIN_SUPPLY,
};

const OWNER: u64 = 1;
const POLICY: u64 = 2;
const REWARD: u64 = 3;

fn setup() -> RebaseLedger {
    let owner = Address::from_low_u64(OWNER);
    let caps = Capabilities::new(owner).with_monetary_policy(Address::from_low_u64(POLICY));
    let mut ledger = RebaseLedger::new(Config::default(), caps).unwrap();
    ledger.initialize(owner).unwrap();
    ledger
        .set_reward_address(&owner, Address::from_low_u64(REWARD))
        .unwrap();
    ledger
}

#[derive(Debug, Clone)]
enum Op {
    Transfer { from: u64, to: u64, amount: Amount },
    Rebase(SupplyDelta),
}

/// Strategy for a handful of accounts, owner included
fn account_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![Just(OWNER), Just(REWARD), 10u64..15]
}

fn delta_strategy() -> impl Strategy<Value = SupplyDelta> {
    prop_oneof![
        (0u128..1_000_000_000_000_000).prop_map(SupplyDelta::expand),
        (0u128..1_000_000_000_000_000).prop_map(SupplyDelta::contract),
        any::<u128>().prop_map(SupplyDelta::expand),
        any::<u128>().prop_map(SupplyDelta::contract),
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (account_strategy(), account_strategy(), 0u128..10_000_000_000_000)
            .prop_map(|(from, to, amount)| Op::Transfer { from, to, amount }),
        1 => delta_strategy().prop_map(Op::Rebase),
    ]
}

proptest! {
    #[test]
    fn granules_are_conserved(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut ledger = setup();
        let policy = Address::from_low_u64(POLICY);

        for (epoch, op) in ops.into_iter().enumerate() {
            match op {
                Op::Transfer { from, to, amount } => {
                    let _ = ledger.transfer(
                        &Address::from_low_u64(from),
                        &Address::from_low_u64(to),
                        amount,
                    );
                }
                Op::Rebase(delta) => {
                    ledger.rebase(&policy, epoch as u64, delta).unwrap();
                }
            }
            prop_assert!(ledger.check_granule_conservation().is_ok());
            prop_assert!(ledger.total_supply() >= MIN_SUPPLY);
        }
    }

    #[test]
    fn balances_never_exceed_supply(
        amounts in prop::collection::vec(1u128..100_000_000_000_000, 1..10),
        delta in delta_strategy(),
    ) {
        let mut ledger = setup();
        let owner = Address::from_low_u64(OWNER);
        let holders: Vec<Address> = (0..amounts.len() as u64)
            .map(|i| Address::from_low_u64(100 + i))
            .collect();

        for (holder, amount) in holders.iter().zip(&amounts) {
            ledger.transfer(&owner, holder, *amount).unwrap();
        }
        ledger.rebase(&Address::from_low_u64(POLICY), 1, delta).unwrap();

        let mut sum: Amount = ledger.balance_of(&owner) + ledger.balance_of(&Address::from_low_u64(REWARD));
        for holder in &holders {
            sum += ledger.balance_of(holder);
        }
        prop_assert!(sum <= ledger.total_supply());
        // Each balance rounds down by less than one unit
        prop_assert!(ledger.total_supply() - sum <= holders.len() as u128 + 2);
    }

    #[test]
    fn fee_plus_net_is_amount(amount in 0u128..1_000_000_000_000_000, divisor in 1u128..10_000) {
        let mut ledger = setup();
        let owner = Address::from_low_u64(OWNER);
        ledger.set_fee_rate_divisor(&owner, divisor).unwrap();

        let receipt = ledger.transfer(&owner, &Address::from_low_u64(10), amount).unwrap();
        prop_assert_eq!(receipt.fee, amount / divisor);
        prop_assert_eq!(receipt.fee + receipt.net_amount, amount);
        prop_assert_eq!(ledger.balance_of(&Address::from_low_u64(10)), receipt.net_amount);
    }

    #[test]
    fn rebase_result_is_clamped(start in delta_strategy(), delta in delta_strategy()) {
        let mut ledger = setup();
        let policy = Address::from_low_u64(POLICY);
        ledger.rebase(&policy, 1, start).unwrap();

        let before = ledger.total_supply();
        let after = ledger.rebase(&policy, 2, delta).unwrap();

        let expected = if delta.is_negative() {
            before.saturating_sub(delta.magnitude()).max(MIN_SUPPLY)
        } else {
            before.saturating_add(delta.magnitude())
        };
        prop_assert_eq!(after, expected);
    }
}

#[test]
fn test_unit_rebase_exact_up_to_max_supply() {
    let mut ledger = setup();
    let policy = Address::from_low_u64(POLICY);
    let mut epoch = 0u64;

    // Double until one below MAX_SUPPLY, checking a +1 step at every magnitude
    loop {
        let supply = ledger.total_supply();

        epoch += 1;
        let bumped = ledger.rebase(&policy, epoch, SupplyDelta::expand(1)).unwrap();
        assert_eq!(bumped - supply, 1, "+1 drifted at supply {}", supply);

        if bumped >= MAX_SUPPLY - 1 {
            break;
        }

        epoch += 1;
        let grow = bumped.min(MAX_SUPPLY - 1 - bumped);
        ledger.rebase(&policy, epoch, SupplyDelta::expand(grow)).unwrap();
    }

    assert_eq!(ledger.total_supply(), MAX_SUPPLY);
    let owner = Address::from_low_u64(OWNER);
    assert_eq!(ledger.balance_of(&owner), MAX_SUPPLY);
}

#[test]
fn test_rebase_rejects_non_policy() {
    let mut ledger = setup();
    let result = ledger.rebase(&Address::from_low_u64(OWNER), 1, SupplyDelta::expand(1));
    assert!(matches!(result, Err(Error::NotAuthorized(_))));
}
