//! Property tests: money conservation, no negative balance and ledger
//! completeness over arbitrary operation sequences.

use std::time::Duration;

use ledger_transaction_server::{
    LedgerError,
    models::{AccountId, EntryFilter},
    services::{Operation, TransactionEngine},
    store::{LedgerStore, MemoryStore},
};
use proptest::prelude::*;
use rust_decimal::Decimal;

const ACCOUNTS: i64 = 4;

fn cents(value: u32) -> Decimal {
    Decimal::new(i64::from(value), 2)
}

fn operation() -> impl Strategy<Value = Operation> {
    let account = (1..=ACCOUNTS).prop_map(AccountId);
    let amount = (1u32..=50_000).prop_map(cents);

    prop_oneof![
        (account.clone(), amount.clone())
            .prop_map(|(account_id, amount)| Operation::Deposit { account_id, amount }),
        (account.clone(), amount.clone())
            .prop_map(|(account_id, amount)| Operation::Withdraw { account_id, amount }),
        (account.clone(), account, amount)
            .prop_filter("distinct accounts", |(from, to, _)| from != to)
            .prop_map(|(from, to, amount)| Operation::Transfer { from, to, amount }),
    ]
}

struct Outcome {
    total_before: Decimal,
    total_after: Decimal,
    net_external: Decimal,
    committed: usize,
    entries: usize,
    min_balance: Decimal,
}

async fn run(openings: Vec<u32>, operations: Vec<Operation>) -> Outcome {
    let store = MemoryStore::new();
    for opening in &openings {
        store.open_account(cents(*opening)).await.unwrap();
    }
    let engine = TransactionEngine::new(store.clone(), Duration::from_secs(1));

    let total_before: Decimal = openings.iter().map(|c| cents(*c)).sum();
    let mut net_external = Decimal::ZERO;
    let mut committed = 0;
    let mut min_balance = Decimal::MAX;

    for operation in &operations {
        match engine.execute(operation, "", engine.timeout()).await {
            Ok(_) => {
                committed += 1;
                match *operation {
                    Operation::Deposit { amount, .. } => net_external += amount,
                    Operation::Withdraw { amount, .. } => net_external -= amount,
                    Operation::Transfer { .. } => {}
                }
            }
            Err(LedgerError::InsufficientBalance { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }

        for account in store.accounts().await.unwrap() {
            min_balance = min_balance.min(account.balance);
        }
    }

    let total_after: Decimal = store
        .accounts()
        .await
        .unwrap()
        .iter()
        .map(|a| a.balance)
        .sum();
    let entries = store.entries(EntryFilter::default()).await.unwrap().len();

    Outcome {
        total_before,
        total_after,
        net_external,
        committed,
        entries,
        min_balance,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn money_is_conserved(
        openings in prop::collection::vec(0u32..=100_000, ACCOUNTS as usize),
        operations in prop::collection::vec(operation(), 1..40),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let outcome = runtime.block_on(run(openings, operations));

        prop_assert_eq!(outcome.total_after, outcome.total_before + outcome.net_external);
        prop_assert!(outcome.min_balance >= Decimal::ZERO);
        prop_assert_eq!(outcome.committed, outcome.entries);
    }
}
