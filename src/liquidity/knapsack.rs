//! Bounded-knapsack liquidity optimizer.
//!
//! Given a budget in satoshis and the chunks expanded from an offer
//! snapshot, finds the chunk subset that maximizes total liquidity
//! without exceeding the budget, and reports how many chunks each
//! seller account contributes to that optimum.
//!
//! The table is dense over integer budgets, so runtime is
//! O(budget * chunks). Budgets here come from fiat amounts of a few
//! hundred USD, which keeps the table in the low millions of cells.

use std::collections::HashMap;

use super::chunks::Chunk;

// ---------------------------------------------------------------------------
// Solution
// ---------------------------------------------------------------------------

/// Optimal purchase plan for one budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    /// Total liquidity bought, in satoshis.
    pub liquidity: u64,
    /// Realized cost of the chosen chunks, in satoshis.
    pub total_cost: u64,
    /// Chunk count per seller account.
    pub orders: HashMap<String, u32>,
}

impl Solution {
    fn none() -> Self {
        Self {
            liquidity: 0,
            total_cost: 0,
            orders: HashMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Solver
// ---------------------------------------------------------------------------

/// One DP cell: best liquidity reachable at this exact budget, plus the
/// per-account chunk counts that reach it. Accounts are interned so a
/// cell clones as a small vector of integer pairs.
#[derive(Debug, Clone, Default)]
struct Cell {
    liquidity: u64,
    orders: Vec<(u32, u32)>,
}

/// Maximize liquidity under `budget_sats`, using each chunk at most once.
///
/// Classic 0/1 knapsack over integer budgets with value = liquidity and
/// weight = cost. Chunks are taken in slice order with budgets scanned
/// high to low, and a cell is replaced only on strict improvement, so
/// ties resolve to the earliest chunks. The returned allocation is the
/// lowest-budget cell achieving the global maximum, which also makes it
/// the cheapest among equally good plans.
pub fn solve(budget_sats: u64, chunks: &[Chunk]) -> Solution {
    if chunks.is_empty() {
        return Solution::none();
    }

    let budget = budget_sats as usize;

    // Intern account names so cells hold indices, not strings.
    let mut account_ids: HashMap<&str, u32> = HashMap::new();
    let mut accounts: Vec<&str> = Vec::new();
    let mut chunk_accounts: Vec<u32> = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let next_id = accounts.len() as u32;
        let id = *account_ids.entry(chunk.account.as_str()).or_insert_with(|| {
            accounts.push(chunk.account.as_str());
            next_id
        });
        chunk_accounts.push(id);
    }

    let mut table: Vec<Cell> = vec![Cell::default(); budget + 1];

    for (chunk, &account) in chunks.iter().zip(&chunk_accounts) {
        let cost = chunk.cost as usize;
        if cost > budget {
            continue;
        }
        for b in (cost..=budget).rev() {
            let candidate = table[b - cost].liquidity + chunk.liquidity;
            if candidate > table[b].liquidity {
                let mut orders = table[b - cost].orders.clone();
                bump(&mut orders, account);
                table[b] = Cell { liquidity: candidate, orders };
            }
        }
    }

    // Lowest budget achieving the global maximum wins.
    let mut best: &Cell = &table[0];
    for cell in &table[1..] {
        if cell.liquidity > best.liquidity {
            best = cell;
        }
    }

    // Realized cost comes from the allocation itself. Chunks of one
    // account all share a cost under this offer model.
    let mut orders = HashMap::with_capacity(best.orders.len());
    let mut total_cost = 0u64;
    for &(account, count) in &best.orders {
        let cost = cost_for_account(chunks, &chunk_accounts, account);
        debug_assert!(
            chunk_accounts
                .iter()
                .enumerate()
                .filter(|&(_, &a)| a == account)
                .all(|(i, _)| chunks[i].cost == cost),
            "chunks of one account must share a cost"
        );
        total_cost += cost * count as u64;
        orders.insert(accounts[account as usize].to_string(), count);
    }

    Solution {
        liquidity: best.liquidity,
        total_cost,
        orders,
    }
}

// -- Internal helpers -------------------------------------------------------

fn bump(orders: &mut Vec<(u32, u32)>, account: u32) {
    match orders.iter_mut().find(|e| e.0 == account) {
        Some(entry) => entry.1 += 1,
        None => orders.push((account, 1)),
    }
}

fn cost_for_account(chunks: &[Chunk], chunk_accounts: &[u32], account: u32) -> u64 {
    chunk_accounts
        .iter()
        .position(|&a| a == account)
        .map(|i| chunks[i].cost)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
