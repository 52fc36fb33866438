use crate::config::{GroupSearchConfig, MatchingConfig};
use crate::model::{Assignment, IndexedMatch, MatchKind, Transaction};

/// Confidence of every group match. The search only accepts subsets whose
/// sum is within tolerance, so there is no partial-credit level.
pub const GROUP_CONFIDENCE: f64 = 1.0;

/// Smallest subset that counts as a group; single rows belong to the 1:1 pass.
const MIN_GROUP_MEMBERS: usize = 2;

/// Explain leftover transactions as sums of several transactions on the other side.
///
/// Runs 1:N (each leftover A against leftover B) and then N:1 (each
/// leftover B against what is still left of A). Targets are visited in
/// input order and the first subset found is taken. Every transaction
/// joins at most one group.
pub fn match_groups(
    config: &MatchingConfig,
    transactions_a: &[Transaction],
    transactions_b: &[Transaction],
    unmatched_a: &[usize],
    unmatched_b: &[usize],
) -> Assignment {
    let mut free_a = vec![false; transactions_a.len()];
    let mut free_b = vec![false; transactions_b.len()];
    for &i in unmatched_a {
        free_a[i] = true;
    }
    for &i in unmatched_b {
        free_b[i] = true;
    }

    let mut matched = Vec::new();

    for &ai in unmatched_a {
        if !free_a[ai] {
            continue;
        }
        if let Some(members) =
            find_group(config, &transactions_a[ai], transactions_b, unmatched_b, &free_b)
        {
            free_a[ai] = false;
            for &bi in &members {
                free_b[bi] = false;
            }
            matched.push(IndexedMatch {
                a: vec![ai],
                b: members,
                confidence: GROUP_CONFIDENCE,
                kind: MatchKind::OneToMany,
            });
        }
    }

    for &bi in unmatched_b {
        if !free_b[bi] {
            continue;
        }
        if let Some(members) =
            find_group(config, &transactions_b[bi], transactions_a, unmatched_a, &free_a)
        {
            free_b[bi] = false;
            for &ai in &members {
                free_a[ai] = false;
            }
            matched.push(IndexedMatch {
                a: members,
                b: vec![bi],
                confidence: GROUP_CONFIDENCE,
                kind: MatchKind::ManyToOne,
            });
        }
    }

    log::debug!("group pass: {} groups formed", matched.len());

    Assignment {
        matched,
        unmatched_a: unmatched_a.iter().copied().filter(|&i| free_a[i]).collect(),
        unmatched_b: unmatched_b.iter().copied().filter(|&i| free_b[i]).collect(),
    }
}

/// Amounts are compared in integer minor units (cents).
const MINOR_UNITS: f64 = 100.0;

fn to_minor(amount: f64) -> i64 {
    (amount * MINOR_UNITS).round() as i64
}

/// Rounds down so a group never passes on a tolerance the config does not allow.
fn tolerance_to_minor(tolerance: f64) -> i64 {
    (tolerance * MINOR_UNITS + 1e-6).floor() as i64
}

/// Positions (into `pool`) of the first subset of free rows summing to `target`'s amount.
fn find_group(
    config: &MatchingConfig,
    target: &Transaction,
    pool: &[Transaction],
    pool_positions: &[usize],
    free: &[bool],
) -> Option<Vec<usize>> {
    let target_amount = target.amount;
    if target_amount == 0.0 {
        return None;
    }
    let tolerance = tolerance_to_minor(config.group_tolerance(target_amount));

    // Same-sign rows only, searched in absolute value so the pruning bound holds.
    let mut members: Vec<(i64, usize)> = pool_positions
        .iter()
        .copied()
        .filter(|&i| free[i])
        .filter(|&i| pool[i].amount != 0.0 && pool[i].amount.signum() == target_amount.signum())
        .map(|i| (to_minor(pool[i].amount.abs()), i))
        .collect();
    if members.len() < MIN_GROUP_MEMBERS {
        return None;
    }
    members.sort_by(|x, y| {
        x.0.cmp(&y.0)
            .then_with(|| pool[x.1].row_index.cmp(&pool[y.1].row_index))
            .then_with(|| x.1.cmp(&y.1))
    });

    let amounts: Vec<i64> = members.iter().map(|m| m.0).collect();
    let mut search =
        SubsetSearch::new(&amounts, to_minor(target_amount.abs()), tolerance, &config.group);
    let found = search.run();
    if search.cap_hit {
        log::debug!(
            "group search for {} stopped after {} nodes",
            target.id,
            search.nodes_visited
        );
    }
    found.map(|picked| picked.into_iter().map(|k| members[k].1).collect())
}

/// Depth-first subset-sum over ascending non-negative amounts.
///
/// The path lives in `stack`, not on the call stack, so group size is
/// bounded only by `max_group_size`.
struct SubsetSearch<'a> {
    amounts: &'a [i64],
    target: i64,
    tolerance: i64,
    max_group_size: usize,
    max_nodes: usize,
    nodes_visited: usize,
    cap_hit: bool,
    stack: Vec<usize>,
}

impl<'a> SubsetSearch<'a> {
    fn new(amounts: &'a [i64], target: i64, tolerance: i64, bounds: &GroupSearchConfig) -> Self {
        Self {
            amounts,
            target,
            tolerance,
            max_group_size: bounds.max_group_size,
            max_nodes: bounds.max_search_nodes,
            nodes_visited: 0,
            cap_hit: false,
            stack: Vec::new(),
        }
    }

    /// Visits subsets in lexicographic order of positions; returns the first hit.
    fn run(&mut self) -> Option<Vec<usize>> {
        let ceiling = self.target + self.tolerance;
        let mut sum: i64 = 0;
        let mut next = 0;

        loop {
            if self.nodes_visited >= self.max_nodes {
                self.cap_hit = true;
                return None;
            }
            self.nodes_visited += 1;

            if self.stack.len() >= MIN_GROUP_MEMBERS && (sum - self.target).abs() <= self.tolerance {
                return Some(std::mem::take(&mut self.stack));
            }

            // Descend to the first child.
            if self.stack.len() < self.max_group_size
                && next < self.amounts.len()
                && sum + self.amounts[next] <= ceiling
            {
                self.stack.push(next);
                sum += self.amounts[next];
                next += 1;
                continue;
            }

            // Backtrack to the deepest level whose next sibling still fits.
            // Ascending order: once a sibling overshoots, every later one does too.
            loop {
                let last = self.stack.pop()?;
                sum -= self.amounts[last];
                let sibling = last + 1;
                if sibling < self.amounts.len() && sum + self.amounts[sibling] <= ceiling {
                    self.stack.push(sibling);
                    sum += self.amounts[sibling];
                    next = sibling + 1;
                    break;
                }
            }
        }
    }
}
