//! Edge-list loading
//!
//! One `source target` pair per line, whitespace separated. Blank lines and
//! lines starting with `#` are skipped. Accounts are created on first sight.

use anyhow::{bail, Context, Result};
use chokepoint::{AnalyticsError, GraphStore};
use std::io::BufRead;
use std::path::Path;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadStats {
    pub follows: usize,
    pub duplicates: usize,
    pub self_follows: usize,
}

pub fn load_edges(path: &Path) -> Result<(GraphStore, LoadStats)> {
    let file = std::fs::File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    read_edges(std::io::BufReader::new(file))
        .with_context(|| format!("cannot load edge list {}", path.display()))
}

pub fn read_edges(reader: impl BufRead) -> Result<(GraphStore, LoadStats)> {
    let mut store = GraphStore::new();
    let mut stats = LoadStats::default();

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line.split_whitespace();
        let (Some(source), Some(target), None) = (fields.next(), fields.next(), fields.next()) else {
            bail!("line {}: expected `source target`, got {:?}", number + 1, line);
        };

        store.ensure_account(source)?;
        store.ensure_account(target)?;
        match store.add_follow(source, target) {
            Ok(true) => stats.follows += 1,
            Ok(false) => stats.duplicates += 1,
            Err(AnalyticsError::SelfLoop(account)) => {
                tracing::warn!(line = number + 1, %account, "skipping self-follow");
                stats.self_follows += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok((store, stats))
}
