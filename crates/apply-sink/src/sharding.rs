//! Sharding column names of the target topology.

use std::collections::{HashMap, HashSet};

/// Sharding columns per logical table.
///
/// Columns registered without a table apply to every table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardingColumns {
    global: HashSet<String>,
    per_table: HashMap<String, HashSet<String>>,
}

impl ShardingColumns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `table.column` or `column` entries.
    ///
    /// ```rust
    /// use apply_sink::ShardingColumns;
    ///
    /// let sharding = ShardingColumns::parse(["t_order.user_id", "region"]).unwrap();
    /// assert!(sharding.for_table("t_order").contains("user_id"));
    /// assert!(sharding.for_table("t_order").contains("region"));
    /// assert!(!sharding.for_table("t_user").contains("user_id"));
    /// ```
    pub fn parse<I, S>(specs: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut sharding = Self::new();
        for spec in specs {
            let spec = spec.as_ref().trim();
            match spec.split_once('.') {
                Some((table, column)) if !table.is_empty() && !column.is_empty() => {
                    sharding.add_table_column(table, column);
                }
                None if !spec.is_empty() => sharding.add_column(spec),
                _ => anyhow::bail!(
                    "Invalid sharding column '{spec}'. Expected 'table.column' or 'column'"
                ),
            }
        }
        Ok(sharding)
    }

    /// Register a sharding column for every table.
    pub fn add_column(&mut self, column: impl Into<String>) {
        let column = column.into();
        for columns in self.per_table.values_mut() {
            columns.insert(column.clone());
        }
        self.global.insert(column);
    }

    /// Register a sharding column for one table.
    pub fn add_table_column(&mut self, table: impl Into<String>, column: impl Into<String>) {
        let global = &self.global;
        self.per_table
            .entry(table.into())
            .or_insert_with(|| global.clone())
            .insert(column.into());
    }

    /// Sharding column names that apply to `table`.
    pub fn for_table(&self, table: &str) -> &HashSet<String> {
        self.per_table.get(table).unwrap_or(&self.global)
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty() && self.per_table.is_empty()
    }
}
