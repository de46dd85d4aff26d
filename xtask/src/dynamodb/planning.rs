//! Pure functions for calculating deployment plans (Functional Core).

use super::config::TableConfig;

/// Represents the current state of a table.
#[derive(Debug, Clone)]
pub struct TableState {
    pub status: TableStatus,
    pub ttl: TtlState,
}

/// Table status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStatus {
    Active,
    Creating,
    Updating,
    Deleting,
}

/// Time-to-live setting of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TtlState {
    Disabled,
    /// Enabled or being enabled on the given attribute.
    Enabled { attribute: String },
}

/// Planned changes for deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployPlan {
    /// Table doesn't exist, needs to be created.
    CreateTable { config: TableConfig },
    /// Table exists, time-to-live needs to be turned on.
    EnableTtl {
        table_name: String,
        attribute: String,
    },
    /// Table is up to date, no changes needed.
    NoChanges { table_name: String },
}

/// Plan for destroying a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestroyPlan {
    /// Table exists and will be deleted.
    DeleteTable { table_name: String },
    /// Table doesn't exist, nothing to do.
    AlreadyGone { table_name: String },
}

/// Pure function: Calculate what changes are needed to reach desired state.
///
/// TTL that is already enabled on a different attribute is left alone, since
/// DynamoDB only allows one TTL attribute and changing it needs a disable first.
pub fn calculate_deploy_plan(current: Option<&TableState>, desired: &TableConfig) -> DeployPlan {
    let no_changes = || DeployPlan::NoChanges {
        table_name: desired.table_name.clone(),
    };

    match (current, &desired.ttl_attribute) {
        (None, _) => DeployPlan::CreateTable {
            config: desired.clone(),
        },
        (Some(state), Some(attribute)) if state.ttl == TtlState::Disabled => {
            DeployPlan::EnableTtl {
                table_name: desired.table_name.clone(),
                attribute: attribute.clone(),
            }
        }
        (Some(_), _) => no_changes(),
    }
}

/// Pure function: Calculate destroy plan.
pub fn calculate_destroy_plan(current: Option<&TableState>, table_name: &str) -> DestroyPlan {
    match current {
        Some(_) => DestroyPlan::DeleteTable {
            table_name: table_name.to_string(),
        },
        None => DestroyPlan::AlreadyGone {
            table_name: table_name.to_string(),
        },
    }
}

/// Pure function: Format a deploy plan for display.
pub fn format_deploy_plan(plan: &DeployPlan) -> Vec<String> {
    match plan {
        DeployPlan::CreateTable { config } => {
            let mut lines = vec![
                format!("+ Create table: {}", config.table_name),
                format!("  Partition key: {} (S)", config.partition_key.name),
            ];
            if let Some(sk) = &config.sort_key {
                lines.push(format!("  Sort key: {} (S)", sk.name));
            }
            if let Some(ttl) = &config.ttl_attribute {
                lines.push(format!("  + TTL attribute: {}", ttl));
            }
            lines.push("  Billing: PAY_PER_REQUEST".to_string());
            lines
        }
        DeployPlan::EnableTtl {
            table_name,
            attribute,
        } => {
            vec![
                format!("~ Update table: {}", table_name),
                format!("  + Enable TTL on: {}", attribute),
            ]
        }
        DeployPlan::NoChanges { table_name } => {
            vec![format!("= Table '{}' is up to date", table_name)]
        }
    }
}

/// Pure function: Format a destroy plan for display.
pub fn format_destroy_plan(plan: &DestroyPlan) -> Vec<String> {
    match plan {
        DestroyPlan::DeleteTable { table_name } => {
            vec![format!(
                "- Delete table: {} (ALL DATA WILL BE LOST)",
                table_name
            )]
        }
        DestroyPlan::AlreadyGone { table_name } => {
            vec![format!("= Table '{}' does not exist", table_name)]
        }
    }
}
