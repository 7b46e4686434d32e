//! Admin back-office: audit log, dashboard, suspension, export.
//!
//! Every privileged operation records exactly one audit entry, including
//! failed authorization attempts at the admin login boundary.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::{Value, json};

use super::admin::{AdminLogEntry, AdminUserView, DashboardCounts};
use super::error::{ApiResult, Error};
use super::ports::{AdminLogStore, DecisionStore, UserStore};
use super::user::Suspension;

/// Default page size for audit log listings.
pub const DEFAULT_LOG_LIMIT: usize = 50;

pub struct AdminService {
    users: Arc<dyn UserStore>,
    decisions: Arc<dyn DecisionStore>,
    logs: Arc<dyn AdminLogStore>,
}

impl AdminService {
    pub fn new(
        users: Arc<dyn UserStore>,
        decisions: Arc<dyn DecisionStore>,
        logs: Arc<dyn AdminLogStore>,
    ) -> Self {
        Self {
            users,
            decisions,
            logs,
        }
    }

    /// Append one audit entry. Append-only: there is no update or delete.
    pub async fn record(
        &self,
        actor: &str,
        action: &str,
        target_user_id: Option<String>,
        details: Value,
        origin: Option<String>,
    ) -> ApiResult<()> {
        self.logs
            .append(AdminLogEntry::new(actor, action, target_user_id, details, origin))
            .await?;
        Ok(())
    }

    /// Headline counters for the dashboard.
    pub async fn dashboard(&self) -> ApiResult<DashboardCounts> {
        Ok(DashboardCounts {
            total_users: self.users.count_users().await?,
            total_decisions: self.decisions.count_decisions().await?,
            suspended_users: self.users.count_suspended(Utc::now()).await?,
        })
    }

    /// All users, credential material excluded.
    pub async fn list_users(&self) -> ApiResult<Vec<AdminUserView>> {
        let users = self.users.list_users().await?;
        Ok(users.iter().map(AdminUserView::from).collect())
    }

    /// One user, credential material excluded.
    pub async fn user_detail(&self, id: &str) -> ApiResult<AdminUserView> {
        match self.users.user_by_id(id).await? {
            Some(user) => Ok(AdminUserView::from(&user)),
            None => Err(Error::not_found("User not found")),
        }
    }

    /// Suspend a user, permanently or for `duration_days`.
    pub async fn suspend(
        &self,
        id: &str,
        reason: &str,
        duration_days: Option<i64>,
    ) -> ApiResult<Suspension> {
        let suspension = match duration_days {
            Some(days) => Suspension::bounded(reason, Utc::now() + Duration::days(days)),
            None => Suspension::permanent(reason),
        };
        if !self.users.set_suspension(id, suspension.clone()).await? {
            return Err(Error::not_found("User not found"));
        }
        Ok(suspension)
    }

    /// Lift a user's suspension.
    pub async fn unsuspend(&self, id: &str) -> ApiResult<()> {
        if !self.users.set_suspension(id, Suspension::default()).await? {
            return Err(Error::not_found("User not found"));
        }
        Ok(())
    }

    /// Audit log entries, most recent first.
    pub async fn logs(&self, skip: usize, limit: usize) -> ApiResult<Vec<AdminLogEntry>> {
        Ok(self.logs.list(skip, limit).await?)
    }

    /// Full user export as a JSON document, password hashes excluded.
    pub async fn export_users(&self) -> ApiResult<Value> {
        let users = self.list_users().await?;
        Ok(json!({
            "exported_at": Utc::now(),
            "count": users.len(),
            "users": users,
        }))
    }
}
