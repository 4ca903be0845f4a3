//! System alerts shown on the dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AlertId, AlertSeverity, UserId};

/// A notice from the platform (`system_alerts` table).
///
/// Alerts with no `user_id` are broadcast to every seller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemAlert {
    pub id: AlertId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub is_resolved: bool,
    pub created_at: DateTime<Utc>,
}

impl SystemAlert {
    /// Whether this alert targets every seller.
    #[must_use]
    pub const fn is_global(&self) -> bool {
        self.user_id.is_none()
    }

    /// Whether `user` may see this alert.
    #[must_use]
    pub fn visible_to(&self, user: UserId) -> bool {
        self.user_id.is_none_or(|owner| owner == user)
    }

    /// Whether `user` may dismiss this alert. Global alerts share one
    /// resolved flag, so only operators resolve them.
    #[must_use]
    pub fn dismissible_by(&self, user: UserId) -> bool {
        self.user_id == Some(user)
    }

    /// Keep unresolved alerts visible to `user`, most severe then newest first.
    #[must_use]
    pub fn active_for(alerts: Vec<Self>, user: UserId) -> Vec<Self> {
        let mut active: Vec<Self> = alerts
            .into_iter()
            .filter(|a| !a.is_resolved && a.visible_to(user))
            .collect();
        active.sort_by(|a, b| {
            a.severity
                .rank()
                .cmp(&b.severity.rank())
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo;
    use crate::types::fixed_uuid;

    #[test]
    fn test_active_for_filters_and_orders() {
        let user = demo::user_id();
        let other = UserId::new(fixed_uuid(0xdead));

        let mut alerts = demo::alerts();
        let mut foreign = alerts[0].clone();
        foreign.user_id = Some(other);
        foreign.severity = AlertSeverity::Critical;
        alerts.push(foreign);

        let active = SystemAlert::active_for(alerts, user);
        assert!(active.iter().all(|a| !a.is_resolved && a.visible_to(user)));
        let ranks: Vec<u8> = active.iter().map(|a| a.severity.rank()).collect();
        let mut sorted = ranks.clone();
        sorted.sort_unstable();
        assert_eq!(ranks, sorted);
    }

    #[test]
    fn test_global_alerts_visible_to_everyone() {
        let alert = demo::alerts()
            .into_iter()
            .find(SystemAlert::is_global)
            .expect("demo data has a global alert");
        assert!(alert.visible_to(UserId::new(fixed_uuid(42))));
        assert!(!alert.dismissible_by(UserId::new(fixed_uuid(42))));
    }

    #[test]
    fn test_only_the_owner_dismisses_a_targeted_alert() {
        let owner = UserId::new(fixed_uuid(7));
        let mut alert = demo::alerts()
            .into_iter()
            .find(SystemAlert::is_global)
            .expect("demo data has a global alert");
        alert.user_id = Some(owner);
        assert!(alert.dismissible_by(owner));
        assert!(!alert.dismissible_by(UserId::new(fixed_uuid(8))));
        assert!(!alert.visible_to(UserId::new(fixed_uuid(8))));
    }
}
