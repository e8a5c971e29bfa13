use {
    super::money::MoneyAmount,
    serde::{Deserialize, Serialize},
    std::fmt,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    None,
    Active,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Active => "active",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregate numbers behind the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriberStats {
    pub total_accounts: i64,
    pub active: i64,
    pub cancelled: i64,
    pub without_subscription: i64,
    pub paid_orders: i64,
    pub refused_orders: i64,
    pub refunded_orders: i64,
    pub chargeback_orders: i64,
    pub gross_revenue: MoneyAmount,
}

impl SubscriberStats {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "accounts": {
                "total": self.total_accounts,
                "active": self.active,
                "cancelled": self.cancelled,
                "none": self.without_subscription,
            },
            "orders": {
                "paid": self.paid_orders,
                "refused": self.refused_orders,
                "refunded": self.refunded_orders,
                "chargeback": self.chargeback_orders,
            },
            "gross_revenue": self.gross_revenue.to_string(),
        })
    }
}
