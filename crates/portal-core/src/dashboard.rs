//! Dashboard figures

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_customers: usize,
    /// One commission per referred customer
    pub total_commissions: usize,
    pub amount_earned: f64,
    pub balance: f64,
    pub amount_withdrawn: f64,
}

impl DashboardSummary {
    pub fn new(customers: usize, earned: f64, balance: f64, withdrawn: f64) -> Self {
        Self {
            total_customers: customers,
            total_commissions: customers,
            amount_earned: earned,
            balance,
            amount_withdrawn: withdrawn,
        }
    }
}
