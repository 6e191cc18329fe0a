//! Reputation aggregation and the composite trader score.

use log::trace;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Rating, ReputationSummary, Transaction, TransactionStatus, UserId},
    traits::{MarketplaceDatabase, MarketplaceError},
};

/// Recomputes a user's reputation summary from their approved ratings and writes it back.
///
/// Runs synchronously after every rating acceptance, never batched, so a read that follows an acceptance always sees
/// the rating reflected. Recomputing with no new ratings is a no-op on the stored values.
pub async fn recompute<B: MarketplaceDatabase>(db: &B, user: &UserId) -> Result<ReputationSummary, MarketplaceError> {
    let ratings = db.fetch_approved_ratings_for(user).await?;
    let count = ratings.len() as i64;
    let avg = if count == 0 { 0.0 } else { ratings.iter().map(|r| r.score as f64).sum::<f64>() / count as f64 };
    trace!("🧮️ Recomputed reputation for {user}: {count} ratings, avg {avg:.3}");
    db.upsert_reputation_summary(user, avg, count).await
}

//--------------------------------------   Composite score   ---------------------------------------------------------

const REPUTATION_WEIGHT: f64 = 0.4;
const TRANSACTION_WEIGHT: f64 = 0.3;
const ACTIVITY_WEIGHT: f64 = 0.2;
const CONSISTENCY_WEIGHT: f64 = 0.1;

/// Below this many completed-or-cancelled trades the overall score is dampened, bottoming out at 70% for a
/// brand-new trader.
const EXPERIENCE_FULL_AT: u32 = 20;
const EXPERIENCE_FLOOR: f64 = 0.7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingStats {
    pub average: f64,
    pub count: u32,
    /// Population variance of the individual scores.
    pub variance: f64,
    /// Normalized activity points, 0-100.
    pub activity_score: f64,
}

impl RatingStats {
    pub fn from_ratings(ratings: &[Rating], activity_score: f64) -> Self {
        let count = ratings.len() as u32;
        if count == 0 {
            return Self { average: 0.0, count: 0, variance: 0.0, activity_score };
        }
        let average = ratings.iter().map(|r| r.score as f64).sum::<f64>() / count as f64;
        let variance = ratings.iter().map(|r| (r.score as f64 - average).powi(2)).sum::<f64>() / count as f64;
        Self { average, count, variance, activity_score }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionStats {
    pub total: u32,
    pub completed: u32,
}

impl TransactionStats {
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let total = transactions.len() as u32;
        let completed =
            transactions.iter().filter(|t| t.status == TransactionStatus::Completed).count() as u32;
        Self { total, completed }
    }

    pub fn completion_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraderTier {
    Copper,
    Bronze,
    Silver,
    Gold,
    Platinum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExperienceLevel {
    Newcomer,
    Regular,
    Veteran,
    Elder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    pub overall: f64,
    pub reputation_component: f64,
    pub transaction_component: f64,
    pub activity_component: f64,
    pub consistency_component: f64,
    pub tier: TraderTier,
    pub experience_level: ExperienceLevel,
}

/// Blends reputation (40%), transaction completion (30%), activity (20%) and rating consistency (10%) into a 0-100
/// score, then scales it by the experience modifier so a handful of five-star trades cannot outrank an established
/// trader. All components are on a 0-100 scale.
pub fn composite_score(user: &RatingStats, transactions: &TransactionStats) -> CompositeScore {
    let reputation_component = (user.average / 5.0).clamp(0.0, 1.0) * 100.0;
    let transaction_component = transactions.completion_rate() * 100.0;
    let activity_component = user.activity_score.clamp(0.0, 100.0);
    // Inverse variance: identical scores give 100, a wildly split record decays towards zero.
    let consistency_component = (100.0 / (1.0 + user.variance)).min(100.0);
    let raw = REPUTATION_WEIGHT * reputation_component
        + TRANSACTION_WEIGHT * transaction_component
        + ACTIVITY_WEIGHT * activity_component
        + CONSISTENCY_WEIGHT * consistency_component;
    let overall = raw * experience_modifier(transactions.total);
    CompositeScore {
        overall,
        reputation_component,
        transaction_component,
        activity_component,
        consistency_component,
        tier: tier_for(overall, user.count, transactions.total),
        experience_level: experience_level_for(transactions.total),
    }
}

fn experience_modifier(total_transactions: u32) -> f64 {
    let progress = (total_transactions.min(EXPERIENCE_FULL_AT) as f64) / EXPERIENCE_FULL_AT as f64;
    EXPERIENCE_FLOOR + (1.0 - EXPERIENCE_FLOOR) * progress
}

/// Tier thresholds gate on volume as well as score, so a perfect two-trade record cannot reach the top tiers.
fn tier_for(overall: f64, rating_count: u32, transaction_count: u32) -> TraderTier {
    if overall >= 90.0 && rating_count >= 10 && transaction_count >= 20 {
        TraderTier::Platinum
    } else if overall >= 75.0 && rating_count >= 5 && transaction_count >= 10 {
        TraderTier::Gold
    } else if overall >= 60.0 && rating_count >= 3 {
        TraderTier::Silver
    } else if overall >= 40.0 {
        TraderTier::Bronze
    } else {
        TraderTier::Copper
    }
}

fn experience_level_for(transaction_count: u32) -> ExperienceLevel {
    match transaction_count {
        0..=4 => ExperienceLevel::Newcomer,
        5..=19 => ExperienceLevel::Regular,
        20..=49 => ExperienceLevel::Veteran,
        _ => ExperienceLevel::Elder,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn stats(average: f64, count: u32, variance: f64, activity: f64) -> RatingStats {
        RatingStats { average, count, variance, activity_score: activity }
    }

    #[test]
    fn established_perfect_trader_gets_the_unscaled_blend() {
        // 20 five-star ratings, 100% completion over 25 trades: the modifier is 1.0 and no dampening applies.
        let user = stats(5.0, 20, 0.0, 100.0);
        let tx = TransactionStats { total: 25, completed: 25 };
        let score = composite_score(&user, &tx);
        let raw = 0.4 * 100.0 + 0.3 * 100.0 + 0.2 * 100.0 + 0.1 * 100.0;
        assert!((score.overall - raw).abs() < f64::EPSILON);
        assert_eq!(score.tier, TraderTier::Platinum);
        assert_eq!(score.experience_level, ExperienceLevel::Veteran);
    }

    #[test]
    fn brand_new_trader_is_floored_at_seventy_percent() {
        let user = stats(5.0, 1, 0.0, 100.0);
        let tx = TransactionStats { total: 0, completed: 0 };
        let score = composite_score(&user, &tx);
        // Completion rate is 0 with no transactions, so the raw blend loses that component entirely.
        let raw = 0.4 * 100.0 + 0.2 * 100.0 + 0.1 * 100.0;
        assert!((score.overall - raw * 0.7).abs() < 1e-9);
        assert_eq!(score.experience_level, ExperienceLevel::Newcomer);
    }

    #[test]
    fn modifier_rises_linearly_to_twenty_transactions() {
        assert!((experience_modifier(0) - 0.7).abs() < f64::EPSILON);
        assert!((experience_modifier(10) - 0.85).abs() < f64::EPSILON);
        assert!((experience_modifier(20) - 1.0).abs() < f64::EPSILON);
        assert!((experience_modifier(200) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn split_scores_hurt_consistency() {
        // Half ones and half fives: variance 4, so consistency collapses to 20.
        let steady = stats(3.0, 10, 0.0, 50.0);
        let split = stats(3.0, 10, 4.0, 50.0);
        let tx = TransactionStats { total: 20, completed: 20 };
        let steady_score = composite_score(&steady, &tx);
        let split_score = composite_score(&split, &tx);
        assert!((steady_score.consistency_component - 100.0).abs() < f64::EPSILON);
        assert!((split_score.consistency_component - 20.0).abs() < f64::EPSILON);
        assert!(split_score.overall < steady_score.overall);
    }

    #[test]
    fn volume_gates_keep_thin_records_out_of_top_tiers() {
        // A perfect but thin record scores high yet stays Silver at best.
        let user = stats(5.0, 3, 0.0, 100.0);
        let tx = TransactionStats { total: 5, completed: 5 };
        let score = composite_score(&user, &tx);
        assert!(score.overall >= 60.0);
        assert_eq!(score.tier, TraderTier::Silver);
    }

    #[test]
    fn rating_stats_from_rows() {
        use chrono::Utc;

        use crate::db_types::{Rating, RatingStatus, UserId};
        let row = |score| Rating {
            id: 0,
            rater: UserId::from("a"),
            rated: UserId::from("b"),
            guild: "g".into(),
            score,
            comment: None,
            status: RatingStatus::Approved,
            admin_id: None,
            created_at: Utc::now(),
        };
        let ratings = vec![row(1), row(5), row(3)];
        let stats = RatingStats::from_ratings(&ratings, 10.0);
        assert_eq!(stats.count, 3);
        assert!((stats.average - 3.0).abs() < f64::EPSILON);
        assert!((stats.variance - 8.0 / 3.0).abs() < 1e-9);
    }
}
