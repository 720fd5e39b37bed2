//! Monthly settlement - Turns a month of ledger rows into a per-member statement.
//!
//! Bazar spending and utility bills of the month are pooled and divided by the
//! month's meal count to give a meal rate. Each member is charged
//! `meal_rate × their meals` and their balance is what they deposited minus that
//! charge: positive means the mess owes the member, negative means the member owes
//! the mess.
//!
//! Utility cost is already inside the meal rate. `utility_share` is reported per
//! member for information only and is not subtracted from the balance.
//!
//! [`compute_report`] is pure. [`generate_report`] gathers the inputs from the store,
//! fetching every member's meal total concurrently, then calls it.

use crate::{
    core::{
        bazar::sum_bazar, meal::sum_meals_for_member, member::get_all_members, period::Period,
        utility::sum_utility_bills,
    },
    entities::member,
    errors::{Error, Result},
};
use futures::future::try_join_all;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// One member's line in the monthly statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberReport {
    /// Member id
    pub member_id: i64,
    /// Member name at the time the report was computed
    pub member_name: String,
    /// Meals eaten in the period
    pub total_meal: f64,
    /// `meal_rate × total_meal`
    pub meal_cost: f64,
    /// The member's running deposit total
    pub deposit: f64,
    /// Informational; already covered by the meal rate
    pub utility_share: f64,
    /// `deposit − meal_cost`
    pub balance: f64,
}

/// Who owes whom after settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standing {
    /// The mess owes the member
    MessOwes,
    /// The member owes the mess
    OwesMess,
    /// Nothing to settle (after rounding to cents)
    Settled,
}

impl MemberReport {
    /// Direction of the balance, judged at display precision.
    #[must_use]
    pub fn standing(&self) -> Standing {
        let cents = (self.balance * 100.0).round();
        if cents > 0.0 {
            Standing::MessOwes
        } else if cents < 0.0 {
            Standing::OwesMess
        } else {
            Standing::Settled
        }
    }
}

/// The whole monthly statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalReport {
    /// Month the report covers
    pub period: Period,
    /// Sum of the month's bazar entries
    pub total_bazar: f64,
    /// Sum of every member's meals
    pub total_meals: f64,
    /// `(total_bazar + total_utility_cost) / total_meals`, or 0
    pub meal_rate: f64,
    /// Sum of the month's utility bills
    pub total_utility_cost: f64,
    /// One line per member, in member input order
    pub member_reports: Vec<MemberReport>,
}

/// Computes the statement from an already gathered snapshot.
///
/// `meals_by_member` maps member id to that member's meal count in `period`; a
/// missing id counts as 0. Never divides by zero: no members or no meals yield a
/// zero meal rate. Inputs are not clamped, so NaN or negative amounts from the
/// store show up in the output.
#[must_use]
pub fn compute_report(
    period: Period,
    members: &[member::Model],
    total_bazar: f64,
    total_utility_cost: f64,
    meals_by_member: &HashMap<i64, f64>,
) -> FinalReport {
    if members.is_empty() {
        return FinalReport {
            period,
            total_bazar,
            total_meals: 0.0,
            meal_rate: 0.0,
            total_utility_cost,
            member_reports: Vec::new(),
        };
    }

    let member_meals: Vec<(&member::Model, f64)> = members
        .iter()
        .map(|m| (m, meals_by_member.get(&m.id).copied().unwrap_or(0.0)))
        .collect();

    let total_meals: f64 = member_meals.iter().map(|(_, meals)| meals).sum();
    let meal_rate = if total_meals > 0.0 {
        (total_bazar + total_utility_cost) / total_meals
    } else {
        0.0
    };

    // Member counts are tiny; the cast is exact.
    #[allow(clippy::cast_precision_loss)]
    let utility_share = total_utility_cost / members.len() as f64;

    let member_reports = member_meals
        .into_iter()
        .map(|(member, total_meal)| {
            let meal_cost = meal_rate * total_meal;
            MemberReport {
                member_id: member.id,
                member_name: member.name.clone(),
                total_meal,
                meal_cost,
                deposit: member.given_amount,
                utility_share,
                balance: member.given_amount - meal_cost,
            }
        })
        .collect();

    FinalReport {
        period,
        total_bazar,
        total_meals,
        meal_rate,
        total_utility_cost,
        member_reports,
    }
}

/// Reads the month's ledger and computes its statement.
///
/// Member meal totals are fetched concurrently and joined before the rate is
/// computed. Absent aggregates count as 0.
///
/// # Errors
/// Returns `Error::Database` if any read fails; the computation itself cannot fail.
#[instrument(skip(db))]
pub async fn generate_report(db: &DatabaseConnection, period: Period) -> Result<FinalReport> {
    let total_utility_cost = sum_utility_bills(db, period).await?;
    let total_bazar = sum_bazar(db, period).await?;
    let members = get_all_members(db).await?;

    let meal_totals = try_join_all(members.iter().map(|member| async move {
        let meals = sum_meals_for_member(db, member.id, period).await?;
        Ok::<_, Error>((member.id, meals))
    }))
    .await?;
    let meals_by_member: HashMap<i64, f64> = meal_totals.into_iter().collect();
    debug!("Collected meal totals for {} members", meals_by_member.len());

    let report = compute_report(
        period,
        &members,
        total_bazar,
        total_utility_cost,
        &meals_by_member,
    );

    info!(
        "Computed {} report: bazar {:.2}, utilities {:.2}, meals {}, rate {:.2}",
        period, report.total_bazar, report.total_utility_cost, report.total_meals, report.meal_rate
    );
    Ok(report)
}

/// Formats an amount for display, rounded to 2 decimal places.
#[must_use]
pub fn format_amount(amount: f64) -> String {
    format!("{amount:.2}")
}

/// Formats a report into a plain-text statement.
#[must_use]
pub fn format_report_summary(report: &FinalReport) -> String {
    use std::fmt::Write;

    let mut summary = format!(
        "Mess Summary - {}\n",
        report.period.first_day().format("%B %Y")
    );

    // write! is infallible when writing to String
    let _ = writeln!(
        summary,
        "  Bazar: {} | Utilities: {} | Meals: {} | Meal rate: {}\n",
        format_amount(report.total_bazar),
        format_amount(report.total_utility_cost),
        format_amount(report.total_meals),
        format_amount(report.meal_rate)
    );

    if report.member_reports.is_empty() {
        summary.push_str("  No members.\n");
        return summary;
    }

    for line in &report.member_reports {
        let standing = match line.standing() {
            Standing::MessOwes => "mess owes member",
            Standing::OwesMess => "owes mess",
            Standing::Settled => "settled",
        };
        let _ = writeln!(
            summary,
            "  {} - meals {} | cost {} | deposit {} | utility share {} | balance {} ({})",
            line.member_name,
            format_amount(line.total_meal),
            format_amount(line.meal_cost),
            format_amount(line.deposit),
            format_amount(line.utility_share),
            format_amount(line.balance),
            standing
        );
    }

    summary
}
