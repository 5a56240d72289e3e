//! Report generation business logic.
//!
//! All figures are recomputed from the ledger rows on every call. The projection
//! functions ([`summarize`], [`time_series`], [`category_breakdown`]) are pure and take
//! already-loaded rows; [`workspace_report`] and [`dashboard`] load the rows for the
//! caller's workspace and hand them over.

use crate::{
    core::tenancy::{self, AuthContext},
    entities::{Debt, DebtStatus, Expense, Invoice, InvoiceStatus, debt, expense, invoice},
    errors::Result,
};
use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use sea_orm::prelude::*;
use std::collections::BTreeMap;

/// Label used for expenses without a category.
pub const UNCATEGORIZED: &str = "Autre";

/// Reporting window ending now.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReportRange {
    /// Last month, bucketed by day
    Month,
    /// Last three months
    Quarter,
    /// Last six months
    HalfYear,
    /// Last twelve months
    Year,
}

/// Granularity of a time series.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Bucket {
    /// `YYYY-MM-DD`
    Day,
    /// `YYYY-MM`
    Month,
}

impl ReportRange {
    /// Length of the window in months.
    #[must_use]
    pub const fn months(self) -> u32 {
        match self {
            Self::Month => 1,
            Self::Quarter => 3,
            Self::HalfYear => 6,
            Self::Year => 12,
        }
    }

    /// Bucket size used for the series of this range.
    #[must_use]
    pub const fn bucket(self) -> Bucket {
        match self {
            Self::Month => Bucket::Day,
            _ => Bucket::Month,
        }
    }

    /// First instant of the window ending at `now`.
    #[must_use]
    pub fn start(self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_months(Months::new(self.months()))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl Bucket {
    /// Bucket key of a timestamp.
    #[must_use]
    pub fn key(self, at: DateTime<Utc>) -> String {
        match self {
            Self::Day => at.format("%Y-%m-%d").to_string(),
            Self::Month => at.format("%Y-%m").to_string(),
        }
    }

    /// Every bucket key from `start` to `end` inclusive, in order.
    #[must_use]
    pub fn keys_between(self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<String> {
        let mut keys = Vec::new();
        let last = end.date_naive();
        let mut day = match self {
            Self::Day => start.date_naive(),
            Self::Month => NaiveDate::from_ymd_opt(start.year(), start.month(), 1)
                .unwrap_or_else(|| start.date_naive()),
        };
        while day <= last {
            keys.push(match self {
                Self::Day => day.format("%Y-%m-%d").to_string(),
                Self::Month => day.format("%Y-%m").to_string(),
            });
            let next = match self {
                Self::Day => day.succ_opt(),
                Self::Month => day.checked_add_months(Months::new(1)),
            };
            match next {
                Some(next) => day = next,
                None => break,
            }
        }
        keys
    }
}

/// Headline figures.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    /// Sum of paid invoice totals
    pub total_revenue: f64,
    /// Sum of unpaid invoice totals
    pub pending_amount: f64,
    /// Number of unpaid invoices
    pub pending_count: u64,
    /// Sum of all expenses
    pub total_expenses: f64,
    /// Revenue minus expenses
    pub net_profit: f64,
    /// Net profit as a percentage of revenue, 0 without revenue
    pub margin_percent: f64,
}

/// Revenue and expenses of one bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    /// Bucket key
    pub bucket: String,
    /// Paid invoice revenue created in this bucket
    pub revenue: f64,
    /// Expenses dated in this bucket
    pub expenses: f64,
    /// `revenue - expenses` for this bucket alone
    pub profit: f64,
}

/// Expense total of one category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    /// Category label
    pub category: String,
    /// Summed amount
    pub amount: f64,
}

/// Windowed report of a workspace.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceReport {
    /// Window the figures cover
    pub range: ReportRange,
    /// Headline figures over the window
    pub summary: Summary,
    /// Per-bucket figures
    pub series: Vec<SeriesPoint>,
    /// Expenses by category, largest first
    pub categories: Vec<CategoryTotal>,
}

/// All-time overview of a workspace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dashboard {
    /// Headline figures over the whole ledger
    pub summary: Summary,
    /// Remaining amount over active debts
    pub active_debt_total: f64,
    /// Number of active debts
    pub active_debt_count: u64,
}

/// Computes the headline figures.
#[must_use]
pub fn summarize(invoices: &[invoice::Model], expenses: &[expense::Model]) -> Summary {
    let mut summary = Summary::default();
    for inv in invoices {
        if inv.status == InvoiceStatus::Paid {
            summary.total_revenue += inv.total_amount;
        } else {
            summary.pending_amount += inv.total_amount;
            summary.pending_count += 1;
        }
    }
    summary.total_expenses = expenses.iter().map(|e| e.amount).sum();
    summary.net_profit = summary.total_revenue - summary.total_expenses;
    summary.margin_percent = if summary.total_revenue == 0.0 {
        0.0
    } else {
        summary.net_profit / summary.total_revenue * 100.0
    };
    summary
}

/// Buckets paid revenue and expenses between `start` and `end`.
///
/// Every bucket of the window is present, empty ones with zeros.
#[must_use]
pub fn time_series(
    invoices: &[invoice::Model],
    expenses: &[expense::Model],
    bucket: Bucket,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<SeriesPoint> {
    let mut buckets: BTreeMap<String, (f64, f64)> = bucket
        .keys_between(start, end)
        .into_iter()
        .map(|k| (k, (0.0, 0.0)))
        .collect();
    for inv in invoices.iter().filter(|i| i.status == InvoiceStatus::Paid) {
        buckets.entry(bucket.key(inv.created_at)).or_default().0 += inv.total_amount;
    }
    for exp in expenses {
        buckets.entry(bucket.key(exp.date)).or_default().1 += exp.amount;
    }
    buckets
        .into_iter()
        .map(|(bucket, (revenue, expenses))| SeriesPoint {
            bucket,
            revenue,
            expenses,
            profit: revenue - expenses,
        })
        .collect()
}

/// Sums expenses per category, largest first.
#[must_use]
pub fn category_breakdown(expenses: &[expense::Model]) -> Vec<CategoryTotal> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for exp in expenses {
        let label = exp
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(UNCATEGORIZED);
        *totals.entry(label).or_default() += exp.amount;
    }
    let mut categories: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category, amount)| CategoryTotal {
            category: category.to_string(),
            amount,
        })
        .collect();
    categories.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    categories
}

async fn load_ledger<C>(
    db: &C,
    workspace_id: i64,
    since: Option<DateTime<Utc>>,
) -> Result<(Vec<invoice::Model>, Vec<expense::Model>)>
where
    C: ConnectionTrait,
{
    let mut invoices = Invoice::find().filter(invoice::Column::WorkspaceId.eq(workspace_id));
    let mut expenses = Expense::find().filter(expense::Column::WorkspaceId.eq(workspace_id));
    if let Some(since) = since {
        invoices = invoices.filter(invoice::Column::CreatedAt.gte(since));
        expenses = expenses.filter(expense::Column::Date.gte(since));
    }
    Ok((invoices.all(db).await?, expenses.all(db).await?))
}

/// Report of the caller's workspace over `range`, ending now.
///
/// A caller without a workspace gets an all-zero report.
pub async fn workspace_report(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    range: ReportRange,
) -> Result<WorkspaceReport> {
    let now = Utc::now();
    let start = range.start(now);
    let (invoices, expenses) = match tenancy::workspace_id_for_reads(db, ctx).await? {
        Some(workspace_id) => load_ledger(db, workspace_id, Some(start)).await?,
        None => (Vec::new(), Vec::new()),
    };
    Ok(WorkspaceReport {
        range,
        summary: summarize(&invoices, &expenses),
        series: time_series(&invoices, &expenses, range.bucket(), start, now),
        categories: category_breakdown(&expenses),
    })
}

/// All-time dashboard of the caller's workspace.
pub async fn dashboard(db: &DatabaseConnection, ctx: &AuthContext) -> Result<Dashboard> {
    let Some(workspace_id) = tenancy::workspace_id_for_reads(db, ctx).await? else {
        return Ok(Dashboard::default());
    };
    let (invoices, expenses) = load_ledger(db, workspace_id, None).await?;
    let active_debts = Debt::find()
        .filter(debt::Column::WorkspaceId.eq(workspace_id))
        .filter(debt::Column::Status.eq(DebtStatus::Active))
        .all(db)
        .await?;
    Ok(Dashboard {
        summary: summarize(&invoices, &expenses),
        active_debt_total: active_debts.iter().map(|d| d.remaining_amount).sum(),
        active_debt_count: active_debts.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::config::AppConfig;
    use crate::core::debt::{self, NewDebt};
    use crate::core::expense::{NewExpense, add_expense};
    use crate::entities::Role;
    use crate::test_utils::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn invoice_row(status: InvoiceStatus, total: f64, created_at: DateTime<Utc>) -> invoice::Model {
        invoice::Model {
            id: 0,
            workspace_id: 1,
            client_id: 1,
            invoice_number: String::new(),
            status,
            due_date: created_at.date_naive(),
            subtotal: total,
            tax_rate: 0.0,
            tax_amount: 0.0,
            total_amount: total,
            created_at,
        }
    }

    fn expense_row(amount: f64, category: Option<&str>, date: DateTime<Utc>) -> expense::Model {
        expense::Model {
            id: 0,
            workspace_id: 1,
            amount,
            description: String::new(),
            category: category.map(str::to_string),
            receipt_url: None,
            date,
        }
    }

    #[test]
    fn test_summary_splits_paid_and_pending() {
        let day = at(2026, 3, 1);
        let invoices = vec![
            invoice_row(InvoiceStatus::Paid, 100.0, day),
            invoice_row(InvoiceStatus::Paid, 200.0, day),
            invoice_row(InvoiceStatus::Pending, 50.0, day),
        ];

        let summary = summarize(&invoices, &[]);

        assert_eq!(summary.total_revenue, 300.0);
        assert_eq!(summary.pending_amount, 50.0);
        assert_eq!(summary.pending_count, 1);
    }

    #[test]
    fn test_draft_counts_as_pending_and_margin() {
        let day = at(2026, 3, 1);
        let invoices = vec![
            invoice_row(InvoiceStatus::Paid, 400.0, day),
            invoice_row(InvoiceStatus::Draft, 80.0, day),
        ];
        let expenses = vec![expense_row(100.0, None, day)];

        let summary = summarize(&invoices, &expenses);

        assert_eq!(summary.pending_count, 1);
        assert_eq!(summary.net_profit, 300.0);
        assert_eq!(summary.margin_percent, 75.0);
        assert_eq!(summarize(&[], &expenses).margin_percent, 0.0);
    }

    #[test]
    fn test_monthly_series_profit_is_per_bucket() {
        let invoices = vec![
            invoice_row(InvoiceStatus::Paid, 500.0, at(2026, 1, 10)),
            invoice_row(InvoiceStatus::Pending, 999.0, at(2026, 1, 11)),
            invoice_row(InvoiceStatus::Paid, 100.0, at(2026, 3, 2)),
        ];
        let expenses = vec![expense_row(200.0, None, at(2026, 1, 20))];

        let series = time_series(&invoices, &expenses, Bucket::Month, at(2026, 1, 1), at(2026, 3, 31));

        let keys: Vec<&str> = series.iter().map(|p| p.bucket.as_str()).collect();
        assert_eq!(keys, vec!["2026-01", "2026-02", "2026-03"]);
        assert_eq!(series[0].revenue, 500.0);
        assert_eq!(series[0].profit, 300.0);
        assert_eq!(series[1].profit, 0.0);
        assert_eq!(series[2].profit, 100.0);
    }

    #[test]
    fn test_daily_buckets_cover_window() {
        let keys = Bucket::Day.keys_between(at(2026, 2, 27), at(2026, 3, 2));
        assert_eq!(keys, vec!["2026-02-27", "2026-02-28", "2026-03-01", "2026-03-02"]);
        assert_eq!(ReportRange::Month.bucket(), Bucket::Day);
        assert_eq!(ReportRange::Year.start(at(2026, 5, 5)), at(2025, 5, 5));
    }

    #[test]
    fn test_category_breakdown_collapses_missing() {
        let day = at(2026, 3, 1);
        let expenses = vec![
            expense_row(10.0, None, day),
            expense_row(5.0, Some("  "), day),
            expense_row(500.0, Some("Dette"), day),
        ];

        let categories = category_breakdown(&expenses);

        assert_eq!(categories[0].category, "Dette");
        assert_eq!(categories[1].category, UNCATEGORIZED);
        assert_eq!(categories[1].amount, 15.0);
    }

    #[tokio::test]
    async fn test_dashboard_reflects_debt_payments() -> Result<()> {
        let db = setup_test_db().await?;
        let (admin, workspace) = admin_with_workspace(&db, "admin").await?;
        let config = AppConfig::default();
        let client = create_test_client(&db, workspace.id, "Acme").await?;
        let paid = create_test_invoice(&db, &admin, client.id, &[(1.0, 1_000.0)]).await?;
        crate::core::invoice::mark_invoice_as_paid(&db, &admin, paid.invoice.id).await?;
        add_expense(
            &db,
            &admin,
            &config,
            NewExpense {
                amount: 100.0,
                description: "Fuel".to_string(),
                category: None,
                receipt: None,
            },
            &MemoryBlobStore::default(),
        )
        .await?;
        let loan = debt::create_debt(
            &db,
            &admin,
            &config,
            NewDebt {
                creditor_name: "Acme Bank".to_string(),
                total_amount: 900.0,
                monthly_payment: 300.0,
                due_date: NaiveDate::from_ymd_opt(2027, 1, 1).unwrap(),
            },
        )
        .await?;
        debt::pay_debt_installment(&db, &admin, loan.id, 300.0).await?;

        let dash = dashboard(&db, &admin).await?;
        assert_eq!(dash.summary.total_revenue, 1_000.0);
        assert_eq!(dash.summary.total_expenses, 400.0);
        assert_eq!(dash.summary.net_profit, 600.0);
        assert_eq!(dash.active_debt_total, 600.0);
        assert_eq!(dash.active_debt_count, 1);

        let report = workspace_report(&db, &admin, ReportRange::Month).await?;
        assert_eq!(report.summary, dash.summary);
        assert_eq!(report.categories.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_report_without_workspace_is_empty() -> Result<()> {
        let db = setup_test_db().await?;
        let viewer = context_with_role(&db, "viewer", Role::Viewer).await?;

        let report = workspace_report(&db, &viewer, ReportRange::Quarter).await?;
        assert_eq!(report.summary, Summary::default());
        assert!(report.series.iter().all(|p| p.revenue == 0.0 && p.expenses == 0.0));
        assert_eq!(dashboard(&db, &viewer).await?, Dashboard::default());
        Ok(())
    }

    #[tokio::test]
    async fn test_pending_member_cannot_read_reports() -> Result<()> {
        let db = setup_test_db().await?;
        let pending = context_with_role(&db, "new", Role::Pending).await?;
        assert!(dashboard(&db, &pending).await.is_err());
        Ok(())
    }
}
