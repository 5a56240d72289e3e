//! Debt business logic - creditor debts and installment payments.
//!
//! A payment decrements the debt with a single atomic update and records the same
//! amount as an expense in the reserved `Dette` category, both in one transaction.
//! Either both rows change or neither does.

use crate::{
    config::AppConfig,
    core::{
        expense, non_negative_amount,
        policy::Operation,
        positive_amount,
        tenancy::{self, AuthContext},
    },
    entities::{DEBT_CATEGORY, Debt, DebtStatus, debt, expense as expense_entity},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{info, instrument};

/// Input for [`create_debt`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewDebt {
    /// Who the money is owed to
    pub creditor_name: String,
    /// Amount borrowed (> 0)
    pub total_amount: f64,
    /// Planned monthly installment (>= 0)
    pub monthly_payment: f64,
    /// Final due date
    pub due_date: NaiveDate,
}

/// Both rows written by an installment payment.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallmentReceipt {
    /// The debt after the payment
    pub debt: debt::Model,
    /// The matching `Dette` expense
    pub expense: expense_entity::Model,
}

/// Records a new debt with its full amount outstanding.
pub async fn create_debt(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    config: &AppConfig,
    input: NewDebt,
) -> Result<debt::Model> {
    ctx.require_direct(Operation::ManageDebt)?;
    let creditor_name = input.creditor_name.trim().to_string();
    if creditor_name.is_empty() {
        return Err(Error::validation("creditor_name", "creditor name cannot be empty"));
    }
    let total_amount = positive_amount("total_amount", input.total_amount)?;
    let monthly_payment = non_negative_amount("monthly_payment", input.monthly_payment)?;

    let txn = db.begin().await?;
    let workspace = tenancy::ensure_workspace(&txn, ctx.user_id(), &config.workspace).await?;
    let model = debt::ActiveModel {
        workspace_id: Set(workspace.id),
        creditor_name: Set(creditor_name),
        total_amount: Set(total_amount),
        remaining_amount: Set(total_amount),
        monthly_payment: Set(monthly_payment),
        due_date: Set(input.due_date),
        status: Set(DebtStatus::Active),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let created = model.insert(&txn).await?;
    txn.commit().await?;

    info!(workspace_id = workspace.id, debt_id = created.id, total_amount, "Debt created");
    Ok(created)
}

/// Pays `amount` towards a debt of the caller's workspace.
///
/// The remaining amount is decremented in the datastore rather than recomputed here,
/// so concurrent payments cannot lose updates. Overpayment is accepted and leaves a
/// negative remaining amount with status `Paid`.
///
/// # Errors
/// `NotFound` when the debt is not in the caller's workspace; nothing is written.
#[instrument(skip(db, ctx), fields(user_id = %ctx.user_id()))]
pub async fn pay_debt_installment(
    db: &DatabaseConnection,
    ctx: &AuthContext,
    debt_id: i64,
    amount: f64,
) -> Result<InstallmentReceipt> {
    ctx.require_direct(Operation::ManageDebt)?;
    let amount = positive_amount("amount", amount)?;

    let workspace = tenancy::require_workspace(db, ctx).await?;
    // The decrement must open the transaction so SQLite queues concurrent payers
    // instead of failing them on lock upgrade.
    let txn = db.begin().await?;
    let scoped = || {
        debt::Column::Id
            .eq(debt_id)
            .and(debt::Column::WorkspaceId.eq(workspace.id))
    };

    let decremented = Debt::update_many()
        .col_expr(
            debt::Column::RemainingAmount,
            Expr::col(debt::Column::RemainingAmount).sub(amount),
        )
        .filter(scoped())
        .exec(&txn)
        .await?;
    if decremented.rows_affected == 0 {
        return Err(Error::not_found("debt", debt_id));
    }

    let current = Debt::find()
        .filter(scoped())
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("debt", debt_id))?;
    let status = DebtStatus::for_remaining(current.remaining_amount);
    let creditor = current.creditor_name.clone();
    let updated = if status == current.status {
        current
    } else {
        let mut active: debt::ActiveModel = current.into();
        active.status = Set(status);
        active.update(&txn).await?
    };

    let expense = expense::insert_expense(
        &txn,
        workspace.id,
        amount,
        format!("Remboursement: {creditor}"),
        Some(DEBT_CATEGORY.to_string()),
        None,
    )
    .await?;
    txn.commit().await?;

    info!(
        workspace_id = workspace.id,
        debt_id,
        amount,
        remaining = updated.remaining_amount,
        ?status,
        "Debt installment paid"
    );
    Ok(InstallmentReceipt {
        debt: updated,
        expense,
    })
}

/// Lists the debts of the caller's workspace, active first, then by due date.
pub async fn list_debts(db: &DatabaseConnection, ctx: &AuthContext) -> Result<Vec<debt::Model>> {
    let Some(workspace_id) = tenancy::workspace_id_for_reads(db, ctx).await? else {
        return Ok(Vec::new());
    };
    let mut debts = Debt::find()
        .filter(debt::Column::WorkspaceId.eq(workspace_id))
        .order_by_asc(debt::Column::DueDate)
        .order_by_asc(debt::Column::Id)
        .all(db)
        .await?;
    // Stable sort keeps the due-date order inside each status group.
    debts.sort_by_key(|d| d.status != DebtStatus::Active);
    Ok(debts)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::entities::{Expense, Role};
    use crate::test_utils::*;

    fn bank_loan(total: f64) -> NewDebt {
        NewDebt {
            creditor_name: "Acme Bank".to_string(),
            total_amount: total,
            monthly_payment: 500.0,
            due_date: NaiveDate::from_ymd_opt(2027, 6, 30).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_create_debt_starts_fully_outstanding() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = context_with_role(&db, "admin", Role::Admin).await?;

        let created = create_debt(&db, &admin, &AppConfig::default(), bank_loan(2_000.0)).await?;

        assert_eq!(created.remaining_amount, created.total_amount);
        assert_eq!(created.status, DebtStatus::Active);
        Ok(())
    }

    #[tokio::test]
    async fn test_installment_records_one_debt_expense() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = context_with_role(&db, "admin", Role::Admin).await?;
        let created = create_debt(&db, &admin, &AppConfig::default(), bank_loan(2_000.0)).await?;
        let before = Expense::find().count(&db).await?;

        let receipt = pay_debt_installment(&db, &admin, created.id, 500.0).await?;

        assert_eq!(Expense::find().count(&db).await?, before + 1);
        assert_eq!(receipt.expense.amount, 500.0);
        assert_eq!(receipt.expense.category.as_deref(), Some(DEBT_CATEGORY));
        assert_eq!(receipt.expense.description, "Remboursement: Acme Bank");
        assert_eq!(receipt.debt.remaining_amount, 1_500.0);
        assert_eq!(receipt.debt.status, DebtStatus::Active);
        Ok(())
    }

    #[tokio::test]
    async fn test_remaining_stays_in_bounds_until_paid() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = context_with_role(&db, "admin", Role::Admin).await?;
        let created = create_debt(&db, &admin, &AppConfig::default(), bank_loan(1_000.0)).await?;

        let mut last = created.clone();
        for amount in [250.0, 250.0, 500.0] {
            last = pay_debt_installment(&db, &admin, created.id, amount).await?.debt;
            assert!(last.remaining_amount >= 0.0);
            assert!(last.remaining_amount <= last.total_amount);
            assert_eq!(last.status == DebtStatus::Paid, last.remaining_amount <= 0.0);
        }
        assert_eq!(last.remaining_amount, 0.0);
        assert_eq!(last.status, DebtStatus::Paid);
        Ok(())
    }

    #[tokio::test]
    async fn test_overpayment_goes_negative_and_paid() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = context_with_role(&db, "admin", Role::Admin).await?;
        let created = create_debt(&db, &admin, &AppConfig::default(), bank_loan(300.0)).await?;

        let receipt = pay_debt_installment(&db, &admin, created.id, 500.0).await?;

        assert_eq!(receipt.debt.remaining_amount, -200.0);
        assert_eq!(receipt.debt.status, DebtStatus::Paid);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_or_foreign_debt_writes_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let admin_a = context_with_role(&db, "a", Role::Admin).await?;
        let admin_b = context_with_role(&db, "b", Role::Admin).await?;
        let config = AppConfig::default();
        let debt_a = create_debt(&db, &admin_a, &config, bank_loan(300.0)).await?;
        create_debt(&db, &admin_b, &config, bank_loan(100.0)).await?;

        for (ctx, id) in [(&admin_a, 9_999), (&admin_b, debt_a.id)] {
            let result = pay_debt_installment(&db, ctx, id, 50.0).await;
            assert!(matches!(result, Err(Error::NotFound { entity: "debt", .. })));
        }

        assert_eq!(Expense::find().count(&db).await?, 0);
        let untouched = Debt::find_by_id(debt_a.id).one(&db).await?.unwrap();
        assert_eq!(untouched.remaining_amount, 300.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_viewer_cannot_pay_or_create() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = context_with_role(&db, "admin", Role::Admin).await?;
        let viewer = context_with_role(&db, "viewer", Role::Viewer).await?;
        let created = create_debt(&db, &admin, &AppConfig::default(), bank_loan(300.0)).await?;

        assert!(matches!(
            create_debt(&db, &viewer, &AppConfig::default(), bank_loan(1.0)).await,
            Err(Error::Forbidden { .. })
        ));
        assert!(matches!(
            pay_debt_installment(&db, &viewer, created.id, 10.0).await,
            Err(Error::Forbidden { .. })
        ));
        assert_eq!(Debt::find().count(&db).await?, 1);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_installments_lose_no_update() -> Result<()> {
        let (_dir, db) = setup_file_db().await?;
        let admin = context_with_role(&db, "admin", Role::Admin).await?;
        let debt_id = create_debt(&db, &admin, &AppConfig::default(), bank_loan(10_000.0))
            .await?
            .id;

        let db = std::sync::Arc::new(db);
        let mut payments = tokio::task::JoinSet::new();
        for _ in 0..20 {
            let (db, admin) = (db.clone(), admin.clone());
            payments.spawn(async move { pay_debt_installment(&db, &admin, debt_id, 100.0).await });
        }
        while let Some(joined) = payments.join_next().await {
            joined.unwrap()?;
        }

        let stored = Debt::find_by_id(debt_id).one(&*db).await?.unwrap();
        assert_eq!(stored.remaining_amount, 8_000.0);
        assert_eq!(stored.status, DebtStatus::Active);
        let repayments = Expense::find()
            .filter(expense_entity::Column::Category.eq(DEBT_CATEGORY))
            .count(&*db)
            .await?;
        assert_eq!(repayments, 20);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_debts_active_first() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = context_with_role(&db, "admin", Role::Admin).await?;
        let config = AppConfig::default();
        let mut early = bank_loan(100.0);
        early.due_date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let paid_off = create_debt(&db, &admin, &config, early).await?;
        let active = create_debt(&db, &admin, &config, bank_loan(100.0)).await?;
        pay_debt_installment(&db, &admin, paid_off.id, 100.0).await?;

        let listed = list_debts(&db, &admin).await?;
        assert_eq!(listed[0].id, active.id);
        assert_eq!(listed[1].status, DebtStatus::Paid);
        Ok(())
    }
}
