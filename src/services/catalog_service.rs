use crate::config::CatalogConfig;
use crate::entities::{
    payment_plan_entity as plans, promo_code_entity as promos, room_type_entity as rooms,
};
use crate::error::{AppError, AppResult};
use crate::models::PaymentPlanResponse;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set, TransactionTrait,
};
use std::collections::HashMap;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub rooms: usize,
    pub plans: usize,
    pub promo_codes: usize,
}

/// Rooms, payment plans and promo codes.
#[derive(Clone)]
pub struct CatalogService {
    pool: DatabaseConnection,
}

impl CatalogService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// Inserts configured rows that do not exist yet. Existing rows are left
    /// untouched so restarts never reset sold stock.
    pub async fn seed(&self, catalog: &CatalogConfig) -> AppResult<SeedSummary> {
        let now = Utc::now();
        let mut summary = SeedSummary::default();
        let txn = self.pool.begin().await?;

        for room in &catalog.rooms {
            if rooms::Entity::find_by_id(room.id).one(&txn).await?.is_some() {
                continue;
            }
            rooms::ActiveModel {
                id: Set(room.id),
                name: Set(room.name.clone()),
                guests: Set(room.guests),
                price_cents: Set(room.price_cents),
                available: Set(room.available.max(0)),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;
            summary.rooms += 1;
        }

        for plan in &catalog.plans {
            if plans::Entity::find_by_id(plan.id).one(&txn).await?.is_some() {
                continue;
            }
            plans::ActiveModel {
                id: Set(plan.id),
                installments: Set(plan.installments),
                schedule: Set(plan.schedule.clone()),
                cutoff_at: Set(plan.cutoff_at),
                popular: Set(plan.popular),
                savings: Set(plan.savings.clone()),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
            summary.plans += 1;
        }

        for promo in &catalog.promo_codes {
            let code = promo.code.trim().to_string();
            if promos::Entity::find_by_id(code.clone()).one(&txn).await?.is_some() {
                continue;
            }
            promos::ActiveModel {
                code: Set(code),
                discount_bp: Set(promo.discount_bp),
                room_type_id: Set(promo.room_type_id),
                active_from: Set(promo.active_from.unwrap_or(now)),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
            summary.promo_codes += 1;
        }

        txn.commit().await?;

        log::info!(
            "Catalog seeded: {} room(s), {} plan(s), {} promo code(s) added",
            summary.rooms,
            summary.plans,
            summary.promo_codes
        );
        Ok(summary)
    }

    pub async fn list_plans(&self) -> AppResult<Vec<PaymentPlanResponse>> {
        let now = Utc::now();
        Ok(plans::Entity::find()
            .order_by_asc(plans::Column::Id)
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|plan| PaymentPlanResponse::from_model(plan, now))
            .collect())
    }

    pub async fn find_plan(&self, plan_id: i64) -> AppResult<plans::Model> {
        plans::Entity::find_by_id(plan_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Payment plan {plan_id} not found")))
    }

    /// A plan that may be picked for a new registration at `now`.
    pub async fn selectable_plan(&self, plan_id: i64, now: DateTime<Utc>) -> AppResult<plans::Model> {
        let plan = self.find_plan(plan_id).await?;
        if !plan.is_selectable_at(now) {
            return Err(AppError::PlanClosed(plan_id));
        }
        Ok(plan)
    }

    /// Plan id to installment count.
    pub async fn installment_counts(&self) -> AppResult<HashMap<i64, i32>> {
        Ok(plans::Entity::find()
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|plan| (plan.id, plan.installments))
            .collect())
    }
}
