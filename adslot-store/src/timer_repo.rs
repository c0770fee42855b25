use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use adslot_domain::repository::{StoreError, TimerHoldStore};
use adslot_domain::{SlotDescriptor, SlotSearchCriteria, TimerHold};

pub struct PgTimerHoldStore {
    pool: PgPool,
    hold_ttl: Duration,
}

impl PgTimerHoldStore {
    pub fn new(pool: PgPool, hold_ttl: Duration) -> Self {
        Self { pool, hold_ttl }
    }
}

#[derive(sqlx::FromRow)]
struct HoldRow {
    id: Uuid,
    booking_id: Option<Uuid>,
    holder_uuid: String,
    advertisement_type: String,
    location: String,
    face_area: String,
    night_light: bool,
    booking_date: NaiveDate,
    tenant_id: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl From<HoldRow> for TimerHold {
    fn from(row: HoldRow) -> Self {
        TimerHold {
            id: row.id,
            booking_id: row.booking_id,
            holder_uuid: row.holder_uuid,
            slot: SlotDescriptor {
                advertisement_type: row.advertisement_type,
                location: row.location,
                face_area: row.face_area,
                night_light: row.night_light,
                booking_date: row.booking_date,
                tenant_id: row.tenant_id,
            },
            created_at: row.created_at,
            expires_at: row.expires_at,
        }
    }
}

#[async_trait]
impl TimerHoldStore for PgTimerHoldStore {
    async fn find_active_holds(
        &self,
        criteria: &SlotSearchCriteria,
        now: DateTime<Utc>,
    ) -> Result<Vec<TimerHold>, StoreError> {
        let rows: Vec<HoldRow> = sqlx::query_as(
            "SELECT id, booking_id, holder_uuid, advertisement_type, location, face_area, \
             night_light, booking_date, tenant_id, created_at, expires_at \
             FROM payment_timer \
             WHERE tenant_id = $1 AND advertisement_type = $2 AND location = $3 \
               AND face_area = $4 AND night_light = $5 \
               AND booking_date BETWEEN $6 AND $7 AND expires_at > $8",
        )
        .bind(&criteria.tenant_id)
        .bind(&criteria.advertisement_type)
        .bind(&criteria.location)
        .bind(&criteria.face_area)
        .bind(criteria.night_light)
        .bind(criteria.booking_start_date)
        .bind(criteria.booking_end_date)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn acquire_hold(
        &self,
        slot: &SlotDescriptor,
        holder_uuid: &str,
        booking_id: Option<Uuid>,
    ) -> Result<TimerHold, StoreError> {
        let now = Utc::now();
        let expires_at = now + self.hold_ttl;

        // Re-acquiring one's own live hold refreshes its expiry.
        let refreshed: Option<(Uuid, DateTime<Utc>)> = sqlx::query_as(
            "UPDATE payment_timer SET expires_at = $1 \
             WHERE holder_uuid = $2 AND expires_at > $3 \
               AND advertisement_type = $4 AND location = $5 AND face_area = $6 \
               AND night_light = $7 AND booking_date = $8 AND tenant_id = $9 \
             RETURNING id, created_at",
        )
        .bind(expires_at)
        .bind(holder_uuid)
        .bind(now)
        .bind(&slot.advertisement_type)
        .bind(&slot.location)
        .bind(&slot.face_area)
        .bind(slot.night_light)
        .bind(slot.booking_date)
        .bind(&slot.tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some((id, created_at)) = refreshed {
            return Ok(TimerHold {
                id,
                booking_id,
                holder_uuid: holder_uuid.to_string(),
                slot: slot.clone(),
                created_at,
                expires_at,
            });
        }

        // Conditional insert: the slot must not carry any other live hold.
        let id = Uuid::new_v4();
        let result = sqlx::query(
            "INSERT INTO payment_timer (id, booking_id, holder_uuid, advertisement_type, \
             location, face_area, night_light, booking_date, tenant_id, created_at, expires_at) \
             SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11 \
             WHERE NOT EXISTS ( \
                 SELECT 1 FROM payment_timer \
                 WHERE advertisement_type = $4 AND location = $5 AND face_area = $6 \
                   AND night_light = $7 AND booking_date = $8 AND tenant_id = $9 \
                   AND expires_at > $10 \
             )",
        )
        .bind(id)
        .bind(booking_id)
        .bind(holder_uuid)
        .bind(&slot.advertisement_type)
        .bind(&slot.location)
        .bind(&slot.face_area)
        .bind(slot.night_light)
        .bind(slot.booking_date)
        .bind(&slot.tenant_id)
        .bind(now)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err("slot is already held by another user".into());
        }

        Ok(TimerHold {
            id,
            booking_id,
            holder_uuid: holder_uuid.to_string(),
            slot: slot.clone(),
            created_at: now,
            expires_at,
        })
    }

    async fn assign_booking(
        &self,
        holder_uuid: &str,
        slots: &[SlotDescriptor],
        booking_id: Uuid,
    ) -> Result<(), StoreError> {
        let now = Utc::now();
        for slot in slots {
            sqlx::query(
                "UPDATE payment_timer SET booking_id = $1 \
                 WHERE holder_uuid = $2 AND expires_at > $3 \
                   AND advertisement_type = $4 AND location = $5 AND face_area = $6 \
                   AND night_light = $7 AND booking_date = $8 AND tenant_id = $9",
            )
            .bind(booking_id)
            .bind(holder_uuid)
            .bind(now)
            .bind(&slot.advertisement_type)
            .bind(&slot.location)
            .bind(&slot.face_area)
            .bind(slot.night_light)
            .bind(slot.booking_date)
            .bind(&slot.tenant_id)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn release_holds(&self, booking_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM payment_timer WHERE booking_id = $1")
            .bind(booking_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
