use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use adslot_domain::repository::{BookingStore, StoreError};
use adslot_domain::{
    ApplicantDetail, Booking, BookingSearchCriteria, SlotDescriptor, SlotSearchCriteria,
};

pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_slots(&self, booking_id: Uuid) -> Result<Vec<SlotDescriptor>, StoreError> {
        let rows: Vec<SlotRow> = sqlx::query_as(
            "SELECT advertisement_type, location, face_area, night_light, booking_date, tenant_id \
             FROM booking_slots WHERE booking_id = $1 ORDER BY booking_date",
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn hydrate(&self, row: BookingRow) -> Result<Booking, StoreError> {
        let slots = self.load_slots(row.booking_id).await?;
        row.into_booking(slots)
    }
}

const BOOKING_COLUMNS: &str = "booking_id, booking_no, draft_id, tenant_id, applicant_name, \
     applicant_mobile, status, permission_letter_filestore_id, payment_receipt_filestore_id, \
     receipt_no, payment_date, created_by, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct BookingRow {
    booking_id: Uuid,
    booking_no: String,
    draft_id: Option<Uuid>,
    tenant_id: String,
    applicant_name: String,
    applicant_mobile: String,
    status: String,
    permission_letter_filestore_id: Option<String>,
    payment_receipt_filestore_id: Option<String>,
    receipt_no: Option<String>,
    payment_date: Option<DateTime<Utc>>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_booking(self, slots: Vec<SlotDescriptor>) -> Result<Booking, StoreError> {
        Ok(Booking {
            booking_id: self.booking_id,
            booking_no: self.booking_no,
            draft_id: self.draft_id,
            tenant_id: self.tenant_id,
            applicant: ApplicantDetail::new(self.applicant_name, self.applicant_mobile),
            slots,
            status: self.status.parse().map_err(StoreError::from)?,
            permission_letter_filestore_id: self.permission_letter_filestore_id,
            payment_receipt_filestore_id: self.payment_receipt_filestore_id,
            receipt_no: self.receipt_no,
            payment_date: self.payment_date,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SlotRow {
    advertisement_type: String,
    location: String,
    face_area: String,
    night_light: bool,
    booking_date: NaiveDate,
    tenant_id: String,
}

impl From<SlotRow> for SlotDescriptor {
    fn from(row: SlotRow) -> Self {
        SlotDescriptor {
            advertisement_type: row.advertisement_type,
            location: row.location,
            face_area: row.face_area,
            night_light: row.night_light,
            booking_date: row.booking_date,
            tenant_id: row.tenant_id,
        }
    }
}

async fn persist_booking_fields<'e, E>(executor: E, booking: &Booking) -> Result<u64, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE bookings SET status = $2, permission_letter_filestore_id = $3, \
         payment_receipt_filestore_id = $4, receipt_no = $5, payment_date = $6, updated_at = $7 \
         WHERE booking_id = $1",
    )
    .bind(booking.booking_id)
    .bind(booking.status.to_string())
    .bind(&booking.permission_letter_filestore_id)
    .bind(&booking.payment_receipt_filestore_id)
    .bind(&booking.receipt_no)
    .bind(booking.payment_date)
    .bind(booking.updated_at)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn find_confirmed_bookings(
        &self,
        criteria: &SlotSearchCriteria,
    ) -> Result<Vec<Booking>, StoreError> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings \
             WHERE status = 'BOOKED' AND tenant_id = $1 AND booking_id IN ( \
                 SELECT booking_id FROM booking_slots \
                 WHERE advertisement_type = $2 AND location = $3 AND face_area = $4 \
                   AND night_light = $5 AND booking_date BETWEEN $6 AND $7 \
             )"
        );
        let rows: Vec<BookingRow> = sqlx::query_as(&sql)
            .bind(&criteria.tenant_id)
            .bind(&criteria.advertisement_type)
            .bind(&criteria.location)
            .bind(&criteria.face_area)
            .bind(criteria.night_light)
            .bind(criteria.booking_start_date)
            .bind(criteria.booking_end_date)
            .fetch_all(&self.pool)
            .await?;

        let mut bookings = Vec::with_capacity(rows.len());
        for row in rows {
            bookings.push(self.hydrate(row).await?);
        }
        Ok(bookings)
    }

    async fn find_by_booking_no(&self, booking_no: &str) -> Result<Option<Booking>, StoreError> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE booking_no = $1");
        let row: Option<BookingRow> = sqlx::query_as(&sql)
            .bind(booking_no)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn search(&self, criteria: &BookingSearchCriteria) -> Result<Vec<Booking>, StoreError> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings \
             WHERE ($1::text IS NULL OR tenant_id = $1) \
               AND ($2::text IS NULL OR booking_no = $2) \
               AND ($3::text IS NULL OR applicant_name = $3) \
               AND ($4::text IS NULL OR applicant_mobile = $4) \
               AND ($5::text IS NULL OR status = $5) \
               AND ($6::text IS NULL OR created_by = $6) \
             ORDER BY created_at DESC"
        );
        let rows: Vec<BookingRow> = sqlx::query_as(&sql)
            .bind(&criteria.tenant_id)
            .bind(&criteria.booking_no)
            .bind(&criteria.applicant_name)
            .bind(&criteria.mobile_number)
            .bind(criteria.status.map(|s| s.to_string()))
            .bind(&criteria.created_by)
            .fetch_all(&self.pool)
            .await?;

        let mut bookings = Vec::with_capacity(rows.len());
        for row in rows {
            bookings.push(self.hydrate(row).await?);
        }
        Ok(bookings)
    }

    async fn count(&self, criteria: &BookingSearchCriteria) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM bookings \
             WHERE ($1::text IS NULL OR tenant_id = $1) \
               AND ($2::text IS NULL OR booking_no = $2) \
               AND ($3::text IS NULL OR applicant_name = $3) \
               AND ($4::text IS NULL OR applicant_mobile = $4) \
               AND ($5::text IS NULL OR status = $5) \
               AND ($6::text IS NULL OR created_by = $6)",
        )
        .bind(&criteria.tenant_id)
        .bind(&criteria.booking_no)
        .bind(&criteria.applicant_name)
        .bind(&criteria.mobile_number)
        .bind(criteria.status.map(|s| s.to_string()))
        .bind(&criteria.created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }

    async fn insert(&self, booking: &Booking) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO bookings (booking_id, booking_no, draft_id, tenant_id, applicant_name, \
             applicant_mobile, status, permission_letter_filestore_id, \
             payment_receipt_filestore_id, receipt_no, payment_date, created_by, created_at, \
             updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(booking.booking_id)
        .bind(&booking.booking_no)
        .bind(booking.draft_id)
        .bind(&booking.tenant_id)
        .bind(booking.applicant.name.expose())
        .bind(booking.applicant.mobile_number.expose())
        .bind(booking.status.to_string())
        .bind(&booking.permission_letter_filestore_id)
        .bind(&booking.payment_receipt_filestore_id)
        .bind(&booking.receipt_no)
        .bind(booking.payment_date)
        .bind(&booking.created_by)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *tx)
        .await?;

        for slot in &booking.slots {
            sqlx::query(
                "INSERT INTO booking_slots (id, booking_id, advertisement_type, location, \
                 face_area, night_light, booking_date, tenant_id) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(Uuid::new_v4())
            .bind(booking.booking_id)
            .bind(&slot.advertisement_type)
            .bind(&slot.location)
            .bind(&slot.face_area)
            .bind(slot.night_light)
            .bind(slot.booking_date)
            .bind(&slot.tenant_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn update(&self, booking: &Booking) -> Result<(), StoreError> {
        let affected = persist_booking_fields(&self.pool, booking).await?;
        if affected == 0 {
            return Err(format!("booking {} does not exist", booking.booking_id).into());
        }
        Ok(())
    }

    async fn update_synchronously(&self, booking: &Booking) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let affected = persist_booking_fields(&mut *tx, booking).await?;
        if affected == 0 {
            return Err(format!("booking {} does not exist", booking.booking_id).into());
        }
        tx.commit().await?;
        Ok(())
    }

    async fn find_draft_by_user(&self, user_uuid: &str) -> Result<Option<Uuid>, StoreError> {
        let draft_id: Option<Uuid> =
            sqlx::query_scalar("SELECT draft_id FROM drafts WHERE user_uuid = $1")
                .bind(user_uuid)
                .fetch_optional(&self.pool)
                .await?;
        Ok(draft_id)
    }

    async fn find_drafts(
        &self,
        criteria: &BookingSearchCriteria,
    ) -> Result<Vec<Booking>, StoreError> {
        let payloads: Vec<serde_json::Value> = sqlx::query_scalar(
            "SELECT detail FROM drafts \
             WHERE ($1::text IS NULL OR user_uuid = $1) \
               AND ($2::text IS NULL OR tenant_id = $2) \
             ORDER BY updated_at DESC",
        )
        .bind(&criteria.created_by)
        .bind(&criteria.tenant_id)
        .fetch_all(&self.pool)
        .await?;

        let mut drafts = Vec::with_capacity(payloads.len());
        for payload in payloads {
            drafts.push(serde_json::from_value(payload)?);
        }
        Ok(drafts)
    }

    async fn insert_draft(&self, draft: &Booking) -> Result<(), StoreError> {
        let draft_id = draft
            .draft_id
            .ok_or("draft id is required for draft insert")?;
        sqlx::query(
            "INSERT INTO drafts (draft_id, user_uuid, tenant_id, detail, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(draft_id)
        .bind(&draft.created_by)
        .bind(&draft.tenant_id)
        .bind(serde_json::to_value(draft)?)
        .bind(draft.created_at)
        .bind(draft.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_draft(&self, draft: &Booking) -> Result<(), StoreError> {
        let draft_id = draft
            .draft_id
            .ok_or("draft id is required for draft update")?;
        let result = sqlx::query(
            "UPDATE drafts SET detail = $2, updated_at = $3 WHERE draft_id = $1",
        )
        .bind(draft_id)
        .bind(serde_json::to_value(draft)?)
        .bind(draft.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(format!("draft {draft_id} does not exist").into());
        }
        Ok(())
    }

    async fn delete_draft(&self, draft_id: Uuid) -> Result<(), StoreError> {
        // Idempotent: deleting an unknown draft affects zero rows.
        sqlx::query("DELETE FROM drafts WHERE draft_id = $1")
            .bind(draft_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
