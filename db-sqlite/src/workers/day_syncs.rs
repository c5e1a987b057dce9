use crate::database::lock_connection;
use crate::error::ConversionError;
use crate::schema::projectx_trade_day_syncs;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use diesel::prelude::*;
use model::time::as_utc;
use model::{DaySyncRead, DaySyncWrite, SyncStatus, TradeDaySync};
use std::error::Error;
use std::sync::{Arc, Mutex};
use tracing::error;

pub struct DaySyncDB {
    pub connection: Arc<Mutex<SqliteConnection>>,
}

#[derive(Queryable, Debug, Clone)]
struct DaySyncRow {
    #[allow(dead_code)]
    id: i64,
    account_id: i64,
    trade_date: NaiveDate,
    sync_status: String,
    last_synced_at: NaiveDateTime,
    row_count: i64,
    updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = projectx_trade_day_syncs)]
struct NewDaySyncRow {
    account_id: i64,
    trade_date: NaiveDate,
    sync_status: String,
    last_synced_at: NaiveDateTime,
    row_count: i64,
    updated_at: NaiveDateTime,
}

impl TryFrom<DaySyncRow> for TradeDaySync {
    type Error = ConversionError;

    fn try_from(value: DaySyncRow) -> Result<Self, Self::Error> {
        let sync_status = value
            .sync_status
            .parse()
            .map_err(|_| ConversionError::new("sync_status", "invalid day_sync.sync_status"))?;
        Ok(TradeDaySync {
            account_id: value.account_id,
            trade_date: value.trade_date,
            sync_status,
            last_synced_at: as_utc(value.last_synced_at),
            row_count: value.row_count,
            updated_at: as_utc(value.updated_at),
        })
    }
}

impl DaySyncRead for DaySyncDB {
    fn for_day(
        &mut self,
        account_id: i64,
        day: NaiveDate,
    ) -> Result<Option<TradeDaySync>, Box<dyn Error>> {
        let mut connection = lock_connection(&self.connection);
        let row: Option<DaySyncRow> = projectx_trade_day_syncs::table
            .filter(projectx_trade_day_syncs::account_id.eq(account_id))
            .filter(projectx_trade_day_syncs::trade_date.eq(day))
            .first(&mut *connection)
            .optional()?;

        row.map(|row| TradeDaySync::try_from(row).map_err(|e| Box::new(e) as Box<dyn Error>))
            .transpose()
    }
}

impl DaySyncWrite for DaySyncDB {
    fn upsert_day(
        &mut self,
        account_id: i64,
        day: NaiveDate,
        status: SyncStatus,
        row_count: i64,
    ) -> Result<TradeDaySync, Box<dyn Error>> {
        let now = Utc::now().naive_utc();
        let row = NewDaySyncRow {
            account_id,
            trade_date: day,
            sync_status: status.to_string(),
            last_synced_at: now,
            row_count,
            updated_at: now,
        };

        let mut connection = lock_connection(&self.connection);
        diesel::insert_into(projectx_trade_day_syncs::table)
            .values(&row)
            .on_conflict((
                projectx_trade_day_syncs::account_id,
                projectx_trade_day_syncs::trade_date,
            ))
            .do_update()
            .set((
                projectx_trade_day_syncs::sync_status.eq(&row.sync_status),
                projectx_trade_day_syncs::last_synced_at.eq(row.last_synced_at),
                projectx_trade_day_syncs::row_count.eq(row.row_count),
                projectx_trade_day_syncs::updated_at.eq(row.updated_at),
            ))
            .execute(&mut *connection)
            .map_err(|e| {
                error!("Failed to upsert day sync for account {account_id} on {day}: {e}");
                Box::new(e) as Box<dyn Error>
            })?;

        let stored: DaySyncRow = projectx_trade_day_syncs::table
            .filter(projectx_trade_day_syncs::account_id.eq(account_id))
            .filter(projectx_trade_day_syncs::trade_date.eq(day))
            .first(&mut *connection)?;
        stored
            .try_into()
            .map_err(|e: ConversionError| Box::new(e) as Box<dyn Error>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SqliteDatabase;
    use model::DatabaseFactory;

    #[test]
    fn upsert_creates_then_transitions_partial_to_complete() {
        let db = SqliteDatabase::new_in_memory();
        let day = NaiveDate::from_ymd_opt(2026, 2, 19).unwrap();

        let created = db
            .day_sync_write()
            .upsert_day(7, day, SyncStatus::Partial, 3)
            .unwrap();
        assert_eq!(created.sync_status, SyncStatus::Partial);
        assert_eq!(created.row_count, 3);

        let completed = db
            .day_sync_write()
            .upsert_day(7, day, SyncStatus::Complete, 5)
            .unwrap();
        assert_eq!(completed.sync_status, SyncStatus::Complete);
        assert_eq!(completed.row_count, 5);

        let read_back = db.day_sync_read().for_day(7, day).unwrap().unwrap();
        assert_eq!(read_back.sync_status, SyncStatus::Complete);
        assert_eq!(read_back.row_count, 5);
    }

    #[test]
    fn for_day_returns_none_when_never_synced() {
        let db = SqliteDatabase::new_in_memory();
        let day = NaiveDate::from_ymd_opt(2026, 2, 19).unwrap();
        assert!(db.day_sync_read().for_day(7, day).unwrap().is_none());
    }

    #[test]
    fn records_are_scoped_per_account_and_date() {
        let db = SqliteDatabase::new_in_memory();
        let day = NaiveDate::from_ymd_opt(2026, 2, 19).unwrap();
        let other_day = NaiveDate::from_ymd_opt(2026, 2, 20).unwrap();

        db.day_sync_write()
            .upsert_day(7, day, SyncStatus::Complete, 5)
            .unwrap();
        db.day_sync_write()
            .upsert_day(7, other_day, SyncStatus::Partial, 1)
            .unwrap();
        db.day_sync_write()
            .upsert_day(8, day, SyncStatus::Partial, 2)
            .unwrap();

        assert_eq!(
            db.day_sync_read().for_day(7, day).unwrap().unwrap().row_count,
            5
        );
        assert_eq!(
            db.day_sync_read()
                .for_day(7, other_day)
                .unwrap()
                .unwrap()
                .row_count,
            1
        );
        assert_eq!(
            db.day_sync_read().for_day(8, day).unwrap().unwrap().row_count,
            2
        );
    }
}
