use crate::database::lock_connection;
use crate::error::{ConversionError, StoreError};
use crate::schema::projectx_trade_events;
use chrono::NaiveDateTime;
use diesel::dsl::{max, min, sql};
use diesel::prelude::*;
use diesel::sql_types::{Bool, Text};
use model::time::as_utc;
use model::{StoreOutcome, TradeEvent, TradeEventQuery, TradeEventRead, TradeEventWrite, TradePnl};
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::error;

pub struct TradeEventDB {
    pub connection: Arc<Mutex<SqliteConnection>>,
}

#[derive(Queryable, Debug, Clone)]
struct TradeEventRow {
    id: i64,
    account_id: i64,
    contract_id: String,
    symbol: Option<String>,
    side: String,
    size: String,
    price: String,
    trade_timestamp: NaiveDateTime,
    fees: String,
    pnl: Option<String>,
    order_id: String,
    source_trade_id: Option<String>,
    status: Option<String>,
    raw_payload: Option<String>,
    created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = projectx_trade_events)]
struct NewTradeEventRow {
    account_id: i64,
    contract_id: String,
    symbol: Option<String>,
    side: String,
    size: String,
    price: String,
    trade_timestamp: NaiveDateTime,
    fees: String,
    pnl: Option<String>,
    order_id: String,
    source_trade_id: Option<String>,
    status: Option<String>,
    raw_payload: Option<String>,
    created_at: NaiveDateTime,
}

/// Mutable fields applied when an incoming event matches an existing row.
#[derive(AsChangeset, Debug)]
#[diesel(table_name = projectx_trade_events, treat_none_as_null = true)]
struct TradeEventChanges {
    side: String,
    size: String,
    price: String,
    fees: String,
    pnl: Option<String>,
    source_trade_id: Option<String>,
    status: Option<String>,
    raw_payload: Option<String>,
}

impl TryFrom<TradeEventRow> for TradeEvent {
    type Error = ConversionError;

    fn try_from(value: TradeEventRow) -> Result<Self, Self::Error> {
        let side = value
            .side
            .parse()
            .map_err(|_| ConversionError::new("side", "invalid trade_event.side in database"))?;
        let size = Decimal::from_str(&value.size)
            .map_err(|e| ConversionError::new("size", format!("invalid decimal: {e}")))?;
        let price = Decimal::from_str(&value.price)
            .map_err(|e| ConversionError::new("price", format!("invalid decimal: {e}")))?;
        let fees = Decimal::from_str(&value.fees)
            .map_err(|e| ConversionError::new("fees", format!("invalid decimal: {e}")))?;
        let pnl = match value.pnl {
            Some(raw) => TradePnl::Closed(
                Decimal::from_str(&raw)
                    .map_err(|e| ConversionError::new("pnl", format!("invalid decimal: {e}")))?,
            ),
            None => TradePnl::Open,
        };
        let raw_payload = value
            .raw_payload
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(|e| ConversionError::new("raw_payload", format!("invalid json: {e}")))?;

        Ok(TradeEvent {
            id: value.id,
            account_id: value.account_id,
            contract_id: value.contract_id,
            symbol: value.symbol,
            side,
            size,
            price,
            trade_timestamp: as_utc(value.trade_timestamp),
            fees,
            pnl,
            order_id: value.order_id,
            source_trade_id: value.source_trade_id,
            status: value.status,
            raw_payload,
            created_at: as_utc(value.created_at),
        })
    }
}

impl From<&TradeEvent> for NewTradeEventRow {
    fn from(value: &TradeEvent) -> Self {
        NewTradeEventRow {
            account_id: value.account_id,
            contract_id: value.contract_id.clone(),
            symbol: value.symbol.clone(),
            side: value.side.to_string(),
            size: value.size.to_string(),
            price: value.price.to_string(),
            trade_timestamp: value.trade_timestamp.naive_utc(),
            fees: value.fees.to_string(),
            pnl: value.pnl.realized().map(|pnl| pnl.to_string()),
            order_id: value.order_id.clone(),
            source_trade_id: value.source_trade_id.clone(),
            status: value.status.clone(),
            raw_payload: value
                .raw_payload
                .as_ref()
                .map(|raw| raw.to_string()),
            created_at: value.created_at.naive_utc(),
        }
    }
}

/// Identity and merge state for one already-stored row.
#[derive(Debug, Clone)]
struct ExistingRow {
    id: i64,
    source_trade_id: Option<String>,
    status: Option<String>,
}

/// Predicate excluding rows the gateway has voided.
///
/// SQLite's json_extract yields 1/0 for JSON booleans, so both spellings
/// are in the exclusion set.
const NON_VOIDED_SQL: &str =
    "lower(coalesce(json_extract(raw_payload, '$.voided'), 'false')) NOT IN ('true', '1')";

fn non_empty(value: &Option<String>) -> bool {
    value
        .as_ref()
        .map(|text| !text.trim().is_empty())
        .unwrap_or(false)
}

impl TradeEventWrite for TradeEventDB {
    #[allow(clippy::too_many_lines)]
    fn store_events(&mut self, events: &[TradeEvent]) -> Result<StoreOutcome, Box<dyn Error>> {
        let mut batch: Vec<&TradeEvent> = events.iter().filter(|e| !e.is_voided()).collect();
        if batch.is_empty() {
            return Ok(StoreOutcome::default());
        }
        batch.sort_by(|a, b| {
            a.trade_timestamp
                .cmp(&b.trade_timestamp)
                .then_with(|| a.order_id.cmp(&b.order_id))
        });

        let account_ids: Vec<i64> = batch
            .iter()
            .map(|event| event.account_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let source_ids: Vec<String> = batch
            .iter()
            .filter_map(|event| event.source_trade_id.clone())
            .collect();
        let timestamps: Vec<NaiveDateTime> = batch
            .iter()
            .map(|event| event.trade_timestamp.naive_utc())
            .collect();
        let min_ts = timestamps.iter().min().copied().ok_or("empty batch")?;
        let max_ts = timestamps.iter().max().copied().ok_or("empty batch")?;

        let mut connection = lock_connection(&self.connection);
        let outcome = connection.transaction::<StoreOutcome, StoreError, _>(|conn| {
            let mut existing: Vec<TradeEventRow> = projectx_trade_events::table
                .filter(projectx_trade_events::account_id.eq_any(&account_ids))
                .filter(projectx_trade_events::trade_timestamp.between(min_ts, max_ts))
                .load(conn)?;
            if !source_ids.is_empty() {
                let by_source: Vec<TradeEventRow> = projectx_trade_events::table
                    .filter(projectx_trade_events::account_id.eq_any(&account_ids))
                    .filter(projectx_trade_events::source_trade_id.is_not_null())
                    .filter(
                        projectx_trade_events::source_trade_id
                            .assume_not_null()
                            .eq_any(&source_ids),
                    )
                    .load(conn)?;
                existing.extend(by_source);
            }

            let mut rows: HashMap<i64, ExistingRow> = HashMap::new();
            let mut by_source: HashMap<(i64, String), i64> = HashMap::new();
            let mut by_triple: HashMap<(i64, String, NaiveDateTime), i64> = HashMap::new();
            for row in existing {
                if let Some(source) = &row.source_trade_id {
                    by_source.insert((row.account_id, source.clone()), row.id);
                }
                by_triple.insert(
                    (row.account_id, row.order_id.clone(), row.trade_timestamp),
                    row.id,
                );
                rows.insert(
                    row.id,
                    ExistingRow {
                        id: row.id,
                        source_trade_id: row.source_trade_id,
                        status: row.status,
                    },
                );
            }

            let mut inserted = 0usize;
            let mut updated = 0usize;

            for event in &batch {
                let naive_ts = event.trade_timestamp.naive_utc();
                let matched = event
                    .source_trade_id
                    .as_ref()
                    .and_then(|source| {
                        by_source.get(&(event.account_id, source.clone())).copied()
                    })
                    .or_else(|| {
                        by_triple
                            .get(&(event.account_id, event.order_id.clone(), naive_ts))
                            .copied()
                    });

                match matched.and_then(|row_id| rows.get(&row_id).cloned()) {
                    Some(current) => {
                        let merged_source = if non_empty(&event.source_trade_id) {
                            event.source_trade_id.clone()
                        } else {
                            current.source_trade_id.clone()
                        };
                        let merged_status = if non_empty(&event.status) {
                            event.status.clone()
                        } else {
                            current.status.clone()
                        };
                        let changes = TradeEventChanges {
                            side: event.side.to_string(),
                            size: event.size.to_string(),
                            price: event.price.to_string(),
                            fees: event.fees.to_string(),
                            pnl: event.pnl.realized().map(|pnl| pnl.to_string()),
                            source_trade_id: merged_source.clone(),
                            status: merged_status.clone(),
                            raw_payload: event.raw_payload.as_ref().map(|raw| raw.to_string()),
                        };
                        diesel::update(
                            projectx_trade_events::table
                                .filter(projectx_trade_events::id.eq(current.id)),
                        )
                        .set(&changes)
                        .execute(conn)?;

                        if let Some(source) = &merged_source {
                            by_source.insert((event.account_id, source.clone()), current.id);
                        }
                        by_triple
                            .insert((event.account_id, event.order_id.clone(), naive_ts), current.id);
                        rows.insert(
                            current.id,
                            ExistingRow {
                                id: current.id,
                                source_trade_id: merged_source,
                                status: merged_status,
                            },
                        );
                        updated = updated.saturating_add(1);
                    }
                    None => {
                        let row = NewTradeEventRow::from(*event);
                        let new_id: i64 = diesel::insert_into(projectx_trade_events::table)
                            .values(&row)
                            .returning(projectx_trade_events::id)
                            .get_result(conn)?;

                        if let Some(source) = &event.source_trade_id {
                            by_source.insert((event.account_id, source.clone()), new_id);
                        }
                        by_triple
                            .insert((event.account_id, event.order_id.clone(), naive_ts), new_id);
                        rows.insert(
                            new_id,
                            ExistingRow {
                                id: new_id,
                                source_trade_id: event.source_trade_id.clone(),
                                status: event.status.clone(),
                            },
                        );
                        inserted = inserted.saturating_add(1);
                    }
                }
            }

            Ok(StoreOutcome { inserted, updated })
        });

        outcome.map_err(|e| {
            error!("Failed to store trade events: {e}");
            Box::new(e) as Box<dyn Error>
        })
    }
}

impl TradeEventRead for TradeEventDB {
    fn has_local_trades(&mut self, account_id: i64) -> Result<bool, Box<dyn Error>> {
        let mut connection = lock_connection(&self.connection);
        let found: Vec<i64> = projectx_trade_events::table
            .filter(projectx_trade_events::account_id.eq(account_id))
            .filter(sql::<Bool>(NON_VOIDED_SQL))
            .select(projectx_trade_events::id)
            .limit(1)
            .load(&mut *connection)?;
        Ok(!found.is_empty())
    }

    fn latest_trade_timestamp(
        &mut self,
        account_id: i64,
    ) -> Result<Option<chrono::DateTime<chrono::Utc>>, Box<dyn Error>> {
        let mut connection = lock_connection(&self.connection);
        let latest: Option<NaiveDateTime> = projectx_trade_events::table
            .filter(projectx_trade_events::account_id.eq(account_id))
            .filter(sql::<Bool>(NON_VOIDED_SQL))
            .select(max(projectx_trade_events::trade_timestamp))
            .first(&mut *connection)?;
        Ok(latest.map(as_utc))
    }

    fn earliest_trade_timestamp(
        &mut self,
        account_id: i64,
    ) -> Result<Option<chrono::DateTime<chrono::Utc>>, Box<dyn Error>> {
        let mut connection = lock_connection(&self.connection);
        let earliest: Option<NaiveDateTime> = projectx_trade_events::table
            .filter(projectx_trade_events::account_id.eq(account_id))
            .filter(sql::<Bool>(NON_VOIDED_SQL))
            .select(min(projectx_trade_events::trade_timestamp))
            .first(&mut *connection)?;
        Ok(earliest.map(as_utc))
    }

    fn list_closed(&mut self, query: &TradeEventQuery) -> Result<Vec<TradeEvent>, Box<dyn Error>> {
        let mut connection = lock_connection(&self.connection);
        let mut statement = projectx_trade_events::table
            .filter(projectx_trade_events::account_id.eq(query.account_id))
            .filter(sql::<Bool>(NON_VOIDED_SQL))
            // Day-journal rows are closed trades only.
            .filter(projectx_trade_events::pnl.is_not_null())
            .into_boxed();

        if let Some(start) = query.start {
            statement =
                statement.filter(projectx_trade_events::trade_timestamp.ge(start.naive_utc()));
        }
        if let Some(end) = query.end {
            statement =
                statement.filter(projectx_trade_events::trade_timestamp.le(end.naive_utc()));
        }
        if let Some(symbol_query) = &query.symbol_query {
            let normalized = symbol_query.trim().to_lowercase();
            if !normalized.is_empty() {
                statement = statement.filter(
                    sql::<Bool>("lower(coalesce(symbol, contract_id)) LIKE ")
                        .bind::<Text, _>(format!("%{normalized}%")),
                );
            }
        }

        let rows: Vec<TradeEventRow> = statement
            .order((
                projectx_trade_events::trade_timestamp.desc(),
                projectx_trade_events::id.desc(),
            ))
            .limit(query.limit)
            .load(&mut *connection)?;

        rows.into_iter()
            .map(|row| TradeEvent::try_from(row).map_err(|e| Box::new(e) as Box<dyn Error>))
            .collect()
    }

    fn for_metrics(
        &mut self,
        account_id: i64,
        start: Option<chrono::DateTime<chrono::Utc>>,
        end: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Vec<TradeEvent>, Box<dyn Error>> {
        let mut connection = lock_connection(&self.connection);
        let mut statement = projectx_trade_events::table
            .filter(projectx_trade_events::account_id.eq(account_id))
            .filter(sql::<Bool>(NON_VOIDED_SQL))
            .into_boxed();

        if let Some(start) = start {
            statement =
                statement.filter(projectx_trade_events::trade_timestamp.ge(start.naive_utc()));
        }
        if let Some(end) = end {
            statement =
                statement.filter(projectx_trade_events::trade_timestamp.le(end.naive_utc()));
        }

        let rows: Vec<TradeEventRow> = statement
            .order((
                projectx_trade_events::trade_timestamp.asc(),
                projectx_trade_events::id.asc(),
            ))
            .load(&mut *connection)?;

        rows.into_iter()
            .map(|row| TradeEvent::try_from(row).map_err(|e| Box::new(e) as Box<dyn Error>))
            .collect()
    }

    fn count_for_day(
        &mut self,
        account_id: i64,
        day: chrono::NaiveDate,
    ) -> Result<i64, Box<dyn Error>> {
        let day_start = day
            .and_hms_opt(0, 0, 0)
            .ok_or("invalid day for count_for_day")?;
        let day_end = day
            .succ_opt()
            .and_then(|next| next.and_hms_opt(0, 0, 0))
            .ok_or("invalid day for count_for_day")?;

        let mut connection = lock_connection(&self.connection);
        let count: i64 = projectx_trade_events::table
            .filter(projectx_trade_events::account_id.eq(account_id))
            .filter(sql::<Bool>(NON_VOIDED_SQL))
            .filter(projectx_trade_events::trade_timestamp.ge(day_start))
            .filter(projectx_trade_events::trade_timestamp.lt(day_end))
            .count()
            .get_result(&mut *connection)?;
        Ok(count)
    }
}
