use model::payload::{first_value, is_truthy, safe_decimal, safe_int, string_or_none, unwrap_list};
use model::AccountSummary;
use rust_decimal::Decimal;
use serde_json::Value;

/// Map the account-search response into summaries, ascending by id.
pub(crate) fn map_account_rows(payload: &Value) -> Vec<AccountSummary> {
    let rows = unwrap_list(payload, &["accounts", "data", "items"]);
    let mut output: Vec<AccountSummary> = Vec::new();

    for row in &rows {
        if !row.is_object() {
            continue;
        }
        // Keep this defensive filter even when onlyActiveAccounts=true.
        if row.get("canTrade") == Some(&Value::Bool(false)) {
            continue;
        }

        let Some(id) = first_value(row, &["id", "accountId", "account_id"]).and_then(safe_int)
        else {
            continue;
        };

        let status = first_value(row, &["status", "state", "accountStatus"])
            .and_then(string_or_none)
            .unwrap_or_else(|| {
                if row.get("canTrade").map(is_truthy).unwrap_or(false) {
                    "ACTIVE".to_string()
                } else {
                    "UNKNOWN".to_string()
                }
            });

        let name = first_value(row, &["name", "accountName", "displayName"])
            .and_then(string_or_none)
            .unwrap_or_else(|| format!("Account {id}"));

        let balance = first_value(
            row,
            &[
                "balance",
                "cashBalance",
                "netLiquidatingValue",
                "equity",
                "availableBalance",
            ],
        )
        .map(safe_decimal)
        .unwrap_or(Decimal::ZERO);

        output.push(AccountSummary {
            id,
            name,
            balance,
            status,
        });
    }

    output.sort_by_key(|account| account.id);
    output
}
