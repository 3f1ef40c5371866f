// Ring 3: Business - date ranges must not run backwards
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgConnection;

use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::observer::traits::{Observer, ObserverRing, Operation};
use crate::resources::ResourceDef;

const RANGES: &[(&str, &str)] = &[("fromDate", "toDate"), ("startDate", "endDate")];

#[derive(Default)]
pub struct DateRangeObserver;

#[async_trait]
impl Observer for DateRangeObserver {
    fn name(&self) -> &'static str {
        "DateRangeObserver"
    }

    fn ring(&self) -> ObserverRing {
        ObserverRing::Business
    }

    fn applies_to_operation(&self, op: Operation) -> bool {
        matches!(op, Operation::Create | Operation::Update)
    }

    fn applies_to_resource(&self, resource: &ResourceDef) -> bool {
        RANGES.iter().any(|(start, end)| resource.field(start).is_some() && resource.field(end).is_some())
    }

    async fn execute(&self, ctx: &mut ObserverContext, _conn: &mut PgConnection) -> Result<(), ObserverError> {
        for (start, end) in RANGES {
            // Dates are normalised to YYYY-MM-DD so text order is date order
            let from = ctx.effective(start).and_then(Value::as_str);
            let to = ctx.effective(end).and_then(Value::as_str);
            if let (Some(from), Some(to)) = (from, to) {
                if from > to {
                    return Err(ObserverError::FieldErrors(
                        [(end.to_string(), format!("must not be before {}", start))].into(),
                    ));
                }
            }
        }
        Ok(())
    }
}
