use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use settlement_engine::{
    db_types::{OrderStatusType, ProfileId},
    order_objects::OrderQueryFilter,
};

use crate::errors::ServerError;

/// Query parameters for `GET /api/orders`.
///
/// `status` is a comma-separated list, e.g. `?status=paid,completed`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderSearchParams {
    pub buyer_id: Option<ProfileId>,
    pub seller_id: Option<ProfileId>,
    pub status: Option<String>,
    pub paid: Option<bool>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl TryFrom<OrderSearchParams> for OrderQueryFilter {
    type Error = ServerError;

    fn try_from(params: OrderSearchParams) -> Result<Self, Self::Error> {
        let status = params
            .status
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| OrderStatusType::from_str(s).map_err(|e| ServerError::InvalidQuery(e.to_string())))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;
        Ok(OrderQueryFilter {
            buyer_id: params.buyer_id,
            seller_id: params.seller_id,
            participant: None,
            status,
            paid: params.paid,
            since: params.since,
            until: params.until,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryDateUpdate {
    pub estimated_delivery_date: NaiveDate,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn search_params_to_filter() {
        let params = OrderSearchParams {
            buyer_id: Some(ProfileId(3)),
            status: Some("paid, awaiting_payment".into()),
            ..Default::default()
        };
        let filter = OrderQueryFilter::try_from(params).unwrap();
        assert_eq!(filter.buyer_id, Some(ProfileId(3)));
        assert_eq!(filter.status, Some(vec![OrderStatusType::Paid, OrderStatusType::AwaitingPayment]));

        let params = OrderSearchParams { status: Some("PAID,shipped".into()), ..Default::default() };
        let err = OrderQueryFilter::try_from(params).unwrap_err();
        assert_eq!(err.to_string(), "Could not read request query: Invalid order status: shipped");
    }
}
