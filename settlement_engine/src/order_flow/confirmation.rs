//! Symmetric two-party confirmation.
//!
//! Delivery and manual payment both need the buyer *and* the seller to say "yes" before the order can move on. A
//! [`ConfirmationPair`] tracks the two flags. The type parameter stops a delivery pair from ever being mixed up with a
//! payment pair.
//!
//! Flags can only be set through a [`PartyClaim`], and the only way to obtain a claim is [`verify_party`], which
//! checks the caller's profile against the order. This makes "the seller flips the buyer's flag" unrepresentable.
use std::{fmt::Display, marker::PhantomData};

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Order, OrderId, ProfileId},
    engine_api::errors::LifecycleError,
    traits::ProfileService,
};

pub trait Confirmable {
    const NAME: &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payment;

impl Confirmable for Delivery {
    const NAME: &'static str = "delivery";
}

impl Confirmable for Payment {
    const NAME: &'static str = "payment";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Party {
    Buyer,
    Seller,
}

impl Display for Party {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Party::Buyer => write!(f, "buyer"),
            Party::Seller => write!(f, "seller"),
        }
    }
}

/// Proof that `caller` is the `party` side of order `order_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartyClaim {
    order_id: OrderId,
    party: Party,
    caller: ProfileId,
}

impl PartyClaim {
    pub(crate) fn new(order_id: OrderId, party: Party, caller: ProfileId) -> Self {
        Self { order_id, party, caller }
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn party(&self) -> Party {
        self.party
    }

    pub fn caller(&self) -> ProfileId {
        self.caller
    }
}

/// Checks that `caller` is the buyer (or seller) of `order` and issues a claim for that side.
pub async fn verify_party<P: ProfileService>(
    profiles: &P,
    caller: ProfileId,
    party: Party,
    order: &Order,
) -> Result<PartyClaim, LifecycleError> {
    let expected = match party {
        Party::Buyer => order.buyer_id,
        Party::Seller => order.seller_id,
    };
    if profiles.is_same_profile(caller, expected).await? {
        Ok(PartyClaim::new(order.id, party, caller))
    } else {
        warn!("🔄️ {caller} tried to confirm as the {party} of order {}, but is not that party", order.id);
        Err(LifecycleError::AuthorizationError(format!("Only the {party} of order {} may do that", order.id)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// This party had already confirmed. Nothing changed.
    AlreadyConfirmed,
    /// The flag was set. The other party has not confirmed yet.
    Recorded,
    /// The flag was set and both parties have now confirmed.
    Completed,
}

impl ConfirmOutcome {
    pub fn changed(&self) -> bool {
        !matches!(self, Self::AlreadyConfirmed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPair<K: Confirmable> {
    buyer: bool,
    seller: bool,
    _kind: PhantomData<K>,
}

impl<K: Confirmable> Default for ConfirmationPair<K> {
    fn default() -> Self {
        Self::new(false, false)
    }
}

impl<K: Confirmable> ConfirmationPair<K> {
    pub fn new(buyer: bool, seller: bool) -> Self {
        Self { buyer, seller, _kind: PhantomData }
    }

    pub fn buyer(&self) -> bool {
        self.buyer
    }

    pub fn seller(&self) -> bool {
        self.seller
    }

    pub fn is_confirmed(&self) -> bool {
        self.buyer && self.seller
    }

    pub fn is_confirmed_by(&self, party: Party) -> bool {
        match party {
            Party::Buyer => self.buyer,
            Party::Seller => self.seller,
        }
    }

    /// Sets the claimant's flag. Only reports [`ConfirmOutcome::Completed`] on the call that makes the pair confirmed.
    pub fn confirm(&mut self, claim: &PartyClaim) -> ConfirmOutcome {
        let flag = match claim.party() {
            Party::Buyer => &mut self.buyer,
            Party::Seller => &mut self.seller,
        };
        if *flag {
            trace!("🔄️ {} {} for order {} was already confirmed", claim.party(), K::NAME, claim.order_id());
            return ConfirmOutcome::AlreadyConfirmed;
        }
        *flag = true;
        debug!("🔄️ {} confirmed {} for order {}", claim.party(), K::NAME, claim.order_id());
        if self.is_confirmed() {
            ConfirmOutcome::Completed
        } else {
            ConfirmOutcome::Recorded
        }
    }
}
