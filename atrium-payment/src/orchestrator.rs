use crate::discounts::{DiscountError, DiscountRejection, DiscountService};
use atrium_booking::transitions::{self, LifecycleEvent, TransitionError};
use atrium_core::booking::{Booking, BookingStatus, PaymentMethod, PaymentStatus};
use atrium_core::payment::{CardDetails, CardError, CardIntent, CardIntentStatus, CardProcessor, Receipt};
use atrium_core::store::{BookingStore, DebitOutcome, StoreError, WalletStore};
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("booking not found: {0}")]
    NotFound(Uuid),

    #[error("insufficient funds: balance {balance_cents}, required {required_cents}")]
    InsufficientFunds {
        balance_cents: i64,
        required_cents: i64,
    },

    #[error("{0}")]
    InvalidDiscount(DiscountRejection),

    #[error("operation not allowed while booking is {status:?}/{payment_status:?}")]
    IllegalState {
        status: BookingStatus,
        payment_status: PaymentStatus,
    },

    #[error("card details required for card payments")]
    MissingCard,

    #[error("card declined: {0}")]
    CardDeclined(String),

    #[error("payment outcome unknown: {0}")]
    Indeterminate(String),

    #[error("booking {0} changed state mid-payment")]
    StaleState(Uuid),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for PaymentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::StaleState { booking_id, .. } => PaymentError::StaleState(booking_id),
            other => PaymentError::Store(other),
        }
    }
}

impl From<TransitionError> for PaymentError {
    fn from(err: TransitionError) -> Self {
        PaymentError::IllegalState {
            status: err.from_status,
            payment_status: err.from_payment,
        }
    }
}

impl From<DiscountError> for PaymentError {
    fn from(err: DiscountError) -> Self {
        match err {
            DiscountError::Rejected(rejection) => PaymentError::InvalidDiscount(rejection),
            DiscountError::Store(store) => store.into(),
        }
    }
}

/// Drives a booking through settlement.
///
/// Wallet charges debit atomically before the booking is confirmed; card
/// charges go through provider intents keyed on `(booking, attempt)` so a
/// retry after an unknown outcome can never charge twice. Every terminal
/// write is a guarded update against the tuple read at the start, which is
/// what arbitrates the race against the expiration sweeper.
pub struct PaymentOrchestrator {
    bookings: Arc<dyn BookingStore>,
    wallets: Arc<dyn WalletStore>,
    discounts: DiscountService,
    processor: Arc<dyn CardProcessor>,
    currency: String,
    card_timeout: std::time::Duration,
}

impl PaymentOrchestrator {
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        wallets: Arc<dyn WalletStore>,
        discounts: DiscountService,
        processor: Arc<dyn CardProcessor>,
        currency: String,
        card_timeout: std::time::Duration,
    ) -> Self {
        Self {
            bookings,
            wallets,
            discounts,
            processor,
            currency,
            card_timeout,
        }
    }

    pub async fn charge(
        &self,
        booking_id: Uuid,
        method: PaymentMethod,
        discount_code: Option<&str>,
        card: Option<&CardDetails>,
    ) -> Result<Receipt, PaymentError> {
        // 1. Load and gate on a payable state.
        let mut booking = self
            .bookings
            .get(booking_id)
            .await?
            .ok_or(PaymentError::NotFound(booking_id))?;

        let observed = booking.state();
        match observed {
            (BookingStatus::Pending, PaymentStatus::Pending | PaymentStatus::Failed) => {}
            // A canceled booking is the signature of losing to the sweeper
            // or to an explicit cancel; the caller's view is stale.
            (BookingStatus::Canceled, _) => return Err(PaymentError::StaleState(booking_id)),
            (status, payment_status) => {
                return Err(PaymentError::IllegalState {
                    status,
                    payment_status,
                })
            }
        }

        // 2. Re-validate the discount at charge time; limits and expiry may
        // have moved since the booking was created.
        let effective_code = discount_code
            .map(str::to_string)
            .or_else(|| booking.discount_code.clone());
        if let Some(code) = &effective_code {
            let discount_cents = self
                .discounts
                .validate(
                    code,
                    booking.subtotal_cents,
                    Some(booking.subject.item_type()),
                    Utc::now(),
                )
                .await?;
            booking.apply_discount(code, discount_cents);
        }
        let amount = booking.total_cents;

        // 3. Move the money.
        let reference = match method {
            PaymentMethod::Wallet => self.charge_wallet(&booking, amount).await?,
            PaymentMethod::Card => {
                let card = card.ok_or(PaymentError::MissingCard)?;
                match self.charge_card(&booking, amount, card).await {
                    Ok(reference) => reference,
                    Err(PaymentError::CardDeclined(message)) => {
                        self.record_decline(booking, observed, &message).await?;
                        return Err(PaymentError::CardDeclined(message));
                    }
                    Err(other) => return Err(other),
                }
            }
        };

        // 4. Settle: confirm the booking against the tuple we read.
        let next = transitions::next(observed, LifecycleEvent::PaymentSucceeded)?;
        let owner_id = booking.owner_id.clone();
        let mut paid = booking;
        paid.apply_state(next);
        paid.payment_method = Some(method);
        if method == PaymentMethod::Card {
            paid.payment_attempts += 1;
        }
        paid.annotate("payment_reference", json!(reference));

        match self.bookings.update_if(observed, paid).await {
            Ok(stored) => {
                // 5. Housekeeping after the point of no return.
                if let Some(code) = &stored.discount_code {
                    if let Err(error) = self.discounts.consume(code).await {
                        tracing::warn!(code = %code, error = %error, "discount usage bump failed");
                    }
                }
                tracing::info!(
                    booking_id = %booking_id,
                    method = ?method,
                    amount_cents = stored.total_cents,
                    "booking settled"
                );
                Ok(Receipt {
                    booking_id,
                    method,
                    amount_cents: stored.total_cents,
                    discount_cents: stored.discount_cents,
                    currency: self.currency.clone(),
                    reference,
                    paid_at: Utc::now(),
                })
            }
            Err(StoreError::StaleState { .. }) => {
                // Lost the settlement race. Wallet money comes straight
                // back; a settled card intent needs provider-side reversal.
                match method {
                    PaymentMethod::Wallet => match self.wallets.credit(&owner_id, amount).await {
                        Ok(_) => tracing::warn!(
                            booking_id = %booking_id,
                            amount_cents = amount,
                            "wallet debit returned after losing settlement race"
                        ),
                        Err(error) => tracing::error!(
                            booking_id = %booking_id,
                            amount_cents = amount,
                            error = %error,
                            "wallet compensation failed; balance is short by this amount"
                        ),
                    },
                    PaymentMethod::Card => {
                        tracing::error!(
                            booking_id = %booking_id,
                            reference = %reference,
                            "card charge settled for a booking that expired mid-payment; reversal required"
                        );
                    }
                }
                Err(PaymentError::StaleState(booking_id))
            }
            Err(other) => Err(other.into()),
        }
    }

    async fn charge_wallet(&self, booking: &Booking, amount: i64) -> Result<String, PaymentError> {
        match self.wallets.try_debit(&booking.owner_id, amount).await? {
            DebitOutcome::Insufficient { balance_cents } => Err(PaymentError::InsufficientFunds {
                balance_cents,
                required_cents: amount,
            }),
            DebitOutcome::Debited { balance_cents } => {
                tracing::debug!(
                    owner_id = %booking.owner_id,
                    amount_cents = amount,
                    balance_cents,
                    "wallet debited"
                );
                Ok(format!("wtx_{}", Uuid::new_v4().simple()))
            }
        }
    }

    /// Create-or-reuse the intent for the next attempt and confirm it under
    /// a timeout. Timeouts and transport faults leave the booking untouched
    /// so the retry reuses the same intent key.
    async fn charge_card(&self, booking: &Booking, amount: i64, card: &CardDetails) -> Result<String, PaymentError> {
        let attempt = booking.payment_attempts + 1;
        let intent = self
            .processor
            .create_intent(booking.id, attempt, amount, &self.currency)
            .await
            .map_err(map_card_error)?;

        let confirm = self.processor.confirm_intent(&intent.id, card);
        match tokio::time::timeout(self.card_timeout, confirm).await {
            Err(_elapsed) => Err(PaymentError::Indeterminate(
                "card confirmation timed out".to_string(),
            )),
            Ok(Err(error)) => Err(map_card_error(error)),
            Ok(Ok(confirmed)) => Ok(confirmed.id),
        }
    }

    /// Persist a definitive decline: payment failed, attempt counter bumped
    /// so the next try opens a fresh intent.
    async fn record_decline(
        &self,
        booking: Booking,
        observed: (BookingStatus, PaymentStatus),
        message: &str,
    ) -> Result<(), PaymentError> {
        let next = transitions::next(observed, LifecycleEvent::PaymentFailed)?;
        let mut failed = booking;
        failed.apply_state(next);
        failed.payment_attempts += 1;
        failed.annotate("card_decline_reason", json!(message));

        match self.bookings.update_if(observed, failed).await {
            Ok(_) => Ok(()),
            Err(StoreError::StaleState { booking_id, .. }) => {
                tracing::debug!(booking_id = %booking_id, "decline not recorded, booking changed state");
                Ok(())
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Cancel a paid booking and return the money.
    ///
    /// The state change lands first; the wallet credit follows only for the
    /// winner, so concurrent refund requests cannot pay out twice. Card
    /// refunds are annotated for out-of-band provider settlement.
    pub async fn cancel_with_refund(&self, booking_id: Uuid) -> Result<Booking, PaymentError> {
        let booking = self
            .bookings
            .get(booking_id)
            .await?
            .ok_or(PaymentError::NotFound(booking_id))?;

        let observed = booking.state();
        let next = transitions::next(observed, LifecycleEvent::CancelWithRefund)?;

        let refund_amount = booking.total_cents;
        let method = booking.payment_method;
        let reference = format!("rfn_{}", Uuid::new_v4().simple());

        let mut canceled = booking;
        canceled.apply_state(next);
        canceled.annotate("refund_reference", json!(reference));
        if method == Some(PaymentMethod::Card) {
            canceled.annotate("refund_note", json!("card refund queued for provider settlement"));
        }

        let stored = self.bookings.update_if(observed, canceled).await?;

        if method == Some(PaymentMethod::Wallet) {
            self.wallets.credit(&stored.owner_id, refund_amount).await?;
            tracing::info!(
                booking_id = %booking_id,
                amount_cents = refund_amount,
                "wallet refund credited"
            );
        }
        Ok(stored)
    }
}

fn map_card_error(error: CardError) -> PaymentError {
    match error {
        CardError::Declined(message) => PaymentError::CardDeclined(message),
        // The provider may or may not have acted; only a retry with the
        // same intent key can tell.
        CardError::Network(message) => PaymentError::Indeterminate(message),
        CardError::UnknownIntent(id) => {
            PaymentError::Indeterminate(format!("provider lost intent {id}"))
        }
    }
}

/// In-process stand-in for the card network.
///
/// Deterministic intent ids make it idempotent per `(booking, attempt)`;
/// magic tokens trigger declines (`tok_declined`), slow confirmations
/// (`tok_slow`), and a confirmation that settles provider-side but fails on
/// the wire once (`tok_flaky_once`).
pub struct SimCardProcessor {
    intents: Mutex<HashMap<String, CardIntent>>,
    confirm_calls: AtomicUsize,
    charges: AtomicUsize,
    slow_delay: std::time::Duration,
}

impl SimCardProcessor {
    pub const DECLINE_TOKEN: &'static str = "tok_declined";
    pub const SLOW_TOKEN: &'static str = "tok_slow";
    pub const FLAKY_TOKEN: &'static str = "tok_flaky_once";

    pub fn new() -> Self {
        Self {
            intents: Mutex::new(HashMap::new()),
            confirm_calls: AtomicUsize::new(0),
            charges: AtomicUsize::new(0),
            slow_delay: std::time::Duration::from_secs(5),
        }
    }

    pub fn with_slow_delay(mut self, delay: std::time::Duration) -> Self {
        self.slow_delay = delay;
        self
    }

    /// Number of charges that actually settled provider-side.
    pub fn charge_count(&self) -> usize {
        self.charges.load(Ordering::SeqCst)
    }

    pub fn confirm_calls(&self) -> usize {
        self.confirm_calls.load(Ordering::SeqCst)
    }
}

impl Default for SimCardProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CardProcessor for SimCardProcessor {
    async fn create_intent(
        &self,
        booking_id: Uuid,
        attempt: u32,
        amount_cents: i64,
        currency: &str,
    ) -> Result<CardIntent, CardError> {
        let id = format!("pi_{}_{}", booking_id.simple(), attempt);
        let mut intents = self.intents.lock().await;

        if let Some(existing) = intents.get(&id) {
            return Ok(existing.clone());
        }

        let intent = CardIntent {
            id: id.clone(),
            booking_id,
            attempt,
            amount_cents,
            currency: currency.to_string(),
            status: CardIntentStatus::Created,
            reference: Some(format!("sim_{:06}", rand::random::<u32>() % 1_000_000)),
            created_at: Utc::now(),
        };
        intents.insert(id, intent.clone());
        Ok(intent)
    }

    async fn confirm_intent(&self, intent_id: &str, card: &CardDetails) -> Result<CardIntent, CardError> {
        self.confirm_calls.fetch_add(1, Ordering::SeqCst);

        let token = card.token.as_inner().clone();
        if token == Self::SLOW_TOKEN {
            // Sleep outside the lock so an abandoned confirmation does not
            // block the next one.
            tokio::time::sleep(self.slow_delay).await;
        }

        let mut intents = self.intents.lock().await;
        let intent = intents
            .get_mut(intent_id)
            .ok_or_else(|| CardError::UnknownIntent(intent_id.to_string()))?;

        // Replaying a settled intent is a no-op success.
        if intent.status == CardIntentStatus::Confirmed {
            return Ok(intent.clone());
        }

        if token == Self::DECLINE_TOKEN {
            intent.status = CardIntentStatus::Declined;
            return Err(CardError::Declined("insufficient card funds".to_string()));
        }

        if token == Self::FLAKY_TOKEN {
            // The charge lands provider-side, then the connection drops
            // before the caller hears the answer.
            intent.status = CardIntentStatus::Confirmed;
            self.charges.fetch_add(1, Ordering::SeqCst);
            return Err(CardError::Network("connection reset during confirmation".to_string()));
        }

        intent.status = CardIntentStatus::Confirmed;
        self.charges.fetch_add(1, Ordering::SeqCst);
        Ok(intent.clone())
    }
}
